//! Cursor pagination
//!
//! Walks a cursor-paginated listing to completion with a hard page cap.
//! A failed page ends the walk and keeps what was already collected.

use crate::services::rate_limiter::RateLimiter;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token for the next page
    pub next_cursor: Option<String>,
}

/// A cursor-paginated listing endpoint
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    
    /// Fetch the page starting after `cursor` (first page when `None`)
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> AppResult<Page<Self::Item>>;
}

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    NoCursor,
    ShortPage,
    SafetyCap,
    Failed,
}

/// Aggregated result of a walk
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Page requests issued, including a failed one
    pub requests: usize,
    pub stop_reason: StopReason,
    /// Error that ended the walk early
    pub error: Option<AppError>,
}

impl<T> Paginated<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.stop_reason != StopReason::SafetyCap
    }
}

/// Pagination driver
#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    max_pages: usize,
    limiter: Option<Arc<RateLimiter>>,
}

impl Paginator {
    pub fn new(page_size: usize, max_pages: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            limiter: None,
        }
    }
    
    /// Route every page request through `limiter`
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }
    
    /// Collect every item of `source`
    pub async fn collect<S>(&self, source: &S, start_cursor: Option<String>) -> Paginated<S::Item>
    where
        S: PageSource + ?Sized,
    {
        let mut items = Vec::new();
        let mut cursor = start_cursor;
        let mut requests = 0;
        
        let stop_reason = loop {
            if requests >= self.max_pages {
                warn!("Pagination stopped at safety cap of {} pages", self.max_pages);
                break StopReason::SafetyCap;
            }
            
            if let Some(limiter) = &self.limiter {
                limiter.admit().await;
            }
            requests += 1;
            
            let page = match source.fetch_page(cursor.as_deref(), self.page_size).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Page request {} failed, keeping {} items: {}", requests, items.len(), e);
                    return Paginated {
                        items,
                        requests,
                        stop_reason: StopReason::Failed,
                        error: Some(e),
                    };
                }
            };
            
            let count = page.items.len();
            debug!("Fetched page {} with {} items", requests, count);
            
            if count == 0 {
                break StopReason::EmptyPage;
            }
            items.extend(page.items);
            
            match page.next_cursor {
                None => break StopReason::NoCursor,
                Some(_) if count < self.page_size => break StopReason::ShortPage,
                Some(next) => cursor = Some(next),
            }
        };
        
        Paginated {
            items,
            requests,
            stop_reason,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    struct FixedPages(Vec<usize>);
    
    #[async_trait]
    impl PageSource for FixedPages {
        type Item = usize;
        
        async fn fetch_page(&self, cursor: Option<&str>, _page_size: usize) -> AppResult<Page<usize>> {
            let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let size = self.0.get(index).copied().unwrap_or(0);
            Ok(Page {
                items: vec![index; size],
                next_cursor: Some((index + 1).to_string()),
            })
        }
    }
    
    #[tokio::test]
    async fn test_short_page_stops() {
        let paginator = Paginator::new(100, 50);
        let result = paginator.collect(&FixedPages(vec![100, 100, 100, 42]), None).await;
        
        assert_eq!(result.items.len(), 342);
        assert_eq!(result.requests, 4);
        assert_eq!(result.stop_reason, StopReason::ShortPage);
        assert!(result.is_complete());
    }
    
    #[tokio::test]
    async fn test_empty_page_stops() {
        let paginator = Paginator::new(10, 50);
        let result = paginator.collect(&FixedPages(vec![10, 10]), None).await;
        
        assert_eq!(result.items.len(), 20);
        assert_eq!(result.requests, 3);
        assert_eq!(result.stop_reason, StopReason::EmptyPage);
    }
}
