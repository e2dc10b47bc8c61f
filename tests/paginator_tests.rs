//! Paginator tests
//!
//! In-memory page sources exercising every stop condition

use agencyops::services::paginator::{Page, PageSource, Paginator, StopReason};
use agencyops::services::RateLimiter;
use agencyops::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Offset-cursor listing over `total` items
struct Listing {
    total: usize,
    /// Return a cursor even on the last page
    always_cursor: bool,
    /// 1-based request number that fails
    fail_on: Option<usize>,
    requests: AtomicUsize,
}

impl Listing {
    fn new(total: usize) -> Self {
        Self {
            total,
            always_cursor: true,
            fail_on: None,
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageSource for Listing {
    type Item = usize;
    
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> AppResult<Page<usize>> {
        let request = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(request) {
            return Err(AppError::ExternalApi { status: 502, message: "bad gateway".to_string() });
        }
        
        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size).min(self.total);
        let items: Vec<usize> = (start..end.max(start)).collect();
        let next_cursor = (self.always_cursor || end < self.total).then(|| end.to_string());
        Ok(Page { items, next_cursor })
    }
}

/// Endless listing of full pages
struct Endless;

#[async_trait]
impl PageSource for Endless {
    type Item = u8;
    
    async fn fetch_page(&self, _cursor: Option<&str>, page_size: usize) -> AppResult<Page<u8>> {
        Ok(Page { items: vec![0; page_size], next_cursor: Some("more".to_string()) })
    }
}

#[tokio::test]
async fn test_342_items_in_four_requests() {
    let source = Listing::new(342);
    let result = Paginator::new(100, 50).collect(&source, None).await;
    
    assert_eq!(result.items.len(), 342);
    assert_eq!(result.requests, 4);
    assert_eq!(source.requests.load(Ordering::SeqCst), 4);
    assert_eq!(result.stop_reason, StopReason::ShortPage);
    assert!(result.is_complete());
    // Order preserved, nothing duplicated
    assert!(result.items.iter().enumerate().all(|(i, v)| i == *v));
}

#[tokio::test]
async fn test_missing_cursor_stops() {
    let mut source = Listing::new(200);
    source.always_cursor = false;
    let result = Paginator::new(100, 50).collect(&source, None).await;
    
    assert_eq!(result.items.len(), 200);
    assert_eq!(result.requests, 2);
    assert_eq!(result.stop_reason, StopReason::NoCursor);
}

#[tokio::test]
async fn test_exact_multiple_ends_on_empty_page() {
    let source = Listing::new(300);
    let result = Paginator::new(100, 50).collect(&source, None).await;
    
    assert_eq!(result.items.len(), 300);
    assert_eq!(result.requests, 4);
    assert_eq!(result.stop_reason, StopReason::EmptyPage);
}

#[tokio::test]
async fn test_safety_cap_is_exact() {
    let result = Paginator::new(100, 7).collect(&Endless, None).await;
    
    assert_eq!(result.requests, 7);
    assert_eq!(result.items.len(), 700);
    assert_eq!(result.stop_reason, StopReason::SafetyCap);
    assert!(!result.is_complete());
}

#[tokio::test]
async fn test_failure_keeps_partial_results() {
    let mut source = Listing::new(1000);
    source.fail_on = Some(3);
    let result = Paginator::new(100, 50).collect(&source, None).await;
    
    assert_eq!(result.items.len(), 200);
    assert_eq!(result.requests, 3);
    assert_eq!(result.stop_reason, StopReason::Failed);
    assert!(matches!(result.error, Some(AppError::ExternalApi { status: 502, .. })));
    assert!(!result.is_complete());
}

#[tokio::test]
async fn test_start_cursor_is_honored() {
    let source = Listing::new(250);
    let result = Paginator::new(100, 50).collect(&source, Some("200".to_string())).await;
    
    assert_eq!(result.items, (200..250).collect::<Vec<_>>());
    assert_eq!(result.requests, 1);
}

#[tokio::test(start_paused = true)]
async fn test_requests_go_through_limiter() {
    let limiter = Arc::new(RateLimiter::new("pages", 100, 5).unwrap());
    let source = Listing::new(342);
    let start = Instant::now();
    
    let result = Paginator::new(100, 50)
        .with_limiter(limiter.clone())
        .collect(&source, None)
        .await;
    
    assert_eq!(result.requests, 4);
    assert_eq!(limiter.calls_in_window().await, 4);
    // Three 200ms gaps between four requests
    assert!(Instant::now() - start >= Duration::from_millis(600));
}
