//! Unified multi-provider chat session
//!
//! Keeps one conversation history per provider and routes each message by
//! the current mode. Rendering returns strings; the CLI does the printing.

use crate::models::{ChatTurn, ProviderKind, ProviderResponse};
use crate::providers::GenerateRequest;
use crate::services::dispatcher::Dispatcher;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise and direct.";

const HELP: &str = "\
Available commands:
  /claude   - Switch to Claude only
  /gemini   - Switch to Gemini only
  /chatgpt  - Switch to ChatGPT only
  /both     - Get responses from every available model
  /compare  - Compare responses side-by-side
  /cost     - Show token usage and costs
  /clear    - Clear conversation history
  /help     - Show this help
  /exit     - Exit chat";

/// Where messages go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Single(ProviderKind),
    Both,
    Compare,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Single(kind) => f.write_str(kind.display_name()),
            ChatMode::Both => f.write_str("Both"),
            ChatMode::Compare => f.write_str("Compare"),
        }
    }
}

/// Slash commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Switch(ChatMode),
    Cost,
    Clear,
    Help,
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse a line starting with `/`; `None` for ordinary messages
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if !input.starts_with('/') {
            return None;
        }
        let command = input.to_lowercase();
        Some(match command.as_str() {
            "/claude" => Command::Switch(ChatMode::Single(ProviderKind::Claude)),
            "/gemini" => Command::Switch(ChatMode::Single(ProviderKind::Gemini)),
            "/chatgpt" | "/gpt" | "/openai" => Command::Switch(ChatMode::Single(ProviderKind::ChatGpt)),
            "/both" => Command::Switch(ChatMode::Both),
            "/compare" => Command::Switch(ChatMode::Compare),
            "/cost" => Command::Cost,
            "/clear" => Command::Clear,
            "/help" => Command::Help,
            "/exit" | "/quit" => Command::Exit,
            _ => Command::Unknown(command),
        })
    }
}

/// What the front-end should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue(String),
    Exit(String),
}

/// Interactive chat state
pub struct ChatSession {
    dispatcher: Arc<Dispatcher>,
    mode: ChatMode,
    histories: HashMap<ProviderKind, Vec<ChatTurn>>,
}

impl ChatSession {
    /// Start in single mode on the first available provider
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let mode = dispatcher
            .available()
            .first()
            .map(|kind| ChatMode::Single(*kind))
            .unwrap_or(ChatMode::Both);
        
        Self {
            dispatcher,
            mode,
            histories: HashMap::new(),
        }
    }
    
    pub fn mode(&self) -> ChatMode {
        self.mode
    }
    
    /// Turns stored for one provider
    pub fn history(&self, kind: ProviderKind) -> &[ChatTurn] {
        self.histories.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
    
    pub fn help() -> &'static str {
        HELP
    }
    
    /// Apply a slash command
    pub fn handle_command(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::Switch(ChatMode::Single(kind)) => {
                if self.dispatcher.is_available(kind) {
                    self.mode = ChatMode::Single(kind);
                    CommandOutcome::Continue(format!("[SWITCHED] Now using {}", kind.display_name()))
                } else {
                    CommandOutcome::Continue(format!("[ERROR] {} not available", kind.display_name()))
                }
            }
            Command::Switch(ChatMode::Both) => {
                self.mode = ChatMode::Both;
                CommandOutcome::Continue("[SWITCHED] Now using ALL available models".to_string())
            }
            Command::Switch(ChatMode::Compare) => {
                self.mode = ChatMode::Compare;
                CommandOutcome::Continue("[SWITCHED] Compare mode - side by side responses".to_string())
            }
            Command::Cost => CommandOutcome::Continue(self.dispatcher.usage_summary()),
            Command::Clear => {
                self.histories.clear();
                CommandOutcome::Continue("[CLEARED] Conversation history cleared".to_string())
            }
            Command::Help => CommandOutcome::Continue(HELP.to_string()),
            Command::Exit => CommandOutcome::Exit(format!("{}\n\nGoodbye!", self.dispatcher.usage_summary())),
            Command::Unknown(cmd) => CommandOutcome::Continue(format!(
                "[UNKNOWN] Unknown command: {}\nType /help for available commands",
                cmd
            )),
        }
    }
    
    /// Send one message in the current mode and render the reply
    pub async fn send(&mut self, message: &str) -> String {
        match self.mode {
            ChatMode::Single(kind) => {
                let response = self.turn(kind, message).await;
                render_single(&response)
            }
            ChatMode::Both => {
                let mut sections = Vec::new();
                for kind in self.dispatcher.available() {
                    let response = self.turn(kind, message).await;
                    let rule = "=".repeat(30);
                    sections.push(format!(
                        "\n{} {} {}\n{}",
                        rule,
                        kind.display_name().to_uppercase(),
                        rule,
                        render_single(&response)
                    ));
                }
                if sections.is_empty() {
                    return "[ERROR] No models available".to_string();
                }
                sections.join("\n")
            }
            ChatMode::Compare => {
                let mut out = String::new();
                for kind in ProviderKind::ALL {
                    let body = if self.dispatcher.is_available(kind) {
                        render_single(&self.turn(kind, message).await)
                    } else {
                        "[Not available]".to_string()
                    };
                    out.push_str(&boxed_header(kind.display_name()));
                    out.push_str(&body);
                    out.push_str("\n\n");
                }
                out
            }
        }
    }
    
    /// One exchange with one provider; a failed exchange leaves history untouched
    async fn turn(&mut self, kind: ProviderKind, message: &str) -> ProviderResponse {
        let history = self.histories.entry(kind).or_default();
        history.push(ChatTurn::user(message));
        
        let request = GenerateRequest {
            turns: history.clone(),
            system: Some(CHAT_SYSTEM_PROMPT.to_string()),
            ..Default::default()
        };
        let response = self.dispatcher.dispatch(kind, &request).await;
        
        let history = self.histories.entry(kind).or_default();
        if response.is_success() {
            history.push(ChatTurn::assistant(response.response.clone()));
            debug!("{} history now {} turns", kind, history.len());
        } else {
            history.pop();
            warn!("{} turn failed: {:?}", kind, response.error);
        }
        response
    }
}

fn render_single(response: &ProviderResponse) -> String {
    match (&response.error, response.fallback_from) {
        (Some(_), _) => format!("[ERROR] {}", response.response),
        (None, Some(from)) => format!(
            "[FALLBACK] {} quota exhausted, answered by {}\n{}",
            from.display_name(),
            response.provider.map(|p| p.display_name()).unwrap_or("fallback"),
            response.response
        ),
        (None, None) => response.response.clone(),
    }
}

fn boxed_header(title: &str) -> String {
    let width = 62;
    format!(
        "╔{bar}╗\n║{title:^width$}║\n╚{bar}╝\n",
        bar = "═".repeat(width),
        title = title.to_uppercase(),
        width = width
    )
}
