//! Conversation sessions for the chat endpoint
//!
//! Each browser tab (or API client) talks in its own session, keyed by the
//! `session_id` it sends. Sessions live in memory for the life of the process;
//! past `max_sessions` the least recently used one is dropped.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::ollama::ChatMessage;

/// Session id used when the client does not send one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Sessions kept before the least recently used is evicted
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// One conversation
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Unix seconds
    pub created_at: u64,
    pub updated_at: u64,
    /// History without the system prompt
    pub messages: Vec<ChatMessage>,
    /// Completed agent runs
    pub turns: usize,
    // store-wide use counter; orders eviction within the same second
    last_use: u64,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = unix_now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            turns: 0,
            last_use: 0,
        }
    }

    /// Replace the history after a completed turn
    pub fn record_turn(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
        self.turns += 1;
        self.updated_at = unix_now();
    }
}

/// Summary of a session for listing
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub messages: usize,
    pub turns: usize,
    pub created_at: u64,
    pub updated_at: u64,
}

/// In-memory session storage with bounded history
pub struct SessionStore {
    sessions: Mutex<Sessions>,
    max_history_messages: usize,
    max_sessions: usize,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    uses: u64,
}

impl SessionStore {
    pub fn new(max_history_messages: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            max_history_messages,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Cap the number of live sessions (at least one)
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Normalize a client-supplied id; blank ids map to the default session.
    pub fn resolve_id(session_id: Option<&str>) -> String {
        session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
            .to_string()
    }

    /// History for a session; empty for a session not seen before.
    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.lock().await;
        sessions
            .by_id
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// Store the history of a completed turn, trimmed to the configured bound.
    pub async fn save(&self, session_id: &str, messages: Vec<ChatMessage>) {
        let trimmed = trim_history(messages, self.max_history_messages);
        let mut sessions = self.sessions.lock().await;

        if !sessions.by_id.contains_key(session_id) && sessions.by_id.len() >= self.max_sessions {
            let oldest = sessions
                .by_id
                .values()
                .min_by_key(|s| s.last_use)
                .map(|s| s.id.clone());
            if let Some(id) = oldest {
                sessions.by_id.remove(&id);
                info!(evicted = %id, max_sessions = self.max_sessions, "Evicted least recently used session");
            }
        }

        sessions.uses += 1;
        let use_count = sessions.uses;
        let session = sessions
            .by_id
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id));
        session.record_turn(trimmed);
        session.last_use = use_count;
    }

    /// Forget a session. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.lock().await.by_id.remove(session_id).is_some()
    }

    /// All sessions, most recently updated first
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.lock().await;
        let mut recent: Vec<&Session> = sessions.by_id.values().collect();
        recent.sort_by(|a, b| b.last_use.cmp(&a.last_use));
        recent
            .into_iter()
            .map(|s| SessionSummary {
                id: s.id.clone(),
                messages: s.messages.len(),
                turns: s.turns,
                created_at: s.created_at,
                updated_at: s.updated_at,
            })
            .collect()
    }
}

/// Keep at most `max` of the newest messages, starting at a user message so
/// no tool result is left without the call that produced it.
pub fn trim_history(messages: Vec<ChatMessage>, max: usize) -> Vec<ChatMessage> {
    if messages.len() <= max {
        return messages;
    }
    let cut = messages.len() - max;
    let start = messages[cut..]
        .iter()
        .position(ChatMessage::is_user)
        .map(|offset| cut + offset)
        .unwrap_or(messages.len());
    messages.into_iter().skip(start).collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> Vec<ChatMessage> {
        vec![
            ChatMessage::user(format!("question {}", n)),
            ChatMessage::tool("get_current_program", "No program data loaded yet."),
            ChatMessage::assistant(format!("answer {}", n)),
        ]
    }

    #[test]
    fn test_resolve_id() {
        assert_eq!(SessionStore::resolve_id(None), DEFAULT_SESSION_ID);
        assert_eq!(SessionStore::resolve_id(Some("  ")), DEFAULT_SESSION_ID);
        assert_eq!(SessionStore::resolve_id(Some(" tab-1 ")), "tab-1");
    }

    #[test]
    fn test_trim_history_starts_at_user_message() {
        let messages: Vec<ChatMessage> = (0..4).flat_map(turn).collect();
        assert_eq!(messages.len(), 12);

        // 5 newest would start on a tool message; trimming advances to the next user message
        let trimmed = trim_history(messages.clone(), 5);
        assert_eq!(trimmed.len(), 3);
        assert!(trimmed[0].is_user());
        assert_eq!(trimmed[0].content, "question 3");

        assert_eq!(trim_history(messages.clone(), 12).len(), 12);
        assert_eq!(trim_history(messages, 6)[0].content, "question 2");
    }

    #[test]
    fn test_trim_history_without_user_message() {
        let messages = vec![
            ChatMessage::assistant("a"),
            ChatMessage::assistant("b"),
            ChatMessage::assistant("c"),
        ];
        assert!(trim_history(messages, 2).is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(40);
        store.save("a", turn(1)).await;
        store.save("b", turn(2)).await;

        assert_eq!(store.history("a").await[0].content, "question 1");
        assert_eq!(store.history("b").await[0].content, "question 2");
        assert!(store.history("c").await.is_empty());
        assert_eq!(store.list().await.len(), 2);

        assert!(store.clear("a").await);
        assert!(store.history("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_save_trims_and_counts_turns() {
        let store = SessionStore::new(4);
        store.save("a", turn(1)).await;
        let mut history = store.history("a").await;
        history.extend(turn(2));
        store.save("a", history).await;

        let summary = &store.list().await[0];
        assert_eq!(summary.turns, 2);
        assert_eq!(summary.messages, 3);
        assert!(summary.created_at <= summary.updated_at);
        assert_eq!(store.history("a").await[0].content, "question 2");
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_evicted() {
        let store = SessionStore::new(40).with_max_sessions(2);
        store.save("a", turn(1)).await;
        store.save("b", turn(2)).await;
        store.save("a", turn(3)).await;
        store.save("c", turn(4)).await;

        let ids: Vec<String> = store.list().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(store.history("b").await.is_empty());
        assert_eq!(store.history("a").await[0].content, "question 3");
    }
}
