//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use recital::ollama::{ChatError, ChatMessage, ChatResponse, LanguageModel, Tool, ToolCall};

/// Language model that replays queued replies in order
#[derive(Default)]
pub struct ScriptedModel {
    generate_replies: Mutex<VecDeque<String>>,
    chat_replies: Mutex<VecDeque<ChatResponse>>,
    pub chats: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generate(self, reply: &str) -> Self {
        self.generate_replies.lock().unwrap().push_back(reply.to_string());
        self
    }

    pub fn with_chat_text(self, content: &str) -> Self {
        self.chat_replies.lock().unwrap().push_back(response(ChatMessage::assistant(content)));
        self
    }

    pub fn with_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let mut message = ChatMessage::assistant("");
        message.tool_calls = Some(vec![ToolCall::new(name, arguments)]);
        self.chat_replies.lock().unwrap().push_back(response(message));
        self
    }

    /// The user message of the n-th chat call
    pub fn user_message(&self, call: usize) -> Option<String> {
        let chats = self.chats.lock().unwrap();
        chats
            .get(call)?
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
    }
}

fn response(message: ChatMessage) -> ChatResponse {
    ChatResponse {
        message,
        done: true,
        eval_count: 0,
        eval_duration: 0,
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
        self.generate_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ChatError::EmptyResponse)
    }

    async fn chat(&self, messages: &[ChatMessage], _tools: &[Tool]) -> Result<ChatResponse, ChatError> {
        self.chats.lock().unwrap().push(messages.to_vec());
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ChatError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub const THREE_PERFORMANCES: &str = r#"{"performances": [
    {"order": 1, "student_name": "Tommy Chen", "piece_name": "Für Elise (Beethoven)", "instrument": "Piano", "estimated_duration_minutes": 4},
    {"order": 2, "student_name": "Lisa Wang", "piece_name": "Clair de Lune (Debussy)", "instrument": "Piano", "estimated_duration_minutes": 6},
    {"order": 3, "student_name": "Jack and Sarah", "piece_name": "Hungarian Dance No. 5 (Brahms)", "instrument": "Piano duet", "estimated_duration_minutes": 3}
]}"#;
