//! Scripted language model for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ollama::{ChatError, ChatMessage, ChatResponse, LanguageModel, Tool, ToolCall};

/// Replays queued replies in order. An exhausted queue answers with
/// `ChatError::EmptyResponse`.
#[derive(Default)]
pub struct ScriptedModel {
    generate_replies: Mutex<VecDeque<String>>,
    chat_replies: Mutex<VecDeque<ChatResponse>>,
    pub prompts: Mutex<Vec<String>>,
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
        self.chat_replies.lock().unwrap().push_back(reply(ChatMessage::assistant(content)));
        self
    }

    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        let mut message = ChatMessage::assistant("");
        message.tool_calls = Some(calls);
        self.chat_replies.lock().unwrap().push_back(reply(message));
        self
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

fn reply(message: ChatMessage) -> ChatResponse {
    ChatResponse {
        message,
        done: true,
        eval_count: 0,
        eval_duration: 0,
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
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
