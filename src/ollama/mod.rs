//! Ollama LLM integration module
//!
//! This module provides clients for Ollama's HTTP API: one-shot generation
//! for the extraction/correction/theme prompts, and tool-calling chat for the
//! assistant loop. [`LanguageModel`] is the trait the rest of the crate
//! depends on.

pub mod backend;
pub mod client;
pub mod tool_use;

pub use backend::{LanguageModel, OllamaBackend};
pub use client::{GenerateResponse, OllamaClient};
pub use tool_use::{
    parse_tool_calls_from_text, ChatClient, ChatError, ChatMessage, ChatResponse, Tool, ToolCall,
};
