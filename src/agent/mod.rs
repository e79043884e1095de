//! Agent module for the concert assistant
//!
//! # Architecture
//!
//! ```text
//! User message → AgentController → Ollama /api/chat (with tools)
//!                     ↓
//!              Tool call (parse / fix / generate / get / update)
//!                     ↓
//!              Toolbox → ProgramStore, ThemeDesigner, ProgramRenderer
//!                     ↓
//!              Tool output fed back to Ollama → Loop or Complete
//!                     ↓
//!              History saved to the session
//! ```

pub mod controller;
pub mod sessions;

pub use controller::{AgentConfig, AgentController, AgentError, AgentResult, DEFAULT_SYSTEM_PROMPT};
pub use sessions::{Session, SessionStore, SessionSummary, DEFAULT_SESSION_ID};
