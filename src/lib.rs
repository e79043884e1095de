//! Recital - a chat assistant that turns messy recital lists into printable
//! concert program PDFs
//!
//! A teacher pastes a program (an email, a CSV, a numbered list) into the
//! chat. A local Ollama model calls tools that parse it into a structured
//! record, fix mistakes on request, and render a themed PDF in whatever style
//! the teacher describes.
//!
//! # Modules
//!
//! - `program` - the concert record, its shared store, and model-output parsing
//! - `theme` - model-designed visual themes with a memo cache
//! - `render` - deterministic page layout and PDF output
//! - `tools` - the five tools the model can call
//! - `ollama` - Ollama clients and the `LanguageModel` seam
//! - `agent` - the tool-calling loop and chat sessions
//! - `server` - axum HTTP API
//! - `config` / `telemetry` / `metrics` - environment config, logging and tracing, Prometheus
//!
//! # Quick Start
//!
//! ```ignore
//! use recital::{Config, build_app};
//!
//! let config = Config::from_env()?;
//! let router = build_app(&config);
//! ```

pub mod agent;
pub mod config;
pub mod metrics;
pub mod ollama;
pub mod program;
pub mod render;
pub mod server;
pub mod telemetry;
pub mod theme;
pub mod tools;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use agent::{AgentConfig, AgentController, SessionStore};
pub use config::Config;
pub use ollama::{LanguageModel, OllamaBackend};
pub use program::ProgramStore;
pub use server::{create_router, AppState};

/// Wire every component for `model` and return the HTTP router.
pub fn build_app_with_model(config: &Config, model: Arc<dyn LanguageModel>) -> axum::Router {
    let store = Arc::new(ProgramStore::new());
    let designer = Arc::new(theme::ThemeDesigner::new(model.clone()));
    let renderer = render::ProgramRenderer::new(config.static_dir.clone());
    let toolbox = Arc::new(tools::Toolbox::new(model.clone(), store, designer, renderer));

    let agent = AgentController::new(
        model,
        toolbox,
        Arc::new(SessionStore::new(config.max_history_messages).with_max_sessions(config.max_sessions)),
        AgentConfig {
            model: config.model.clone(),
            max_iterations: config.max_iterations,
            system_prompt: None,
        },
    );

    let state = AppState {
        agent: Arc::new(agent),
        limiter: Arc::new(server::RateLimiter::new(config.rate_burst, config.rate_per_sec)),
        static_dir: config.static_dir.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };
    create_router(state, &config.allowed_origins)
}

/// Router backed by the Ollama server in `config`
pub fn build_app(config: &Config) -> axum::Router {
    let model: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(config.ollama_url.clone(), config.model.clone()));
    build_app_with_model(config, model)
}
