//! Prometheus metrics for the concert assistant
//!
//! All metrics live in the default registry and are exposed by the server's
//! `/metrics` route.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // HTTP
    // ─────────────────────────────────────────────────────────────────────────────

    /// Chat requests by outcome ("ok", "rate_limited", "bad_request", "error").
    pub static ref CHAT_REQUESTS: CounterVec = register_counter_vec!(
        "recital_chat_requests_total",
        "Chat requests handled, by outcome",
        &["status"]
    ).expect("failed to register CHAT_REQUESTS metric");

    /// Uploaded files stored alongside chat messages.
    pub static ref UPLOAD_BYTES: Histogram = register_histogram!(
        "recital_upload_bytes",
        "Size of files uploaded with chat messages",
        vec![1024.0, 16384.0, 131072.0, 1048576.0, 4194304.0, 16777216.0]
    ).expect("failed to register UPLOAD_BYTES metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Agent
    // ─────────────────────────────────────────────────────────────────────────────

    /// Agent runs by outcome ("success", "max_iterations", "error").
    pub static ref AGENT_TASKS: CounterVec = register_counter_vec!(
        "recital_agent_tasks_total",
        "Agent runs, by outcome",
        &["status"]
    ).expect("failed to register AGENT_TASKS metric");

    /// LLM calls made per agent run.
    pub static ref AGENT_ITERATIONS: Histogram = register_histogram!(
        "recital_agent_iterations",
        "LLM calls per agent run",
        vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0]
    ).expect("failed to register AGENT_ITERATIONS metric");

    /// Tool calls dispatched, by tool and whether the tool reported an error.
    pub static ref TOOL_CALLS: CounterVec = register_counter_vec!(
        "recital_tool_calls_total",
        "Tool calls dispatched by the agent",
        &["tool", "status"]
    ).expect("failed to register TOOL_CALLS metric");

    /// Wall time of model calls, by model and endpoint ("generate" or "chat").
    pub static ref LLM_CALL_TIME: HistogramVec = register_histogram_vec!(
        "recital_llm_call_seconds",
        "Duration of language model calls",
        &["model", "endpoint"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).expect("failed to register LLM_CALL_TIME metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────────

    /// Theme lookups by result ("hit", "miss", "fallback").
    pub static ref THEME_LOOKUPS: CounterVec = register_counter_vec!(
        "recital_theme_lookups_total",
        "Theme cache lookups",
        &["result"]
    ).expect("failed to register THEME_LOOKUPS metric");

    /// Time spent laying out and writing a program PDF.
    pub static ref PDF_RENDER_TIME: Histogram = register_histogram!(
        "recital_pdf_render_seconds",
        "Duration of PDF rendering",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).expect("failed to register PDF_RENDER_TIME metric");
}

/// Encode every registered metric in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
