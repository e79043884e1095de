//! Agent Controller - the tool-calling loop behind the chat endpoint
//!
//! Each user message starts a run: the model sees the system prompt, the
//! session history and the new message, then calls tools until it answers in
//! plain text.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::sessions::SessionStore;
use crate::metrics::{AGENT_ITERATIONS, AGENT_TASKS};
use crate::ollama::{parse_tool_calls_from_text, ChatError, ChatMessage, LanguageModel};
use crate::tools::Toolbox;

/// Instructions given to the model at the start of every run
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Recital, a helpful assistant that helps music teachers organize concerts and produce printable concert program PDFs.

YOUR TOOLS:
1. parse_program_text: turn raw program text (emails, CSVs, messy lists) into structured data
2. generate_program_pdf: create a printable concert program PDF in any style the teacher describes
3. fix_program_data: correct the program using a natural language instruction
4. get_current_program: show the program data currently loaded
5. update_concert_info: change the concert title, date, time, venue or type

HOW TO HELP:
- When a teacher pastes a program and asks for a PDF, call parse_program_text first, then generate_program_pdf, then tell them the PDF is ready and summarize what is in it.
- When a teacher reports a mistake (e.g. "Tommy Chen should be Tommy Chang"), call fix_program_data with their instruction, then generate_program_pdf again, then confirm the fix.
- When a teacher wants to change concert details, call update_concert_info.
- When a teacher wants to see the program, call get_current_program.
- If the teacher uploaded a file, its saved location is given in the message.

STYLE:
- Be warm, professional and brief.
- After parsing, show a short summary of what was extracted.
- After generating a PDF, confirm it is ready to download.
- If something is unclear, ask for clarification."#;

/// Configuration for the agent controller
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model name, used for logging (the backend decides what is called)
    pub model: String,
    /// Maximum number of iterations (LLM calls) before stopping
    pub max_iterations: usize,
    /// Custom system prompt (uses default if None)
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "qwen3".to_string(),
            max_iterations: 10,
            system_prompt: None,
        }
    }
}

/// Result of an agent run
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Final response from the LLM
    pub final_response: String,
    /// Number of iterations (LLM calls) made
    pub iterations: usize,
    /// Number of tool calls executed
    pub tool_calls_made: usize,
    /// PDF written during this run, if any
    pub generated_file: Option<PathBuf>,
    /// Unique trace ID for this agent run
    pub trace_id: String,
}

/// Error type for agent operations
#[derive(Debug)]
pub enum AgentError {
    /// Maximum iterations reached without completing the task
    MaxIterationsReached,
    /// Ollama chat error
    OllamaError(ChatError),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            AgentError::OllamaError(e) => write!(f, "Ollama error: {}", e),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<ChatError> for AgentError {
    fn from(e: ChatError) -> Self {
        AgentError::OllamaError(e)
    }
}

/// Agent Controller orchestrating the model and the concert tools
pub struct AgentController {
    model: Arc<dyn LanguageModel>,
    toolbox: Arc<Toolbox>,
    sessions: Arc<SessionStore>,
    config: AgentConfig,
}

impl AgentController {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        toolbox: Arc<Toolbox>,
        sessions: Arc<SessionStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            toolbox,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Run the agent loop for one user message in a session.
    ///
    /// The session history is only updated when the run completes.
    pub async fn run(&self, session_id: &str, user_input: &str) -> Result<AgentResult, AgentError> {
        let trace_id = Uuid::now_v7().to_string();

        let root_span = info_span!(
            "agent_task",
            trace_id = %trace_id,
            session_id = %session_id,
            model = %self.config.model,
            otel.name = "agent_task"
        );

        async {
            info!(trace_id = %trace_id, session_id = %session_id, "Starting agent task");

            let tools = self.toolbox.definitions();

            let system_prompt = self
                .config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
            let mut messages = vec![ChatMessage::system(system_prompt)];
            messages.extend(self.sessions.history(session_id).await);
            messages.push(ChatMessage::user(user_input));

            let mut iterations = 0;
            let mut tool_calls_made = 0;
            let mut generated_file = None;

            loop {
                iterations += 1;

                if iterations > self.config.max_iterations {
                    warn!(trace_id = %trace_id, iterations, "Max iterations reached");
                    AGENT_TASKS.with_label_values(&["max_iterations"]).inc();
                    AGENT_ITERATIONS.observe(self.config.max_iterations as f64);
                    return Err(AgentError::MaxIterationsReached);
                }

                let llm_span = info_span!(
                    "llm_call",
                    trace_id = %trace_id,
                    iteration = iterations,
                    model = %self.config.model,
                    otel.name = "llm_call"
                );

                let call_start = std::time::Instant::now();
                let response = match self.model.chat(&messages, &tools).instrument(llm_span).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(trace_id = %trace_id, error = %e, "LLM call failed");
                        AGENT_TASKS.with_label_values(&["error"]).inc();
                        return Err(e.into());
                    }
                };
                debug!(
                    trace_id = %trace_id,
                    iteration = iterations,
                    duration_ms = call_start.elapsed().as_secs_f64() * 1000.0,
                    "LLM call completed"
                );

                messages.push(response.message.clone());

                // Native tool calls first, then calls the model printed as JSON text
                let tool_calls = response
                    .message
                    .tool_calls
                    .clone()
                    .filter(|tc| !tc.is_empty())
                    .unwrap_or_else(|| parse_tool_calls_from_text(&response.message.content));

                if tool_calls.is_empty() {
                    info!(trace_id = %trace_id, iterations, tool_calls = tool_calls_made, "Agent task completed");
                    AGENT_TASKS.with_label_values(&["success"]).inc();
                    AGENT_ITERATIONS.observe(iterations as f64);

                    self.sessions.save(session_id, messages.split_off(1)).await;

                    return Ok(AgentResult {
                        final_response: response.message.content.trim().to_string(),
                        iterations,
                        tool_calls_made,
                        generated_file,
                        trace_id,
                    });
                }

                for tool_call in tool_calls {
                    tool_calls_made += 1;
                    let outcome = self.toolbox.dispatch(&tool_call, &trace_id).await;
                    if outcome.generated.is_some() {
                        generated_file = outcome.generated;
                    }
                    messages.push(ChatMessage::tool(tool_call.function.name, outcome.content));
                }
            }
        }
        .instrument(root_span)
        .await
    }
}
