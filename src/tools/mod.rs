//! The tools the model can call
//!
//! Every tool answers with text meant for the model. Failures are answered
//! too, as messages starting with `Error`, so a bad call never aborts the
//! conversation; the model reads the message and can try again.

pub mod definitions;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, info_span, warn, Instrument};

use crate::metrics::TOOL_CALLS;
use crate::ollama::{ChatError, LanguageModel, Tool, ToolCall};
use crate::program::{
    parse_correction, parse_performances, prompts, ConcertProgram, ConcertType, ExtractError, MetadataUpdate,
    ProgramStore,
};
use crate::render::{Heading, ProgramRenderer, RenderError};
use crate::theme::ThemeDesigner;

use definitions::{FIX_PROGRAM_DATA, GENERATE_PROGRAM_PDF, GET_CURRENT_PROGRAM, PARSE_PROGRAM_TEXT, UPDATE_CONCERT_INFO};

const DEFAULT_STYLE: &str = "elegant";
const DEFAULT_TITLE: &str = "Concert Program";

/// Why a tool call did not do what was asked
#[derive(Debug)]
pub enum ToolError {
    UnknownTool(String),
    MissingArgument(&'static str),
    InvalidArgument { name: &'static str, reason: String },
    /// The tool needs a parsed program and there is none
    NoProgram(&'static str),
    /// The extraction reply was not JSON
    UnparseableProgram,
    /// The model call or its reply failed while doing `action`
    Failed { action: &'static str, reason: String },
    Render(RenderError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::UnknownTool(name) => write!(f, "Error: Unknown tool '{}'", name),
            ToolError::MissingArgument(name) => write!(f, "Error: missing required argument '{}'", name),
            ToolError::InvalidArgument { name, reason } => {
                write!(f, "Error: invalid value for '{}': {}", name, reason)
            }
            ToolError::NoProgram(message) => write!(f, "{}", message),
            ToolError::UnparseableProgram => write!(
                f,
                "Error: Could not parse the program text. The AI response was not valid JSON. \
                 Please try again with clearer formatting."
            ),
            ToolError::Failed { action, reason } => write!(f, "Error {}: {}", action, reason),
            ToolError::Render(e) => write!(f, "Error generating PDF: {}", e),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<RenderError> for ToolError {
    fn from(e: RenderError) -> Self {
        ToolError::Render(e)
    }
}

impl ToolError {
    fn failed(action: &'static str) -> impl FnOnce(ChatError) -> ToolError {
        move |e| ToolError::Failed {
            action,
            reason: e.to_string(),
        }
    }
}

/// What a tool call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Text handed back to the model
    pub content: String,
    /// File written by this call, if any
    pub generated: Option<PathBuf>,
    pub is_error: bool,
}

impl ToolOutcome {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            generated: None,
            is_error: false,
        }
    }

    fn error(e: &ToolError) -> Self {
        Self {
            content: e.to_string(),
            generated: None,
            is_error: true,
        }
    }
}

/// Arguments of one call, read leniently
struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(value: &'a Value) -> Self {
        Self { map: value.as_object() }
    }

    /// Non-empty text value. Numbers and booleans are stringified.
    fn optional(&self, name: &str) -> Option<String> {
        let value = self.map?.get(name)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Null => return None,
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn required(&self, name: &'static str) -> Result<String, ToolError> {
        self.optional(name).ok_or(ToolError::MissingArgument(name))
    }

    fn metadata(&self) -> MetadataUpdate {
        MetadataUpdate {
            concert_title: self.optional("concert_title"),
            concert_date: self.optional("concert_date"),
            concert_time: self.optional("concert_time"),
            concert_venue: self.optional("venue"),
            concert_type: None,
        }
    }
}

/// Some models send arguments as a JSON-encoded string
fn normalize_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(Value::is_object)
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Dispatches tool calls against the shared program record
pub struct Toolbox {
    model: Arc<dyn LanguageModel>,
    store: Arc<ProgramStore>,
    designer: Arc<ThemeDesigner>,
    renderer: ProgramRenderer,
}

impl Toolbox {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<ProgramStore>,
        designer: Arc<ThemeDesigner>,
        renderer: ProgramRenderer,
    ) -> Self {
        Self {
            model,
            store,
            designer,
            renderer,
        }
    }

    /// Tool definitions to offer the model
    pub fn definitions(&self) -> Vec<Tool> {
        definitions::all()
    }

    pub fn store(&self) -> &Arc<ProgramStore> {
        &self.store
    }

    /// Run one tool call. Never fails: errors become `Error...` text.
    pub async fn dispatch(&self, call: &ToolCall, trace_id: &str) -> ToolOutcome {
        let name = call.function.name.as_str();
        let arguments = normalize_arguments(&call.function.arguments);
        let args = Args::new(&arguments);

        let span = info_span!("tool_call", trace_id = %trace_id, tool = %name, otel.name = "tool_call");

        let result = self.call(name, &args).instrument(span).await;

        match result {
            Ok(outcome) => {
                info!(trace_id = %trace_id, tool = %name, "Tool call succeeded");
                TOOL_CALLS.with_label_values(&[name, "ok"]).inc();
                outcome
            }
            Err(e) => {
                warn!(trace_id = %trace_id, tool = %name, error = %e, "Tool call failed");
                let label = match e {
                    ToolError::UnknownTool(_) => "unknown",
                    _ => name,
                };
                TOOL_CALLS.with_label_values(&[label, "error"]).inc();
                ToolOutcome::error(&e)
            }
        }
    }

    async fn call(&self, name: &str, args: &Args<'_>) -> Result<ToolOutcome, ToolError> {
        match name {
            PARSE_PROGRAM_TEXT => {
                let raw_text = args.required("raw_text")?;
                self.parse_program_text(&raw_text, &args.metadata())
                    .await
                    .map(ToolOutcome::text)
            }
            FIX_PROGRAM_DATA => {
                let instruction = args.required("fix_instruction")?;
                self.fix_program_data(&instruction).await.map(ToolOutcome::text)
            }
            GENERATE_PROGRAM_PDF => {
                let style = args.optional("style").unwrap_or_else(|| DEFAULT_STYLE.to_string());
                self.generate_program_pdf(&args.metadata(), &style).await
            }
            GET_CURRENT_PROGRAM => self.get_current_program().await.map(ToolOutcome::text),
            UPDATE_CONCERT_INFO => {
                let mut update = args.metadata();
                if let Some(kind) = args.optional("concert_type") {
                    update.concert_type = Some(ConcertType::parse(&kind).ok_or_else(|| {
                        ToolError::InvalidArgument {
                            name: "concert_type",
                            reason: format!("'{}' is not ONLINE or OFFLINE", kind),
                        }
                    })?);
                }
                Ok(ToolOutcome::text(self.update_concert_info(&update).await))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Extract performances from free text and make them the current program.
    pub async fn parse_program_text(&self, raw_text: &str, metadata: &MetadataUpdate) -> Result<String, ToolError> {
        let preview: String = raw_text.chars().take(100).collect();
        info!(preview = %preview, model = self.model.model_name(), "Parsing program text");

        let reply = self
            .model
            .generate(&prompts::parse_prompt(raw_text))
            .await
            .map_err(ToolError::failed("parsing program text"))?;

        let performances = match parse_performances(&reply) {
            Ok(performances) => performances,
            Err(ExtractError::InvalidJson(e)) => {
                warn!(error = %e, "Extraction reply was not JSON");
                return Err(ToolError::UnparseableProgram);
            }
            Err(e) => {
                return Err(ToolError::Failed {
                    action: "parsing program text",
                    reason: e.to_string(),
                })
            }
        };

        let program = self.store.replace_performances(performances, metadata).await;
        let mut lines = vec![format!(
            "Successfully parsed {} performances (total ~{} minutes):",
            program.performances.len(),
            program.total_minutes()
        )];
        lines.extend(program.summary_lines());
        Ok(lines.join("\n"))
    }

    /// Apply a natural-language correction to the current program.
    pub async fn fix_program_data(&self, instruction: &str) -> Result<String, ToolError> {
        let current = self.store.snapshot().await;
        if current.is_empty() {
            return Err(ToolError::NoProgram(
                "Error: No program data to fix. Please parse a program first.",
            ));
        }
        info!(instruction = %instruction, model = self.model.model_name(), "Fixing program data");

        let current_json = serde_json::to_string_pretty(&current).map_err(|e| ToolError::Failed {
            action: "fixing program data",
            reason: e.to_string(),
        })?;
        let reply = self
            .model
            .generate(&prompts::fix_prompt(&current_json, instruction))
            .await
            .map_err(ToolError::failed("fixing program data"))?;

        let correction = parse_correction(&reply).map_err(|e| ToolError::Failed {
            action: "fixing program data",
            reason: e.to_string(),
        })?;
        let program = self
            .store
            .merge_json(correction)
            .await
            .map_err(|e| ToolError::Failed {
                action: "fixing program data",
                reason: e.to_string(),
            })?;

        let mut lines = vec!["Program data updated successfully. Current program:".to_string()];
        lines.extend(program.summary_lines());
        Ok(lines.join("\n"))
    }

    /// Design a theme for `style` and render the program PDF.
    ///
    /// Metadata in `overrides` is used for this PDF only; the stored record is
    /// not changed.
    pub async fn generate_program_pdf(&self, overrides: &MetadataUpdate, style: &str) -> Result<ToolOutcome, ToolError> {
        let program = self.store.snapshot().await;
        if program.is_empty() {
            return Err(ToolError::NoProgram(
                "Error: No program data available. Please parse a program first using parse_program_text.",
            ));
        }
        info!(style = %style, "Generating program PDF");

        let heading = heading_for(&program, overrides);
        let theme = self.designer.theme_for(style).await;
        let theme_name = theme.name.clone();
        let count = program.performances.len();

        let renderer = self.renderer.clone();
        let path = tokio::task::spawn_blocking(move || renderer.write(&program, &theme, &heading))
            .await
            .map_err(|e| ToolError::Failed {
                action: "generating PDF",
                reason: e.to_string(),
            })??;

        Ok(ToolOutcome {
            content: format!(
                "Done! Concert program PDF generated in '{}' style with {} performances. Saved at concert_program.pdf.",
                theme_name, count
            ),
            generated: Some(path),
            is_error: false,
        })
    }

    /// Readable summary of the current program.
    pub async fn get_current_program(&self) -> Result<String, ToolError> {
        let program = self.store.snapshot().await;
        if program.is_empty() {
            return Ok("No program data loaded yet. Please parse a program first.".to_string());
        }

        let mut lines = Vec::new();
        for (label, value) in [
            ("Concert", &program.concert_title),
            ("Date", &program.concert_date),
            ("Time", &program.concert_time),
            ("Venue", &program.concert_venue),
        ] {
            if !value.is_empty() {
                lines.push(format!("{}: {}", label, value));
            }
        }
        lines.push(format!("\nProgram ({} performances):", program.performances.len()));
        lines.extend(program.summary_lines());
        Ok(lines.join("\n"))
    }

    /// Apply metadata and confirm what is now stored.
    pub async fn update_concert_info(&self, update: &MetadataUpdate) -> String {
        let program = self.store.apply_metadata(update).await;
        let or = |value: &str, fallback: &'static str| {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };
        format!(
            "Concert info updated: {} on {} at {}",
            or(&program.concert_title, "Untitled"),
            or(&program.concert_date, "TBD"),
            or(&program.concert_venue, "TBD")
        )
    }
}

/// Title block for a render: overrides first, then stored values.
fn heading_for(program: &ConcertProgram, overrides: &MetadataUpdate) -> Heading {
    let pick = |override_value: &Option<String>, stored: &str| {
        override_value
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| stored.trim().to_string())
    };
    let title = pick(&overrides.concert_title, &program.concert_title);
    Heading {
        title: if title.is_empty() { DEFAULT_TITLE.to_string() } else { title },
        date: pick(&overrides.concert_date, &program.concert_date),
        time: pick(&overrides.concert_time, &program.concert_time),
        venue: pick(&overrides.concert_venue, &program.concert_venue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Performance;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    const TWO_PIECES: &str = r#"```json
{"performances": [
  {"order": 1, "student_name": "Emma Li", "piece_name": "Für Elise (Beethoven)", "instrument": "Piano", "estimated_duration_minutes": 3},
  {"order": 2, "student_name": "Tommy Chen", "piece_name": "Minuet in G (Bach)", "instrument": "Violin", "estimated_duration_minutes": 4}
]}
```"#;

    fn toolbox(model: ScriptedModel, dir: &std::path::Path) -> (Toolbox, Arc<ScriptedModel>) {
        toolbox_with(model, dir, ProgramStore::new())
    }

    fn toolbox_with(model: ScriptedModel, dir: &std::path::Path, store: ProgramStore) -> (Toolbox, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let toolbox = Toolbox::new(
            model.clone(),
            Arc::new(store),
            Arc::new(ThemeDesigner::new(model.clone())),
            ProgramRenderer::new(dir),
        );
        (toolbox, model)
    }

    fn loaded_store() -> ProgramStore {
        ProgramStore::with_program(ConcertProgram {
            concert_title: "Spring Recital".to_string(),
            concert_date: "March 15, 2026".to_string(),
            performances: vec![
                Performance::new(1, "Emma Li", "Für Elise", "Piano", Some(3)),
                Performance::new(2, "Tommy Chen", "Minuet in G", "", None),
            ],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_parse_program_text() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, model) = toolbox(ScriptedModel::new().with_generate(TWO_PIECES), dir.path());

        let call = ToolCall::new(
            PARSE_PROGRAM_TEXT,
            json!({"raw_text": "Emma - Fur Elise\nTommy - Minuet", "concert_title": "Spring Recital"}),
        );
        let outcome = toolbox.dispatch(&call, "trace").await;

        assert!(!outcome.is_error);
        assert_eq!(
            outcome.content,
            "Successfully parsed 2 performances (total ~7 minutes):\n  \
             1. Emma Li — Für Elise (Beethoven) (Piano, ~3 min)\n  \
             2. Tommy Chen — Minuet in G (Bach) (Violin, ~4 min)"
        );
        assert!(model.prompts.lock().unwrap()[0].contains("Emma - Fur Elise"));

        let program = toolbox.store().snapshot().await;
        assert_eq!(program.concert_title, "Spring Recital");
        assert_eq!(program.performances.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_program_text_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, _) = toolbox(ScriptedModel::new().with_generate("Sure! Here are the performers."), dir.path());

        let outcome = toolbox
            .dispatch(&ToolCall::new(PARSE_PROGRAM_TEXT, json!({"raw_text": "Emma"})), "trace")
            .await;
        assert!(outcome.is_error);
        assert_eq!(
            outcome.content,
            "Error: Could not parse the program text. The AI response was not valid JSON. \
             Please try again with clearer formatting."
        );
        assert!(toolbox.store().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, model) = toolbox(ScriptedModel::new(), dir.path());

        let missing = toolbox
            .dispatch(&ToolCall::new(PARSE_PROGRAM_TEXT, json!({"raw_text": "  "})), "trace")
            .await;
        assert_eq!(missing.content, "Error: missing required argument 'raw_text'");

        let unknown = toolbox
            .dispatch(&ToolCall::new("delete_everything", json!({})), "trace")
            .await;
        assert_eq!(unknown.content, "Error: Unknown tool 'delete_everything'");
        assert_eq!(model.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_string_encoded_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, _) = toolbox(ScriptedModel::new(), dir.path());

        let call = ToolCall::new(UPDATE_CONCERT_INFO, json!("{\"venue\": \"Jordan Hall\"}"));
        let outcome = toolbox.dispatch(&call, "trace").await;
        assert_eq!(outcome.content, "Concert info updated: Untitled on TBD at Jordan Hall");
    }

    #[tokio::test]
    async fn test_fix_without_program() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, model) = toolbox(ScriptedModel::new(), dir.path());

        let outcome = toolbox
            .dispatch(&ToolCall::new(FIX_PROGRAM_DATA, json!({"fix_instruction": "swap"})), "trace")
            .await;
        assert_eq!(outcome.content, "Error: No program data to fix. Please parse a program first.");
        assert_eq!(model.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_fix_merges_correction() {
        let dir = tempfile::tempdir().unwrap();
        let reply = r#"{"performances": [
            {"order": 1, "student_name": "Emma Li", "piece_name": "Clair de Lune", "instrument": "Piano", "estimated_duration_minutes": 5},
            {"order": 2, "student_name": "Tommy Chen", "piece_name": "Minuet in G", "instrument": "", "estimated_duration_minutes": null}
        ]}"#;
        let (toolbox, model) = toolbox_with(ScriptedModel::new().with_generate(reply), dir.path(), loaded_store());

        let outcome = toolbox
            .dispatch(
                &ToolCall::new(FIX_PROGRAM_DATA, json!({"fix_instruction": "Emma plays Clair de Lune"})),
                "trace",
            )
            .await;
        assert_eq!(
            outcome.content,
            "Program data updated successfully. Current program:\n  \
             1. Emma Li — Clair de Lune (Piano, ~5 min)\n  \
             2. Tommy Chen — Minuet in G (N/A, ~? min)"
        );
        // prompt carries the pretty-printed record
        assert!(model.prompts.lock().unwrap()[0].contains("\"concert_title\": \"Spring Recital\""));
        // keys the correction omitted are kept
        assert_eq!(toolbox.store().snapshot().await.concert_date, "March 15, 2026");
    }

    #[tokio::test]
    async fn test_generate_without_program() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, _) = toolbox(ScriptedModel::new(), dir.path());

        let outcome = toolbox.dispatch(&ToolCall::new(GENERATE_PROGRAM_PDF, json!({})), "trace").await;
        assert_eq!(
            outcome.content,
            "Error: No program data available. Please parse a program first using parse_program_text."
        );
        assert_eq!(outcome.generated, None);
    }

    #[tokio::test]
    async fn test_generate_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let theme = r##"{"name": "Winter Frost", "bg_color": "#0b3d91", "layout": "table"}"##;
        let (toolbox, model) = toolbox_with(ScriptedModel::new().with_generate(theme), dir.path(), loaded_store());

        let call = ToolCall::new(GENERATE_PROGRAM_PDF, json!({"style": "winter", "venue": "Jordan Hall"}));
        let outcome = toolbox.dispatch(&call, "trace").await;

        assert_eq!(
            outcome.content,
            "Done! Concert program PDF generated in 'Winter Frost' style with 2 performances. Saved at concert_program.pdf."
        );
        let path = outcome.generated.unwrap();
        assert_eq!(path, dir.path().join("concert_program.pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
        assert!(model.prompts.lock().unwrap()[0].contains("winter"));
        // overrides are not stored
        assert_eq!(toolbox.store().snapshot().await.concert_venue, "");
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_default_theme() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, _) = toolbox_with(ScriptedModel::new(), dir.path(), loaded_store());

        let outcome = toolbox.dispatch(&ToolCall::new(GENERATE_PROGRAM_PDF, json!({})), "trace").await;
        assert!(outcome.content.contains("in 'Default' style"));
        assert!(outcome.generated.is_some());
    }

    #[tokio::test]
    async fn test_get_current_program() {
        let dir = tempfile::tempdir().unwrap();
        let (empty, _) = toolbox(ScriptedModel::new(), dir.path());
        assert_eq!(
            empty.get_current_program().await.unwrap(),
            "No program data loaded yet. Please parse a program first."
        );

        let (toolbox, _) = toolbox_with(ScriptedModel::new(), dir.path(), loaded_store());
        assert_eq!(
            toolbox.get_current_program().await.unwrap(),
            "Concert: Spring Recital\nDate: March 15, 2026\n\nProgram (2 performances):\n  \
             1. Emma Li — Für Elise (Piano, ~3 min)\n  \
             2. Tommy Chen — Minuet in G (N/A, ~? min)"
        );
    }

    #[tokio::test]
    async fn test_update_concert_info() {
        let dir = tempfile::tempdir().unwrap();
        let (toolbox, _) = toolbox(ScriptedModel::new(), dir.path());

        let call = ToolCall::new(
            UPDATE_CONCERT_INFO,
            json!({"concert_title": "Winter Showcase", "concert_date": "Dec 12", "concert_type": "online"}),
        );
        let outcome = toolbox.dispatch(&call, "trace").await;
        assert_eq!(outcome.content, "Concert info updated: Winter Showcase on Dec 12 at TBD");
        assert_eq!(toolbox.store().snapshot().await.concert_type, ConcertType::Online);

        let bad = ToolCall::new(UPDATE_CONCERT_INFO, json!({"concert_type": "hybrid"}));
        let outcome = toolbox.dispatch(&bad, "trace").await;
        assert!(outcome.is_error);
        assert!(outcome.content.starts_with("Error: invalid value for 'concert_type'"));
    }

    #[test]
    fn test_heading_prefers_overrides() {
        let program = ConcertProgram {
            concert_title: "Stored".to_string(),
            concert_time: "2 PM".to_string(),
            ..Default::default()
        };
        let overrides = MetadataUpdate {
            concert_title: Some("Override".to_string()),
            ..Default::default()
        };
        let heading = heading_for(&program, &overrides);
        assert_eq!(heading.title, "Override");
        assert_eq!(heading.time, "2 PM");

        let untitled = heading_for(&ConcertProgram::default(), &MetadataUpdate::default());
        assert_eq!(untitled.title, DEFAULT_TITLE);
    }
}
