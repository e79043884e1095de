//! `POST /api/chat`: one user message, optionally with a file

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::AppState;
use crate::agent::SessionStore;
use crate::metrics::{CHAT_REQUESTS, UPLOAD_BYTES};

/// Reply used when the model produced no text
pub const EMPTY_REPLY: &str = "Sorry, I didn't get a response. Please try again.";

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// URL of a PDF generated during this turn, cache-busted
    pub generated_file: Option<String>,
    pub session_id: String,
}

/// Form fields after reading the multipart body
#[derive(Debug, Default)]
struct ChatForm {
    message: Option<String>,
    session_id: Option<String>,
    upload: Option<(String, Vec<u8>)>,
}

pub async fn chat(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ChatReply>, ApiError> {
    if let Err(e) = state.limiter.try_acquire() {
        warn!(retry_after_secs = e.retry_after_secs(), "Chat request rate limited");
        CHAT_REQUESTS.with_label_values(&["rate_limited"]).inc();
        return Err(e.into());
    }
    debug!(tokens_left = state.limiter.available_tokens(), "Chat request admitted");

    match handle(&state, multipart).await {
        Ok(reply) => {
            CHAT_REQUESTS.with_label_values(&["ok"]).inc();
            Ok(Json(reply))
        }
        Err(e) => {
            let label = if e.status().is_client_error() { "bad_request" } else { "error" };
            CHAT_REQUESTS.with_label_values(&[label]).inc();
            warn!(error = %e, status = %e.status(), "Chat request failed");
            Err(e)
        }
    }
}

async fn handle(state: &AppState, multipart: Multipart) -> Result<ChatReply, ApiError> {
    let form = read_form(multipart, state.max_upload_bytes).await?;
    let session_id = SessionStore::resolve_id(form.session_id.as_deref());

    let mut user_input = form
        .message
        .ok_or_else(|| ApiError::BadRequest("Field 'message' is required".to_string()))?;

    if let Some((file_name, bytes)) = form.upload {
        let saved = save_upload(&state.static_dir, &file_name, &bytes).await?;
        info!(file = %saved.display(), bytes = bytes.len(), "Stored upload");
        user_input.push_str(&format!(
            "\n[System: User uploaded a file. It is saved at: {}]",
            saved.display()
        ));
    }

    if user_input.trim().is_empty() {
        return Err(ApiError::BadRequest("Field 'message' must not be empty".to_string()));
    }

    let result = state.agent.run(&session_id, &user_input).await?;

    let response = if result.final_response.trim().is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        result.final_response
    };
    let generated_file = result.generated_file.as_deref().map(generated_url);

    Ok(ChatReply {
        response,
        generated_file,
        session_id,
    })
}

async fn read_form(mut multipart: Multipart, max_upload_bytes: usize) -> Result<ChatForm, ApiError> {
    let mut form = ChatForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => form.message = Some(field.text().await?),
            "session_id" => form.session_id = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if bytes.len() > max_upload_bytes {
                    return Err(ApiError::PayloadTooLarge(max_upload_bytes));
                }
                // Browsers send an empty part when no file was picked
                if !file_name.is_empty() && !bytes.is_empty() {
                    UPLOAD_BYTES.observe(bytes.len() as f64);
                    form.upload = Some((file_name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Write an upload under `<static_dir>/uploads/` and return its absolute path.
async fn save_upload(static_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let dir = static_dir.join("uploads");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(sanitize_file_name(file_name));
    tokio::fs::write(&path, bytes).await?;
    Ok(tokio::fs::canonicalize(&path).await.unwrap_or(path))
}

/// Reduce a client-supplied name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Public URL of a generated file, with a timestamp so browsers refetch it
pub fn generated_url(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("/static/{}?t={}", name, now)
}
