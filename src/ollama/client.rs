//! Ollama API client for one-shot prompt completion

use futures_util::stream::StreamExt;

use super::tool_use::ChatError;

/// Response from Ollama's generate endpoint with metadata
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// The generated text
    pub response: String,
    /// Number of tokens generated
    pub eval_count: u32,
    /// Number of tokens in the prompt
    pub prompt_eval_count: u32,
    /// Time spent generating tokens (nanoseconds)
    pub eval_duration_ns: u64,
}

impl GenerateResponse {
    /// Fold one NDJSON line from the streaming endpoint into the response
    fn absorb(&mut self, data: &serde_json::Value) {
        if let Some(token) = data["response"].as_str() {
            self.response.push_str(token);
        }

        // Ollama sends metadata only in the final message
        if data["done"].as_bool() == Some(true) {
            self.eval_count = data["eval_count"].as_u64().unwrap_or(0) as u32;
            self.prompt_eval_count = data["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
            self.eval_duration_ns = data["eval_duration"].as_u64().unwrap_or(0);
        }
    }
}

/// Client for Ollama's `/api/generate` endpoint
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the Ollama server (e.g., "http://localhost:11434")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Generate a complete response from Ollama
    ///
    /// The endpoint streams newline-delimited JSON. Network chunks do not line
    /// up with JSON lines, so bytes are buffered until a full line arrives.
    ///
    /// # Arguments
    /// * `prompt` - The input prompt for the LLM
    /// * `model` - The model name (e.g., "qwen3")
    /// * `trace_id` - Optional trace ID for request correlation
    pub async fn generate(
        &self,
        prompt: impl Into<String>,
        model: impl Into<String>,
        trace_id: Option<&str>,
    ) -> Result<GenerateResponse, ChatError> {
        let endpoint = format!("{}/api/generate", self.base_url);
        let prompt = prompt.into();
        let model = model.into();

        let mut request = self.client.post(&endpoint).json(&serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": true,
            "options": {
                "temperature": 0.0
            }
        }));

        if let Some(tid) = trace_id {
            request = request.header("X-Trace-Id", tid);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status(status.as_u16(), body));
        }

        let mut bytes_stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut result = GenerateResponse::default();
        let mut saw_line = false;

        while let Some(chunk_result) = bytes_stream.next().await {
            pending.extend_from_slice(&chunk_result?);

            while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                if absorb_line(&mut result, &line)? {
                    saw_line = true;
                }
            }
        }

        // Last line may arrive without a trailing newline
        if absorb_line(&mut result, &pending)? {
            saw_line = true;
        }

        if !saw_line {
            return Err(ChatError::EmptyResponse);
        }

        Ok(result)
    }
}

/// Returns `Ok(true)` when the line carried a JSON object
fn absorb_line(result: &mut GenerateResponse, line: &[u8]) -> Result<bool, ChatError> {
    let trimmed = trim_ascii(line);
    if trimmed.is_empty() {
        return Ok(false);
    }
    let data: serde_json::Value = serde_json::from_slice(trimmed)?;
    if let Some(err) = data["error"].as_str() {
        return Err(ChatError::Status(500, err.to_string()));
    }
    result.absorb(&data);
    Ok(true)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end.max(start)]
}
