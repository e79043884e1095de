//! Model-designed themes with memoization
//!
//! Asking the model for a theme is slow, and teachers tend to regenerate the
//! same program many times with the same style while fixing typos. Successful
//! designs are cached under the normalized description; failures fall back to
//! the default theme and are not cached, so the next request retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::{Theme, ThemeDraft};
use crate::metrics::THEME_LOOKUPS;
use crate::ollama::LanguageModel;
use crate::program::{prompts, strip_code_fences};

/// Generates themes from style descriptions, remembering past answers
pub struct ThemeDesigner {
    model: Arc<dyn LanguageModel>,
    cache: Mutex<HashMap<String, Theme>>,
}

impl ThemeDesigner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Cache key: lowercased, trimmed description
    pub fn cache_key(description: &str) -> String {
        description.trim().to_lowercase()
    }

    /// Theme for a style description; never fails.
    pub async fn theme_for(&self, description: &str) -> Theme {
        let key = Self::cache_key(description);

        if let Some(theme) = self.cached(&key) {
            info!(style = %key, theme = %theme.name, "Using cached theme");
            THEME_LOOKUPS.with_label_values(&["hit"]).inc();
            return theme;
        }

        match self.design(description).await {
            Ok(theme) => {
                info!(style = %key, theme = %theme.name, model = self.model.model_name(), "Generated theme");
                THEME_LOOKUPS.with_label_values(&["miss"]).inc();
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key, theme.clone());
                }
                theme
            }
            Err(e) => {
                warn!(style = %key, error = %e, "Theme generation failed, using default");
                THEME_LOOKUPS.with_label_values(&["fallback"]).inc();
                Theme::default()
            }
        }
    }

    /// Number of cached designs
    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cached(&self, key: &str) -> Option<Theme> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    async fn design(&self, description: &str) -> Result<Theme, Box<dyn std::error::Error + Send + Sync>> {
        let reply = self.model.generate(&prompts::theme_prompt(description)).await?;
        let draft: ThemeDraft = serde_json::from_str(strip_code_fences(&reply))?;
        Ok(draft.resolve())
    }
}
