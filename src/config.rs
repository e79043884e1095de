//! Runtime configuration from the environment
//!
//! `.env` is loaded first (when present) so local development needs no
//! exported variables. Every key has a default.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: SocketAddr,
    pub ollama_url: String,
    pub model: String,
    /// Served under `/static`; holds the generated PDF and `uploads/`
    pub static_dir: PathBuf,
    pub max_iterations: usize,
    pub max_history_messages: usize,
    /// Live chat sessions kept before the least recently used is dropped
    pub max_sessions: usize,
    pub max_upload_bytes: usize,
    pub rate_burst: u64,
    pub rate_per_sec: f64,
    pub allowed_origins: Vec<String>,
    /// OTLP collector; tracing export is off when unset
    pub otlp_endpoint: Option<String>,
}

/// A key was set to a value that does not parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value '{}' for {}: {}", self.value, self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            ollama_url: "http://localhost:11434".to_string(),
            model: "qwen3".to_string(),
            static_dir: PathBuf::from("static"),
            max_iterations: 10,
            max_history_messages: 40,
            max_sessions: 1000,
            max_upload_bytes: 10 * 1024 * 1024,
            rate_burst: 20,
            rate_per_sec: 2.0,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration from a fixed set of variables
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            bind: parsed(get("RECITAL_BIND"), "RECITAL_BIND", defaults.bind)?,
            ollama_url: get("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            model: get("RECITAL_MODEL").unwrap_or(defaults.model),
            static_dir: get("RECITAL_STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            max_iterations: positive(get("RECITAL_MAX_ITERATIONS"), "RECITAL_MAX_ITERATIONS", defaults.max_iterations)?,
            max_history_messages: positive(get("RECITAL_MAX_HISTORY"), "RECITAL_MAX_HISTORY", defaults.max_history_messages)?,
            max_sessions: positive(get("RECITAL_MAX_SESSIONS"), "RECITAL_MAX_SESSIONS", defaults.max_sessions)?,
            max_upload_bytes: positive(get("RECITAL_MAX_UPLOAD_BYTES"), "RECITAL_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            rate_burst: positive(get("RECITAL_RATE_BURST"), "RECITAL_RATE_BURST", defaults.rate_burst as usize)? as u64,
            rate_per_sec: rate(get("RECITAL_RATE_PER_SEC"), defaults.rate_per_sec)?,
            allowed_origins: get("RECITAL_ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(defaults.allowed_origins),
            otlp_endpoint: get("RECITAL_OTLP_ENDPOINT"),
        })
    }
}

fn parsed<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

fn positive(value: Option<String>, key: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = value.clone();
    let n = parsed(value, key, default)?;
    if n == 0 {
        return Err(ConfigError {
            key,
            value: raw.unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(n)
}

fn rate(value: Option<String>, default: f64) -> Result<f64, ConfigError> {
    const KEY: &str = "RECITAL_RATE_PER_SEC";
    let raw = value.clone();
    let r: f64 = parsed(value, KEY, default)?;
    if !r.is_finite() || r <= 0.0 {
        return Err(ConfigError {
            key: KEY,
            value: raw.unwrap_or_default(),
            reason: "must be a positive number".to_string(),
        });
    }
    Ok(r)
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_map(&HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.allowed_origins.len(), 3);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_map(&vars(&[
            ("RECITAL_BIND", "127.0.0.1:9000"),
            ("RECITAL_MODEL", "llama3.2"),
            ("RECITAL_MAX_ITERATIONS", "4"),
            ("RECITAL_MAX_SESSIONS", "25"),
            ("RECITAL_RATE_PER_SEC", "0.5"),
            ("RECITAL_ALLOWED_ORIGINS", "https://recital.example.com/, http://localhost:8080"),
            ("RECITAL_OTLP_ENDPOINT", "http://localhost:4317"),
            ("OLLAMA_URL", "  "),
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.max_sessions, 25);
        assert_eq!(config.rate_per_sec, 0.5);
        assert_eq!(
            config.allowed_origins,
            vec!["https://recital.example.com", "http://localhost:8080"]
        );
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
        // blank values fall back to defaults
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = Config::from_map(&vars(&[("RECITAL_MAX_HISTORY", "lots")])).unwrap_err();
        assert_eq!(err.key, "RECITAL_MAX_HISTORY");
        assert_eq!(err.value, "lots");

        let err = Config::from_map(&vars(&[("RECITAL_MAX_ITERATIONS", "0")])).unwrap_err();
        assert_eq!(err.key, "RECITAL_MAX_ITERATIONS");

        let err = Config::from_map(&vars(&[("RECITAL_RATE_PER_SEC", "-1")])).unwrap_err();
        assert_eq!(err.key, "RECITAL_RATE_PER_SEC");
        assert!(err.to_string().contains("RECITAL_RATE_PER_SEC"));
    }
}
