//! Process-wide settings.
//!
//! Built once at startup (defaults, then `.env`/environment, then CLI
//! flags) and passed by reference into the orchestrator. Nothing reads the
//! environment after construction.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chunk::DEFAULT_MAX_CHARS;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Output token budgets per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBudgets {
    /// Per-chunk requirement summary.
    pub summary: u32,
    /// Merge of all chunk summaries into the global spec.
    pub merge: u32,
    /// File plan.
    pub plan: u32,
    /// One generated or regenerated file.
    pub file: u32,
    /// Change specification for an update.
    pub change_spec: u32,
}

impl Default for TokenBudgets {
    fn default() -> Self {
        Self { summary: 2048, merge: 4096, plan: 2048, file: 8192, change_spec: 2048 }
    }
}

/// Settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Model identifier sent with every generation request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Root directory of the filesystem object store.
    pub store_root: PathBuf,
    /// Prefix of every project namespace in the object store.
    pub key_prefix: String,
    /// Maximum characters per requirement chunk.
    pub max_chunk_chars: usize,
    /// Maximum concurrent generation calls within one invocation.
    pub max_concurrency: usize,
    /// Retries after the first attempt for transient generation failures.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Deadline for one generation call.
    pub generation_timeout: Duration,
    /// Deadline for one object store call.
    pub store_timeout: Duration,
    /// Maximum files picked by the relevance fallback.
    pub relevance_max_count: usize,
    /// Output token budgets.
    pub tokens: TokenBudgets,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            store_root: PathBuf::from(".quill/store"),
            key_prefix: "projects/".to_string(),
            max_chunk_chars: DEFAULT_MAX_CHARS,
            max_concurrency: 4,
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
            generation_timeout: Duration::from_secs(300),
            store_timeout: Duration::from_secs(30),
            relevance_max_count: 5,
            tokens: TokenBudgets::default(),
        }
    }
}

impl Settings {
    /// Builds settings from defaults overridden by `QUILL_*` environment
    /// variables. A `.env` file in the working directory is loaded first.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a value does not parse.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a value does not parse.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, String>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("QUILL_MODEL") {
            settings.model = model;
        }
        if let Some(dir) = get("QUILL_STORE_DIR") {
            settings.store_root = PathBuf::from(dir);
        }
        if let Some(prefix) = get("QUILL_KEY_PREFIX") {
            settings.key_prefix = prefix;
        }
        if let Some(v) = get("QUILL_TEMPERATURE") {
            settings.temperature = parse_var("QUILL_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("QUILL_CHUNK_CHARS") {
            settings.max_chunk_chars = parse_positive("QUILL_CHUNK_CHARS", &v)?;
        }
        if let Some(v) = get("QUILL_MAX_CONCURRENCY") {
            settings.max_concurrency = parse_positive("QUILL_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("QUILL_MAX_RETRIES") {
            settings.max_retries = parse_var("QUILL_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("QUILL_RETRY_BACKOFF_MS") {
            settings.retry_backoff = Duration::from_millis(parse_var("QUILL_RETRY_BACKOFF_MS", &v)?);
        }
        if let Some(v) = get("QUILL_GENERATION_TIMEOUT_SECS") {
            settings.generation_timeout =
                Duration::from_secs(parse_var("QUILL_GENERATION_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("QUILL_STORE_TIMEOUT_SECS") {
            settings.store_timeout = Duration::from_secs(parse_var("QUILL_STORE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("QUILL_RELEVANCE_MAX") {
            settings.relevance_max_count = parse_positive("QUILL_RELEVANCE_MAX", &v)?;
        }

        Ok(settings)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| format!("Invalid value for {name} ({value:?}): {e}"))
}

fn parse_positive(name: &str, value: &str) -> Result<usize, String> {
    match parse_var::<usize>(name, value)? {
        0 => Err(format!("Invalid value for {name}: must be at least 1")),
        n => Ok(n),
    }
}
