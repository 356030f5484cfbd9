use std::env;
use std::path::PathBuf;

use crate::errors::JarvisError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Which hosted LLM backs the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Claude,
}

impl Provider {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Claude => "Claude",
        }
    }
}

/// Execution mode for the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Simple,
    Multi,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_model: String,
    pub claude_model: String,
    pub embedding_model: String,
    pub use_gemini_only: bool,
    pub use_claude_only: bool,
    pub simple_mode: bool,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup. `from_env` is the
    /// thin wrapper over process env; tests supply a closure instead of
    /// mutating global state.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        Self {
            google_api_key: non_empty("GOOGLE_API_KEY"),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            claude_model: non_empty("CLAUDE_MODEL").unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.into()),
            embedding_model: non_empty("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            use_gemini_only: flag("USE_GEMINI_ONLY"),
            use_claude_only: flag("USE_CLAUDE_ONLY"),
            simple_mode: flag("SIMPLE_MODE"),
            data_dir: non_empty("JARVIS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        }
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` when the selected provider has no API key, or
    /// when no key is set at all.
    pub fn validate(&self) -> Result<(), JarvisError> {
        let mut errors: Vec<&str> = Vec::new();

        if self.use_gemini_only && self.google_api_key.is_none() {
            errors.push("GOOGLE_API_KEY not set");
        } else if self.use_claude_only && self.anthropic_api_key.is_none() {
            errors.push("ANTHROPIC_API_KEY not set");
        } else if self.google_api_key.is_none() && self.anthropic_api_key.is_none() {
            errors.push("No API keys set - need GOOGLE_API_KEY or ANTHROPIC_API_KEY");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(JarvisError::ConfigError(errors.join(", ")))
        }
    }

    /// Resolves the active chat provider. Claude only when explicitly
    /// requested; Gemini is the default.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        if self.use_claude_only {
            Provider::Claude
        } else {
            Provider::Gemini
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        match self.provider() {
            Provider::Gemini => &self.gemini_model,
            Provider::Claude => &self.claude_model,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.simple_mode {
            Mode::Simple
        } else {
            Mode::Multi
        }
    }

    #[must_use]
    pub fn status_line(&self) -> String {
        match self.mode() {
            Mode::Simple => format!("Simple Mode ({})", self.provider().label()),
            Mode::Multi => "Multi-Agent Mode".to_string(),
        }
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("jarvis_memory.db")
    }

    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
