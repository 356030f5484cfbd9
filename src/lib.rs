//! JARVIS - A memory-aware conversational assistant for the terminal.
//!
//! This crate implements an interactive assistant with two execution modes:
//! 1. Simple mode: a single persona streaming replies token-by-token
//! 2. Multi-agent mode: a supervisor routes requests through refiner,
//!    specialist, and reviewer agents before summarizing the outcome
//!
//! # Architecture
//!
//! The system uses:
//! - Gemini or Claude chat APIs over reqwest (SSE for streaming)
//! - SQLite (sqlx) for conversation history, usage patterns, and the
//!   embedding index behind semantic recall
//! - Tokio for the async runtime and the REPL's stdin loop
//!
//! # Example
//!
//! ```no_run
//! use jarvis::agent::SimpleAgent;
//! use jarvis::core::config::AppConfig;
//! use jarvis::memory::MemoryManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     jarvis::setup_logging(false);
//!
//!     let config = AppConfig::from_env();
//!     config.validate()?;
//!     config.ensure_dirs()?;
//!
//!     let memory = Arc::new(MemoryManager::open(&config, None).await?);
//!     let mut agent = SimpleAgent::new(&config, memory, "demo-session".into(), None)?;
//!
//!     let reply = agent.chat("Good evening, JARVIS.").await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod agent;
pub mod ai;
pub mod cli;
pub mod core;
pub mod errors;
pub mod memory;
pub mod prompts;

pub use errors::JarvisError;

/// Configure structured logging for the CLI.
///
/// Logs go to stderr in compact format so they never interleave with the
/// conversation on stdout. `RUST_LOG` overrides the default filter; `verbose`
/// raises the crate's own level to debug.
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jarvis=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jarvis=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}
