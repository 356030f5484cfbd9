//! Interactive terminal REPL.
//!
//! Plain stdin/stdout: the prompt, streaming deltas, and small aligned tables
//! for the memory commands. All logging goes to stderr via tracing so the
//! conversation itself stays clean.

pub mod command;

pub use command::{Command, parse_command};

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use uuid::Uuid;

use crate::agent::{AgentKind, SimpleAgent, StepStatus, StepUpdate, Workflow};
use crate::ai::{Embedder, GeminiEmbedder};
use crate::core::config::{AppConfig, Mode};
use crate::errors::JarvisError;
use crate::memory::{MemoryManager, MemoryStats, PatternEntry, SessionSummary};

const FAREWELL: &str = "JARVIS powering down. Memories preserved, Sir.";
const TABLE_LIMIT: usize = 10;
const RECALL_RESULTS: usize = 5;
const RECALL_PREVIEW_CHARS: usize = 200;

enum Runner {
    Simple(SimpleAgent),
    Multi(Workflow),
}

/// Runs the REPL until quit, EOF, or ctrl-c.
///
/// # Errors
///
/// Returns an error if startup fails (memory database, provider client);
/// in-conversation errors are printed and the loop continues.
pub async fn run(
    config: AppConfig,
    session: Option<Uuid>,
    custom_style: Option<String>,
    fast: bool,
) -> Result<(), JarvisError> {
    print_welcome(&config);

    let embedder = GeminiEmbedder::from_config(&config)?
        .map(|e| Arc::new(e) as Arc<dyn Embedder>);
    let memory = Arc::new(MemoryManager::open(&config, embedder).await?);

    let session_id = session.unwrap_or_else(Uuid::new_v4).to_string();
    println!("Session: {}...", clip(&session_id, 8));
    println!();

    match memory.stats().await {
        Ok(stats) if stats.total_messages > 0 => {
            println!(
                "Memory: {} messages across {} sessions",
                stats.total_messages, stats.total_sessions
            );
            println!();
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to read memory stats: {e}"),
    }

    let mut runner = match config.mode() {
        Mode::Simple => Runner::Simple(SimpleAgent::new(
            &config,
            Arc::clone(&memory),
            session_id.clone(),
            custom_style.as_deref(),
        )?),
        Mode::Multi => Runner::Multi(Workflow::new(
            &config,
            Arc::clone(&memory),
            session_id.clone(),
        )?),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt_user();

        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            line = lines.next_line() => match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {e}");
                    None
                }
            },
        };

        let Some(input) = next else {
            println!();
            println!("{FAREWELL}");
            break;
        };

        match parse_command(&input) {
            Command::Empty => {}
            Command::Quit => {
                println!();
                println!("{FAREWELL}");
                break;
            }
            Command::Clear => {
                match &mut runner {
                    Runner::Simple(agent) => agent.clear_history(),
                    Runner::Multi(_) => {}
                }
                println!("Session history cleared. Persistent memory intact, Sir.");
                println!();
            }
            Command::Memory => {
                match memory.stats().await {
                    Ok(stats) => print_stats(&stats),
                    Err(e) => println!("Error reading memory statistics: {e}"),
                }
                println!();
            }
            Command::Patterns => {
                match memory.patterns(None, 2).await {
                    Ok(patterns) if patterns.is_empty() => {
                        println!("No patterns detected yet, Sir. Keep chatting.");
                    }
                    Ok(patterns) => print_patterns(&patterns),
                    Err(e) => println!("Error reading patterns: {e}"),
                }
                println!();
            }
            Command::Sessions => {
                match memory.all_sessions().await {
                    Ok(sessions) if sessions.is_empty() => {
                        println!("No past sessions found, Sir.");
                    }
                    Ok(sessions) => print_sessions(&sessions),
                    Err(e) => println!("Error reading sessions: {e}"),
                }
                println!();
            }
            Command::Recall(query) => {
                if !query.is_empty() {
                    let hits = memory.recall(&query, RECALL_RESULTS, None).await;
                    print_recall(&query, &hits);
                }
                println!();
            }
            Command::Mode => {
                println!("Current mode: {}", config.status_line());
                println!();
            }
            Command::Chat(message) => match &mut runner {
                Runner::Simple(agent) => chat_simple(agent, &message).await,
                Runner::Multi(workflow) => chat_multi(workflow, &message, fast).await,
            },
        }
    }

    memory.close().await;
    Ok(())
}

async fn chat_simple(agent: &mut SimpleAgent, message: &str) {
    println!();
    println!("JARVIS:");

    let result = agent
        .stream(message, |delta| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        })
        .await;

    match result {
        Ok(_) => {
            println!();
            println!();
        }
        Err(e) => {
            println!();
            println!("Error: {e}");
            println!("Attempting to continue...");
            println!();
        }
    }
}

async fn chat_multi(workflow: &Workflow, message: &str, fast: bool) {
    println!();

    let on_step = |step: StepUpdate| match step.status {
        StepStatus::Started => {
            println!("[{} working...]", step.agent.label());
        }
        StepStatus::Finished => {
            if step.agent == AgentKind::Supervisor {
                println!();
                println!("JARVIS:");
            } else {
                println!();
                println!("--- {} ---", step.agent.label());
            }
            println!("{}", step.content);
            println!();
        }
    };

    let result = if fast {
        workflow.run_fast(message, on_step).await
    } else {
        workflow.run(message, false, on_step).await
    };

    if let Err(e) = result {
        println!();
        println!("Error: {e}");
        println!("Attempting to continue...");
        println!();
    }
}

fn prompt_user() {
    print!("You: ");
    let _ = std::io::stdout().flush();
}

fn print_welcome(config: &AppConfig) {
    println!("========================================");
    println!("  JARVIS v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  Good evening, Sir. JARVIS online with memory systems active.");
    println!();
    println!("  Mode:  {}", config.status_line());
    println!("  Model: {}", config.model());
    println!();
    println!("  Commands:");
    println!("    /clear           Clear session history");
    println!("    /memory          Show memory statistics");
    println!("    /patterns        Show detected patterns");
    println!("    /sessions        List past sessions");
    println!("    /recall <query>  Search memories");
    println!("    /mode            Show current mode");
    println!("    /quit            Exit");
    println!();
    println!("  Type your request to begin.");
    println!("========================================");
    println!();
}

fn print_stats(stats: &MemoryStats) {
    println!("Memory Statistics");
    println!("  {:<18} {}", "Total Messages", stats.total_messages);
    println!("  {:<18} {}", "Total Sessions", stats.total_sessions);
    println!("  {:<18} {}", "Tracked Patterns", stats.total_patterns);
    println!("  {:<18} {}", "Embedded Chunks", stats.embedded_chunks);
}

fn print_patterns(patterns: &[PatternEntry]) {
    println!("Detected Patterns");
    println!("  {:<14} {:<22} {}", "Type", "Pattern", "Frequency");
    for p in patterns.iter().take(TABLE_LIMIT) {
        println!(
            "  {:<14} {:<22} {}",
            p.pattern_type, p.pattern_data, p.frequency
        );
    }
}

fn print_sessions(sessions: &[SessionSummary]) {
    println!("Past Sessions");
    println!("  {:<12} {:<18} {}", "Session ID", "Started", "Messages");
    for s in sessions.iter().take(TABLE_LIMIT) {
        println!(
            "  {:<12} {:<18} {}",
            format!("{}...", clip(&s.session_id, 8)),
            clip(&s.started, 16),
            s.message_count
        );
    }
}

fn print_recall(query: &str, hits: &[crate::memory::MemoryHit]) {
    if hits.is_empty() {
        println!("No relevant memories found, Sir.");
        return;
    }

    println!();
    println!("Memories related to '{query}':");
    println!();
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. ({:.0}% match)", i + 1, hit.relevance * 100.0);
        println!("   {}...", clip(&hit.content, RECALL_PREVIEW_CHARS));
        println!();
    }
}

/// Char-safe prefix for display clipping.
fn clip(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
