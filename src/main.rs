use clap::{Parser, ValueEnum};
use uuid::Uuid;

use jarvis::cli;
use jarvis::core::config::AppConfig;
use jarvis::prompts::sanitize_custom_prompt;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Single agent with streaming replies
    Simple,
    /// Supervisor-routed specialist workflow
    Multi,
}

#[derive(Debug, Parser)]
#[command(name = "jarvis", version, about = "Memory-aware conversational assistant")]
struct Cli {
    /// Execution mode (overrides the SIMPLE_MODE environment flag)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Resume an existing session by id
    #[arg(long)]
    session: Option<Uuid>,

    /// Custom persona style layered on top of the default prompt
    #[arg(long)]
    style: Option<String>,

    /// Multi-agent mode: skip the refiner and reviewer steps (fewer API calls)
    #[arg(long)]
    fast: bool,

    /// Enable debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Cli::parse();

    jarvis::setup_logging(args.verbose);
    tracing::info!("Starting jarvis CLI");

    let mut config = AppConfig::from_env();
    match args.mode {
        Some(ModeArg::Simple) => config.simple_mode = true,
        Some(ModeArg::Multi) => config.simple_mode = false,
        None => {}
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {e}");
        eprintln!("{e}");
        eprintln!("Copy .env.example to .env and fill in an API key.");
        std::process::exit(1);
    }

    config.ensure_dirs()?;

    let style = match args.style.as_deref() {
        Some(raw) => match sanitize_custom_prompt(raw) {
            Ok(clean) => Some(clean),
            Err(e) => {
                eprintln!("Rejected --style: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    cli::run(config, args.session, style, args.fast).await?;
    Ok(())
}
