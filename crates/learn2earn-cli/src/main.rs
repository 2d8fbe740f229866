//! Learn2Earn CLI
//!
//! Runs lesson programs, lists courses, plays a course in the terminal and
//! serves the backend API.

mod onchain;
mod play;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use learn2earn_course::{create_router, AppState, Catalog, Config, GeminiGenerator};
use learn2earn_playground::{check, Interpreter, Program};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Learn2Earn - learn to code, earn on completion
///
/// Interactive coding courses checked by a small Python-like interpreter,
/// with completion rewards recorded by the Learn2Earn contract.
#[derive(Parser, Debug)]
#[command(name = "learn2earn")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: learn2earn.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Directory with additional course JSON files
    #[arg(long, value_name = "DIR", global = true)]
    courses_dir: Option<PathBuf>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program and print its output
    Run {
        /// Program file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Expected output; the command fails if the output differs
        #[arg(short, long, value_name = "TEXT")]
        expected: Option<String>,
    },

    /// List available courses
    Courses {
        /// Mark the courses this wallet has completed on chain
        #[arg(short, long, value_name = "ADDRESS")]
        wallet: Option<String>,
    },

    /// Play a course interactively
    Play {
        /// Course id, e.g. python-basics
        #[arg(value_name = "COURSE_ID")]
        course_id: String,

        /// Wallet address used when claiming the reward
        #[arg(short, long, value_name = "ADDRESS")]
        wallet: Option<String>,
    },

    /// Start the backend HTTP API
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.courses_dir {
        config.courses_dir = Some(dir);
    }

    match args.command {
        Command::Run { file, expected } => run_file(&file, expected.as_deref()).await,
        Command::Courses { wallet } => list_courses(&config, wallet.as_deref()).await,
        Command::Play { course_id, wallet } => {
            let catalog = Catalog::load(config.courses_dir.as_deref())?;
            let course = catalog.require(&course_id)?;
            play::play(course, &config, wallet).await
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;
            serve(config).await
        }
    }
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Executes a program file and optionally checks its output.
async fn run_file(file: &Path, expected: Option<&str>) -> anyhow::Result<()> {
    let source = tokio::fs::read_to_string(file).await.map_err(|e| {
        anyhow::anyhow!("Failed to read '{}': {e}", file.display())
    })?;

    let mut interpreter = Interpreter::new();
    let result = interpreter.run(&Program::parse(&source));
    for line in interpreter.output() {
        println!("{line}");
    }
    result?;

    if let Some(expected) = expected {
        let verdict = check(interpreter.output(), expected);
        match verdict.message() {
            None => println!("✓ Output matches"),
            Some(message) => anyhow::bail!("{message}"),
        }
    }
    Ok(())
}

/// Prints the catalog, marking courses `wallet` completed on chain.
async fn list_courses(config: &Config, wallet: Option<&str>) -> anyhow::Result<()> {
    let catalog = Catalog::load(config.courses_dir.as_deref())?;
    let completed = match wallet {
        Some(wallet) => onchain::completed_courses(&onchain::node(config), config, wallet).await,
        None => HashSet::new(),
    };

    println!("Available courses:");
    for summary in catalog.summaries() {
        let marker = if completed.contains(&summary.id) { "✓" } else { " " };
        println!(
            "{marker} {} {:<18} {} ({} modules, {}, {})",
            summary.icon,
            summary.id,
            summary.title,
            summary.module_count,
            summary.difficulty,
            summary.duration
        );
        if !summary.description.is_empty() {
            println!("     {}", summary.description);
        }
    }
    Ok(())
}

/// Runs the backend until Ctrl+C.
async fn serve(config: Config) -> anyhow::Result<()> {
    let catalog = Catalog::load(config.courses_dir.as_deref())?;
    let generator = GeminiGenerator::from_config(&config.generator)?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    println!("Starting Learn2Earn backend on {addr}...");
    println!("  Courses: {}", catalog.len());
    println!("  Generator model: {}", config.generator.model);

    let router = create_router(AppState::new(config, catalog, Arc::new(generator)));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port")
    })?;

    println!("Backend running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!("Backend stopped");
    Ok(())
}
