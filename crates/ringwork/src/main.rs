use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ringwork_core::config::AnalysisConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

const DEFAULT_CONFIG: &str = "ringwork.toml";
const CONFIG_ENV: &str = "RINGWORK_CONFIG";

/// Tree-ring chronology, crossdating and growth-release report
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Analysis configuration (TOML). Falls back to $RINGWORK_CONFIG, then ./ringwork.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis and write every output table
    Run(RunArgs),
    /// Correlate each series with the others and show which would be removed
    Correlate,
    /// Check dating in overlapping segments
    Crossdate,
    /// Detect growth releases and print yearly counts
    Releases,
    /// Descriptive statistics per series
    Stats,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Override `output.dir` from the configuration
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Loaded configuration plus the directory its relative paths resolve from.
pub struct Session {
    pub config: AnalysisConfig,
    pub base_dir: PathBuf,
}

fn load_session(explicit: Option<PathBuf>) -> Result<Session> {
    let path = explicit
        .or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = AnalysisConfig::from_path(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    info!(config = %path.display(), "configuration loaded");
    Ok(Session { config, base_dir })
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let session = load_session(cli.config)?;
    match cli.command {
        Command::Run(args) => commands::run::handle(&session, args.output),
        Command::Correlate => commands::correlate::handle(&session),
        Command::Crossdate => commands::crossdate::handle(&session),
        Command::Releases => commands::releases::handle(&session),
        Command::Stats => commands::stats::handle(&session),
    }
}
