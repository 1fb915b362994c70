use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mapreduce_engine::config::JobConfig;
use mapreduce_engine::mapreduce::{apps, run_job};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

/// Word count over an in-process MapReduce engine
#[derive(Parser)]
#[command(name = "mapreduce")]
#[command(about = "Run a word-count MapReduce job with concurrent in-process workers", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Count words in the given files (default command)
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config {
        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Path to configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Number of reduce partitions
    #[arg(short = 'r', long)]
    reduce: Option<usize>,

    /// Print outputs, worker stats and progress as JSON
    #[arg(long)]
    json: bool,

    /// Input files, one map task each (default: built-in sample text)
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("mapreduce started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Some(Commands::Run(args)) => run(args).await,
        Some(Commands::Config { config }) => show_config(config.as_deref()).await,
        None => run(RunArgs::default()).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = JobConfig::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }
    if let Some(reduce) = args.reduce {
        config.num_reduce = reduce;
    }

    let inputs = if args.files.is_empty() {
        apps::DEMO_INPUTS.iter().map(|s| s.to_string()).collect()
    } else {
        read_inputs(&args.files).await?
    };

    let output = run_job(
        inputs,
        Arc::new(apps::word_count_map),
        Arc::new(apps::word_count_reduce),
        &config,
    )
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", output.render());
    }
    Ok(())
}

async fn read_inputs(files: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read input {}", path.display()))?;
        inputs.push(content);
    }
    Ok(inputs)
}

async fn show_config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = JobConfig::load(path)
        .await
        .context("Failed to load configuration")?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
