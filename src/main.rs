use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jobstream::config::Config;
use jobstream::domain::ReportStyle;

mod cli;

#[derive(Parser)]
#[command(name = "jobstream")]
#[command(about = "Stream report-worker jobs over HTTP and keep their transcripts")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.jobstream/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP bridge server (POST /analyze)
    Serve {
        /// Port to listen on (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,

        /// Worker websocket URL (overrides [worker] url)
        #[arg(long)]
        worker: Option<String>,
    },

    /// Run one job directly against the worker and print the report
    Run {
        /// Instruction text (defaults to the configured prompt)
        #[arg(short, long)]
        task: Option<String>,

        /// Uploaded file as `path=url` (repeatable)
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Newsletter style, mapped to a report type
        #[arg(long, value_enum, conflicts_with = "report_type")]
        style: Option<ReportStyle>,

        /// Worker report type
        #[arg(long)]
        report_type: Option<String>,

        /// Source filter (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Newsletter cadence
        #[arg(long)]
        cadence: Option<String>,

        /// Edit notes from a previous run
        #[arg(long)]
        edits: Option<String>,

        /// Worker websocket URL (overrides [worker] url)
        #[arg(long)]
        worker: Option<String>,
    },

    /// Submit a job to a running bridge server and follow its stream
    Watch {
        /// Endpoint URL (defaults to the local server's /analyze)
        #[arg(long)]
        url: Option<String>,

        /// Instruction text
        #[arg(short, long)]
        task: Option<String>,

        /// Uploaded file as `path=url` (repeatable)
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Worker report type
        #[arg(long)]
        report_type: Option<String>,

        /// Source filter (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Auth token (overrides [server] auth_token)
        #[arg(long)]
        token: Option<String>,
    },

    /// List recently saved transcripts
    History {
        /// Number of transcripts to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Initialize a ~/.jobstream/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config;

    match cli.command {
        Some(Commands::Serve { port, worker }) => {
            let config = Config::load(config_path.as_deref())?;
            cli::serve::serve_command(config, port, worker).await?;
        }
        Some(Commands::Run {
            task,
            files,
            style,
            report_type,
            sources,
            cadence,
            edits,
            worker,
        }) => {
            let config = Config::load(config_path.as_deref())?;
            let args = cli::run::RunArgs {
                task,
                files,
                style,
                report_type,
                sources,
                cadence,
                edits,
                worker,
            };
            cli::run::run_command(&config, args).await?;
        }
        Some(Commands::Watch {
            url,
            task,
            files,
            report_type,
            sources,
            token,
        }) => {
            let config = Config::load(config_path.as_deref())?;
            let args = cli::watch::WatchArgs {
                url,
                task,
                files,
                report_type,
                sources,
                token,
            };
            cli::watch::watch_command(&config, args).await?;
        }
        Some(Commands::History { limit }) => {
            let config = Config::load(config_path.as_deref())?;
            cli::history::history_command(&config, limit).await?;
        }
        Some(Commands::Init { force }) => {
            cli::init::init_command(config_path, force).await?;
        }
        None => {
            // Default: run the bridge server
            let config = Config::load(config_path.as_deref())?;
            cli::serve::serve_command(config, None, None).await?;
        }
    }

    Ok(())
}
