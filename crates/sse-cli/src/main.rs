//! sse-cli - Command-line tool for Server-Sent Events streams
//!
//! Follows live `text/event-stream` endpoints and frames recorded streams.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sse_client::SseClient;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, ListenArgs};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "sse-cli")]
#[command(author, version, about = "Server-Sent Events CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SSE_CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a live event stream
    Listen {
        /// Stream URL
        url: String,

        /// Resume after this event id (sent as Last-Event-ID)
        #[arg(long)]
        last_id: Option<String>,

        /// Extra request header, e.g. "Authorization: Bearer token"
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Reconnect when the stream ends or breaks
        #[arg(long)]
        reconnect: bool,

        /// Give up after this many consecutive failed connections
        #[arg(long)]
        max_retries: Option<u32>,

        /// Emit a trailing event that was not terminated by a blank line
        #[arg(long)]
        flush_on_close: bool,

        /// Stop after this many events
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Fail when no data arrives for this many seconds
        #[arg(long, value_name = "SECS")]
        read_timeout: Option<u64>,
    },

    /// Parse a recorded event stream
    Parse {
        /// File to read, or "-" for stdin
        #[arg(default_value = "-")]
        file: PathBuf,

        /// Emit a trailing event that was not terminated by a blank line
        #[arg(long)]
        flush_on_close: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file; a broken default config is reported but not fatal
    let (config, config_error) = if let Some(config_path) = &cli.config {
        (Config::load_from(config_path)?, None)
    } else {
        match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    };

    let format = cli
        .output
        .or_else(|| config.output.as_deref().and_then(OutputFormat::from_name))
        .unwrap_or_default();
    let no_color = cli.no_color || config.no_color.unwrap_or(false);
    let ctx = OutputContext::new(format, no_color, cli.quiet);
    if let Some(e) = config_error {
        ctx.warn(&format!("Ignoring config file: {:#}", e));
    }

    if let Err(e) = run(cli.command, &config, &ctx).await {
        ctx.error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, config: &Config, ctx: &OutputContext) -> Result<()> {
    match command {
        Commands::Listen {
            url,
            last_id,
            headers,
            reconnect,
            max_retries,
            flush_on_close,
            limit,
            read_timeout,
        } => {
            let merged = config.merge_with_args(&ListenArgs {
                headers,
                read_timeout,
                flush_on_close,
                reconnect,
                max_retries,
            })?;
            let client = SseClient::with_config(merged.client.clone())
                .context("Failed to create SSE client")?;
            commands::listen(&client, &url, last_id, &merged, limit, ctx).await
        }

        Commands::Parse {
            file,
            flush_on_close,
        } => {
            let mut options = config.client.framing();
            options.flush_on_close |= flush_on_close;
            commands::parse(&file, options, ctx).await
        }
    }
}
