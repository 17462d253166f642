// src/main.rs

//! `ha-ingest` entry-point.
//!
//! 1. Parse CLI flags and load the TOML configuration
//! 2. Set up logging (log file, plus stdout with `--verbose`)
//! 3. Run one ingestion batch: fetch → stage → merge → report
//! 4. Exit 0 on success, 1 on any failure

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use fern::Dispatch;
use log::LevelFilter;

use ha_ingest::config::{self, Config, LoggingConfig, RunFlags};

/// Imports Home Assistant recorder history into a local SQLite warehouse.
#[derive(Debug, Parser)]
#[command(name = "ha-ingest", version)]
struct Cli {
    /// TRUNCATES the raw events table and reloads it from staging (drops older data)
    #[arg(short = 'f', long)]
    full_load: bool,

    /// Reuse the snapshot already in the staging folder instead of downloading
    #[arg(short = 's', long)]
    skip_download: bool,

    /// Mirror log output to stdout
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Config file in TOML format
    #[arg(long, default_value = "./config.toml")]
    config_file: PathBuf,
}

impl Cli {
    fn flags(&self) -> RunFlags {
        RunFlags {
            full_load: self.full_load,
            skip_download: self.skip_download,
            verbose: self.verbose,
        }
    }
}

/// Print an error with context before logging exists.
macro_rules! early_fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        return ExitCode::FAILURE;
    }};
}

/// Configure global logging as requested in `[logging]`.
fn setup_logging(logging: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let level = match logging.level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                std::process::id(),
                msg
            ))
        })
        .level(level)
        .chain(
            fern::log_file(&logging.file)
                .with_context(|| format!("cannot open log file {}", logging.file.display()))?,
        );

    if verbose {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch.apply().context("logger already installed")?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = config::load(&cli.config_file)?;
    cfg.run = cfg.run.merge(cli.flags());
    Ok(cfg)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1 ─ Configuration (nothing touches the network or the warehouse before this)
    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => early_fatal!("config", "{} ({})", e, cli.config_file.display()),
    };

    // 2 ─ Logging
    if let Err(e) = setup_logging(&cfg.logging, cfg.run.verbose) {
        early_fatal!("logging", "{:#}", e);
    }

    // 3 ─ Run
    match ha_ingest::run(&cfg) {
        Ok(report) => {
            report.log();
            log::info!("Ingestion finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("[{}] {}", e.stage(), e);
            if !cfg.run.verbose {
                eprintln!("ingestion failed in stage '{}': {}", e.stage(), e);
            }
            ExitCode::FAILURE
        }
    }
}
