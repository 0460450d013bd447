//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads provider configuration
//! - runs the lookup pipeline
//! - prints the report (text or JSON)

use std::time::Duration;

use clap::Parser;

use crate::cli::{Command, LatestArgs, LookupArgs};
use crate::data::CancelToken;
use crate::domain::{LookupRequest, PipelineResult, ProviderConfig, US_STATES, clamp_history_limit};
use crate::error::AppError;

pub mod pipeline;

use pipeline::{LookupMode, Pipeline};

/// Entry point for the `altos` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Lookup(args) => handle_lookup(args),
        Command::Latest(args) => handle_latest(args),
        Command::States => {
            println!("{}", US_STATES.join(" "));
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

fn handle_lookup(args: LookupArgs) -> Result<(), AppError> {
    let config =
        config_from_args(ProviderConfig::from_env()?, args.history_limit, args.timeout_secs);
    let pipeline = Pipeline::from_config(&config)?;
    let request = args.address.to_request();

    let result = pipeline.run_with_cancel(&request, LookupMode::Full, &CancelToken::new());

    let mode = if args.json { OutputMode::Json } else { OutputMode::Text };
    print_result(&result, mode)?;

    if mode == OutputMode::Text && !args.no_plot {
        if let Some(history) = result.history.as_ref().filter(|h| !h.is_empty()) {
            println!(
                "{}",
                crate::plot::render_history_plot(history, &request.stat, args.width, args.height)
            );
        }
    }

    exit_status(&result)
}

fn handle_latest(args: LatestArgs) -> Result<(), AppError> {
    let config = config_from_args(ProviderConfig::from_env()?, None, args.timeout_secs);
    let pipeline = Pipeline::from_config(&config)?;
    let request: LookupRequest = args.address.to_request();

    let result =
        pipeline.run_with_cancel(&request, LookupMode::LatestOnly, &CancelToken::new());

    let mode = if args.json { OutputMode::Json } else { OutputMode::Text };
    print_result(&result, mode)?;
    exit_status(&result)
}

/// Apply CLI overrides on top of the environment configuration.
pub fn config_from_args(
    mut config: ProviderConfig,
    history_limit: Option<u32>,
    timeout_secs: Option<u64>,
) -> ProviderConfig {
    if let Some(limit) = history_limit {
        config.history_limit = clamp_history_limit(limit);
    }
    if let Some(secs) = timeout_secs {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    config
}

fn print_result(result: &PipelineResult, mode: OutputMode) -> Result<(), AppError> {
    match mode {
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(result)
                .map_err(|e| AppError::new(4, format!("Failed to serialize result: {e}")))?;
            println!("{json}");
        }
        OutputMode::Text => {
            println!("{}", crate::report::format_result_summary(result));
            if let Some(history) = &result.history {
                println!("{}", crate::report::format_history_table(history, &result.request.stat));
            }
        }
    }
    Ok(())
}

/// A rejected address is the only outcome that fails the process.
fn exit_status(result: &PipelineResult) -> Result<(), AppError> {
    match (&result.address, &result.error) {
        (None, Some(err)) => Err(AppError::new(3, err.clone())),
        _ => Ok(()),
    }
}
