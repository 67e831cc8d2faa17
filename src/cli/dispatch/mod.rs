use std::io::IsTerminal;
use std::time::Instant;

use crate::cli::Cli;
use crate::cli::commands::common::parse_error_format;
use crate::diagnostics::{ColorMode, ErrorFormat, FormatOptions};
use crate::driver::{GenerateOptions, Generation, Input, generate};
use crate::error::{Error, Result};

mod commands;
mod logging;
mod reporting;

pub const ERROR_FORMAT_ENV: &str = "NATBIND_ERROR_FORMAT";

/// The generation backend the CLI drives; tests substitute a recording fake.
pub trait DispatchDriver {
    fn generate(&self, inputs: &[Input], options: &GenerateOptions) -> Result<Generation>;
}

/// Runs the real load/link/emit pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineDriver;

impl DispatchDriver for PipelineDriver {
    fn generate(&self, inputs: &[Input], options: &GenerateOptions) -> Result<Generation> {
        generate(inputs, options)
    }
}

/// Execute a parsed CLI command using the provided driver. Logging and error reporting
/// are configured here so the binary entrypoint can stay thin.
pub fn run<D: DispatchDriver>(driver: &D, cli: Cli) -> Result<()> {
    let log_options = cli.log_options.resolved();
    logging::init_logging(&log_options);
    let is_terminal = std::io::stderr().is_terminal();
    let format_options = FormatOptions {
        format: cli
            .error_format
            .or_else(env_error_format)
            .unwrap_or(if is_terminal {
                ErrorFormat::Human
            } else {
                ErrorFormat::Short
            }),
        color: if std::env::var_os("NO_COLOR").is_some() {
            ColorMode::Never
        } else {
            ColorMode::Auto
        },
        is_terminal,
    };
    let start = Instant::now();
    logging::log_run_start(&cli.command, &log_options);
    let result = commands::dispatch_command(driver, &cli.command, format_options);
    logging::log_run_complete(&cli.command, start.elapsed(), &result);
    result
}

fn env_error_format() -> Option<ErrorFormat> {
    std::env::var(ERROR_FORMAT_ENV)
        .ok()
        .and_then(|value| parse_error_format(&value).ok())
}

pub fn report_error(err: &Error) {
    reporting::report_error(err);
}
