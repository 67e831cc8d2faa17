use std::path::PathBuf;

use crate::diagnostics::ErrorFormat;
use crate::emit::TargetLanguage;
use crate::logging::{LogFormat, LogLevel, LogSettings};
use crate::types::PointerWidth;

use super::super::{CliError, GenerateArgs};

pub(crate) fn is_help_flag(value: &str) -> bool {
    matches!(value, "-h" | "--help")
}

/// Everything `generate` and `check` accept, before the command decides what it allows.
#[derive(Debug, Default)]
pub(crate) struct ParsedGenerate {
    pub args: GenerateArgs,
    pub log_settings: LogSettings,
    pub error_format: Option<ErrorFormat>,
    pub help: bool,
}

/// Parse positional inputs and flags in any order. `--` ends flag parsing.
pub(crate) fn parse_generate_flags(args: Vec<String>) -> Result<ParsedGenerate, CliError> {
    let mut parsed = ParsedGenerate::default();
    let mut iter = args.into_iter();
    let mut positional_only = false;

    while let Some(arg) = iter.next() {
        if positional_only || !arg.starts_with('-') || arg == "-" {
            if arg.trim().is_empty() {
                return Err(CliError::with_usage("input path must not be empty"));
            }
            parsed.args.inputs.push(PathBuf::from(arg));
            continue;
        }
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg, None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| iter.next())
                .ok_or_else(|| CliError::with_usage(format!("expected value after {name}")))
        };
        match flag.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--" => positional_only = true,
            "-m" | "--manifest" => parsed.args.manifest = Some(PathBuf::from(value(&flag)?)),
            "--no-manifest" => parsed.args.no_manifest = true,
            "-o" | "--output" => parsed.args.output = Some(PathBuf::from(value(&flag)?)),
            "--report" => parsed.args.report = Some(PathBuf::from(value(&flag)?)),
            "-l" | "--lang" | "--language" => {
                let raw = value(&flag)?;
                let language = TargetLanguage::parse(&raw).ok_or_else(|| {
                    CliError::with_usage(format!(
                        "invalid language '{raw}'; supported values: rust, c"
                    ))
                })?;
                parsed.args.language = Some(language);
            }
            "-j" | "--jobs" => {
                let raw = value(&flag)?;
                parsed.args.jobs = Some(parse_jobs(&raw)?);
            }
            "--pointer-width" => {
                let raw = value(&flag)?;
                let width = raw
                    .parse::<u32>()
                    .ok()
                    .and_then(PointerWidth::from_bits)
                    .ok_or_else(|| {
                        CliError::with_usage(format!(
                            "invalid pointer width '{raw}'; supported values: 32, 64"
                        ))
                    })?;
                parsed.args.pointer_width = Some(width);
            }
            "--library" => {
                let raw = value(&flag)?;
                if raw.trim().is_empty() {
                    return Err(CliError::with_usage("--library must not be empty"));
                }
                parsed.args.library = Some(raw);
            }
            "--error-format" => {
                let raw = value(&flag)?;
                parsed.error_format = Some(parse_error_format(&raw)?);
            }
            "--log-format" => {
                let raw = value(&flag)?;
                let Some(format) = LogFormat::parse(&raw) else {
                    return Err(CliError::with_usage(format!(
                        "invalid log format '{raw}'; supported values: auto, text, json"
                    )));
                };
                parsed.log_settings.format = Some(format);
            }
            "--log-level" => {
                let raw = value(&flag)?;
                let Some(level) = LogLevel::parse(&raw) else {
                    return Err(CliError::with_usage(format!(
                        "invalid log level '{raw}'; supported values: error, warn, info, debug, trace"
                    )));
                };
                parsed.log_settings.level = Some(level);
            }
            other => {
                return Err(CliError::with_usage(format!(
                    "unsupported option '{other}' for command"
                )));
            }
        }
    }
    Ok(parsed)
}

fn parse_jobs(raw: &str) -> Result<usize, CliError> {
    match raw.parse::<usize>() {
        Ok(jobs) if jobs > 0 => Ok(jobs),
        _ => Err(CliError::with_usage(format!(
            "invalid job count '{raw}'; expected a positive integer"
        ))),
    }
}

pub(crate) fn parse_error_format(raw: &str) -> Result<ErrorFormat, CliError> {
    ErrorFormat::parse(raw).ok_or_else(|| {
        CliError::with_usage(format!(
            "invalid error format '{raw}'; supported values: human, short, json"
        ))
    })
}
