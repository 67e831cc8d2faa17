//! CLI front-end: command parsing, registry, and dispatch helpers used by the `natbind` binary.

mod commands;
mod help;

pub mod dispatch;

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use crate::diagnostics::ErrorFormat;
use crate::emit::TargetLanguage;
use crate::logging::LogOptions;
use crate::types::PointerWidth;
use commands::common::is_help_flag;

pub(crate) type CommandParser = fn(Vec<String>) -> Result<Cli, CliError>;

#[derive(Clone, Copy)]
pub(crate) struct CommandDescriptor {
    name: &'static str,
    aliases: &'static [&'static str],
    parser: CommandParser,
}

impl CommandDescriptor {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    pub(crate) fn parse(&self, args: Vec<String>) -> Result<Cli, CliError> {
        (self.parser)(args)
    }

    fn matches(&self, name: &str) -> bool {
        self.name() == name || self.aliases().contains(&name)
    }
}

pub(crate) struct CommandRegistry {
    entries: &'static [CommandDescriptor],
}

impl CommandRegistry {
    pub(crate) fn new(entries: &'static [CommandDescriptor]) -> Self {
        Self { entries }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&'static CommandDescriptor> {
        self.entries.iter().find(|descriptor| descriptor.matches(name))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &'static CommandDescriptor> {
        self.entries.iter()
    }
}

pub(crate) fn registry() -> CommandRegistry {
    CommandRegistry::new(commands::descriptors())
}

/// Flags shared by `generate` and `check`. Unset values fall back to the manifest, then to
/// the generator defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateArgs {
    pub inputs: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    /// Skip manifest discovery entirely.
    pub no_manifest: bool,
    pub output: Option<PathBuf>,
    pub language: Option<TargetLanguage>,
    pub jobs: Option<usize>,
    pub pointer_width: Option<PointerWidth>,
    pub library: Option<String>,
    /// Write the JSON run report here.
    pub report: Option<PathBuf>,
}

/// Top-level commands supported by the `natbind` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate(GenerateArgs),
    /// Run every stage without writing units.
    Check(GenerateArgs),
    Help {
        topic: Option<String>,
    },
    Version,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Generate(_) => "generate",
            Command::Check(_) => "check",
            Command::Help { .. } => "help",
            Command::Version => "version",
        }
    }
}

/// Parsed CLI invocation.
#[derive(Debug, Clone)]
pub struct Cli {
    pub command: Command,
    pub log_options: LogOptions,
    pub error_format: Option<ErrorFormat>,
}

impl Cli {
    fn bare(command: Command) -> Self {
        Self {
            command,
            log_options: LogOptions::from_env(),
            error_format: None,
        }
    }

    fn help(topic: Option<String>) -> Self {
        Self::bare(Command::Help { topic })
    }
}

/// Error emitted while parsing command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn with_usage(message: impl Into<String>) -> Self {
        let mut owned = message.into();
        owned.push_str("\n\n");
        owned.push_str(&Cli::usage());
        Self::new(owned)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CliError {}

impl Cli {
    /// Parse arguments from the environment.
    ///
    /// # Errors
    /// Returns a [`CliError`] when the arguments cannot be interpreted as a supported command.
    pub fn parse() -> Result<Self, CliError> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse arguments from an iterator (useful for testing).
    ///
    /// # Errors
    /// Returns a [`CliError`] when the provided iterator does not describe a valid invocation.
    pub fn parse_from<I, T>(args: I) -> Result<Self, CliError>
    where
        I: Iterator<Item = T>,
        T: Into<String>,
    {
        let mut iter = args.map(Into::<String>::into);
        let Some(raw_command) = iter.next() else {
            return Err(CliError::with_usage("missing command"));
        };
        let remaining: Vec<String> = iter.collect();

        match raw_command.as_str() {
            "--help" | "-h" | "help" => {
                let topic = remaining
                    .first()
                    .filter(|value| !is_help_flag(value))
                    .map(|value| value.to_ascii_lowercase());
                return Ok(Cli::help(topic));
            }
            "--version" | "-V" | "version" => {
                if remaining.iter().any(|value| is_help_flag(value)) {
                    return Ok(Cli::help(Some("version".into())));
                }
                if let Some(extra) = remaining.first() {
                    return Err(CliError::with_usage(format!(
                        "natbind version does not accept '{extra}'"
                    )));
                }
                return Ok(Cli::bare(Command::Version));
            }
            _ => {}
        }

        if let Some(descriptor) = registry().resolve(&raw_command) {
            return descriptor.parse(remaining);
        }
        let known: Vec<&str> = registry().iter().map(CommandDescriptor::name).collect();
        Err(CliError::with_usage(format!(
            "unknown command '{raw_command}'; available commands: {}, help, version",
            known.join(", ")
        )))
    }

    /// Return formatted general help text.
    #[must_use]
    pub fn usage() -> String {
        help::render_general_help()
    }

    /// Return help text for a specific command.
    ///
    /// # Errors
    /// Returns a [`CliError`] when the requested topic is unknown.
    pub fn help_for(topic: &str) -> Result<String, CliError> {
        help::render_command_help(topic)
            .ok_or_else(|| CliError::with_usage(help::format_unknown_topic(topic)))
    }
}

#[cfg(test)]
mod tests;
