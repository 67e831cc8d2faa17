use std::path::PathBuf;

use serde::Serialize;

use super::stage::Stage;
use crate::diagnostics::GenerationError;
use crate::emit::TargetLanguage;
use crate::error::Error;

/// What happened to one generated file on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    /// Identical content was already present; the file was left untouched.
    Unchanged,
    /// Check mode: nothing is written.
    Skipped,
}

#[derive(Clone, Debug, Serialize)]
pub struct InterfaceReport {
    /// Source label (usually the descriptor path).
    pub source: String,
    /// Interface name, once the descriptor parsed far enough to know it.
    pub name: Option<String>,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GenerationError>,
}

impl InterfaceReport {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.stage == Stage::Done
    }
}

/// Outcome of one generation run, in input order.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub stage: Stage,
    pub language: TargetLanguage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub interfaces: Vec<InterfaceReport>,
}

impl RunReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.interfaces.len()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.interfaces
            .iter()
            .filter(|interface| !interface.succeeded())
            .count()
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Every error of every interface, in input order.
    pub fn errors(&self) -> impl Iterator<Item = &GenerationError> {
        self.interfaces
            .iter()
            .flat_map(|interface| interface.errors.iter())
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.interfaces
            .iter()
            .filter(|interface| interface.write == Some(WriteOutcome::Written))
            .count()
    }

    /// `Error::Generation` when any interface failed.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        if self.succeeded() {
            None
        } else {
            Some(Error::Generation {
                failed: self.failed(),
                total: self.total(),
            })
        }
    }

    /// One-line summary used by the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.total();
        let failed = self.failed();
        let mut line = format!(
            "{} interface(s): {} generated, {failed} failed",
            total,
            total - failed
        );
        let unchanged = self
            .interfaces
            .iter()
            .filter(|interface| interface.write == Some(WriteOutcome::Unchanged))
            .count();
        if self.output.is_some() {
            line.push_str(&format!(
                ", {} written, {unchanged} unchanged",
                self.written()
            ));
        }
        line
    }
}
