use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Progress of a generation run, or of one interface inside it.
///
/// `Loading -> Linking -> Emitting -> Done`, with `Failed` reachable from every
/// non-terminal stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loading,
    Linking,
    Emitting,
    Done,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Loading => "loading",
            Stage::Linking => "linking",
            Stage::Emitting => "emitting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// The stage that follows on success.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Loading => Some(Stage::Linking),
            Stage::Linking => Some(Stage::Emitting),
            Stage::Emitting => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    #[must_use]
    pub fn can_transition(self, to: Stage) -> bool {
        !self.is_terminal() && (to == Stage::Failed || self.next() == Some(to))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage plus the guard against skipped or backward transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTracker {
    stage: Stage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            stage: Stage::Loading,
        }
    }
}

impl StageTracker {
    #[must_use]
    pub fn stage(self) -> Stage {
        self.stage
    }

    /// # Errors
    /// Returns an internal error for a transition the state machine does not allow.
    pub fn advance(&mut self, to: Stage) -> Result<()> {
        if !self.stage.can_transition(to) {
            return Err(Error::internal(format!(
                "invalid stage transition {} -> {to}",
                self.stage
            )));
        }
        self.stage = to;
        Ok(())
    }

    /// Move to `Failed`; a no-op once terminal.
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
        }
    }
}
