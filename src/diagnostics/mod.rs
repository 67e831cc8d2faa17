//! Generation error model shared by the pipeline stages, the driver report and the CLI.

mod formatter;

pub use formatter::{ColorMode, ErrorFormat, FormatOptions, JSON_SCHEMA_VERSION, format_errors};

use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

/// Failure categories a generation run can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MalformedDescriptor,
    DuplicateName,
    UnknownType,
    UnresolvedReference,
    InvalidArraySizeBinding,
    UnmappableType,
    InvalidLayout,
    /// The emitted unit could not be written to the output directory.
    WriteFailed,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MalformedDescriptor => "MalformedDescriptor",
            ErrorKind::DuplicateName => "DuplicateName",
            ErrorKind::UnknownType => "UnknownType",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::InvalidArraySizeBinding => "InvalidArraySizeBinding",
            ErrorKind::UnmappableType => "UnmappableType",
            ErrorKind::InvalidLayout => "InvalidLayout",
            ErrorKind::WriteFailed => "WriteFailed",
        }
    }

    /// Stable short code used by the `short` and `json` formats.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MalformedDescriptor => "NB0001",
            ErrorKind::DuplicateName => "NB0002",
            ErrorKind::UnknownType => "NB0003",
            ErrorKind::UnresolvedReference => "NB0004",
            ErrorKind::InvalidArraySizeBinding => "NB0005",
            ErrorKind::UnmappableType => "NB0006",
            ErrorKind::InvalidLayout => "NB0007",
            ErrorKind::WriteFailed => "NB0008",
        }
    }

    /// `DuplicateName` is detected against the shared registry; every other kind is local to
    /// one interface.
    #[must_use]
    pub fn is_global(self) -> bool {
        matches!(self, ErrorKind::DuplicateName)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared entity an error is attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Interface,
    Type { name: String },
    Member { ty: String, member: String },
    Constant { name: String },
    EnumEntry { name: String },
    Function { name: String },
    Parameter { function: String, parameter: String },
}

impl Entity {
    #[must_use]
    pub fn ty(name: impl Into<String>) -> Self {
        Self::Type { name: name.into() }
    }

    #[must_use]
    pub fn member(ty: impl Into<String>, member: impl Into<String>) -> Self {
        Self::Member {
            ty: ty.into(),
            member: member.into(),
        }
    }

    #[must_use]
    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant { name: name.into() }
    }

    #[must_use]
    pub fn enum_entry(name: impl Into<String>) -> Self {
        Self::EnumEntry { name: name.into() }
    }

    #[must_use]
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }

    #[must_use]
    pub fn parameter(function: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::Parameter {
            function: function.into(),
            parameter: parameter.into(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Interface => f.write_str("interface"),
            Entity::Type { name } => write!(f, "type `{name}`"),
            Entity::Member { ty, member } => write!(f, "member `{ty}.{member}`"),
            Entity::Constant { name } => write!(f, "constant `{name}`"),
            Entity::EnumEntry { name } => write!(f, "enum entry `{name}`"),
            Entity::Function { name } => write!(f, "function `{name}`"),
            Entity::Parameter {
                function,
                parameter,
            } => write!(f, "parameter `{parameter}` of `{function}`"),
        }
    }
}

/// One failure, attributed to an interface and the entity at fault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationError {
    pub kind: ErrorKind,
    /// Interface name, or the source label when the name is not known yet.
    pub interface: String,
    pub entity: Entity,
    pub message: String,
}

impl GenerationError {
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        interface: impl Into<String>,
        entity: Entity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            interface: interface.into(),
            entity,
            message: message.into(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}: {}",
            self.kind, self.interface, self.entity, self.message
        )
    }
}

impl StdError for GenerationError {}

/// Errors collected by one stage for one interface. Never empty when returned as `Err`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorSet {
    errors: Vec<GenerationError>,
}

impl ErrorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: GenerationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ErrorSet) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationError> {
        self.errors.iter()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(|error| error.kind).collect()
    }

    #[must_use]
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|error| error.kind == kind)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<GenerationError> {
        self.errors
    }

    /// `Ok(value)` when nothing was collected.
    ///
    /// # Errors
    /// Returns the set itself when it holds at least one error.
    pub fn finish<T>(self, value: T) -> Result<T, ErrorSet> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<GenerationError> for ErrorSet {
    fn from(error: GenerationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl StdError for ErrorSet {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_interface_and_entity() {
        let error = GenerationError::new(
            ErrorKind::UnresolvedReference,
            "Sample",
            Entity::constant("B"),
            "`Missing` is not declared",
        );
        assert_eq!(
            error.to_string(),
            "UnresolvedReference: Sample: constant `B`: `Missing` is not declared"
        );
    }

    #[test]
    fn error_set_finish_reports_collected_errors() {
        let mut set = ErrorSet::new();
        assert_eq!(set.clone().finish(7), Ok(7));
        set.push(GenerationError::new(
            ErrorKind::UnknownType,
            "Iface",
            Entity::parameter("Run", "pFoo"),
            "unknown",
        ));
        let err = set.finish(()).unwrap_err();
        assert_eq!(err.kinds(), vec![ErrorKind::UnknownType]);
        assert!(err.contains(ErrorKind::UnknownType));
        assert!(!err.contains(ErrorKind::DuplicateName));
    }

    #[test]
    fn only_duplicate_names_are_global() {
        assert!(ErrorKind::DuplicateName.is_global());
        assert!(!ErrorKind::UnmappableType.is_global());
        assert_eq!(ErrorKind::InvalidLayout.code(), "NB0007");
        assert_eq!(ErrorKind::WriteFailed.code(), "NB0008");
        assert!(!ErrorKind::WriteFailed.is_global());
    }
}
