use serde::Serialize;

use super::{Entity, GenerationError};

pub const JSON_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorFormat {
    Human,
    Json,
    Short,
}

impl ErrorFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "human" | "text" => Some(Self::Human),
            "json" => Some(Self::Json),
            "short" => Some(Self::Short),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: ErrorFormat,
    pub color: ColorMode,
    pub is_terminal: bool,
}

impl FormatOptions {
    #[must_use]
    pub fn plain(format: ErrorFormat) -> Self {
        Self {
            format,
            color: ColorMode::Never,
            is_terminal: false,
        }
    }

    #[must_use]
    pub fn use_color(self) -> bool {
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => self.is_terminal,
        }
    }
}

/// Render a collection of generation errors to a single string.
#[must_use]
pub fn format_errors(errors: &[GenerationError], options: FormatOptions) -> String {
    let mut rendered = String::new();
    let use_color = options.use_color();
    for (index, error) in errors.iter().enumerate() {
        if index > 0 {
            rendered.push('\n');
        }
        let chunk = match options.format {
            ErrorFormat::Human => render_human(error, use_color),
            ErrorFormat::Short => render_short(error),
            ErrorFormat::Json => render_json(error),
        };
        rendered.push_str(&chunk);
    }
    rendered
}

fn render_human(error: &GenerationError, color: bool) -> String {
    let header = format!("error[{}]", error.kind.code());
    let header = if color {
        colorize(&header, "1;31")
    } else {
        header
    };
    let mut out = format!("{header}: {}\n", error.kind);
    out.push_str(&format!("  --> {}", error.interface));
    if error.entity != Entity::Interface {
        out.push_str(&format!(", {}", error.entity));
    }
    out.push_str(&format!("\n   = {}", error.message));
    out
}

fn render_short(error: &GenerationError) -> String {
    format!(
        "{}: error[{}]: {}: {}",
        error.interface,
        error.kind.code(),
        error.entity,
        error.message
    )
}

fn render_json(error: &GenerationError) -> String {
    let payload = JsonError {
        version: JSON_SCHEMA_VERSION,
        code: error.kind.code(),
        error,
    };
    serde_json::to_string(&payload).unwrap_or_else(|err| {
        format!("{{\"version\":\"{JSON_SCHEMA_VERSION}\",\"serialize_error\":\"{err}\"}}")
    })
}

fn colorize(value: &str, code: &str) -> String {
    format!("\u{1b}[{code}m{value}\u{1b}[0m")
}

#[derive(Serialize)]
struct JsonError<'a> {
    version: &'static str,
    code: &'static str,
    #[serde(flatten)]
    error: &'a GenerationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    fn sample() -> GenerationError {
        GenerationError::new(
            ErrorKind::InvalidArraySizeBinding,
            "VRCompositor",
            Entity::parameter("GetLastPoses", "unRenderPoseArrayCount"),
            "`pMissing` is not a parameter of `GetLastPoses`",
        )
    }

    #[test]
    fn human_format_lists_location_and_message() {
        let rendered = format_errors(&[sample()], FormatOptions::plain(ErrorFormat::Human));
        assert_eq!(
            rendered,
            "error[NB0005]: InvalidArraySizeBinding\n  --> VRCompositor, parameter `unRenderPoseArrayCount` of `GetLastPoses`\n   = `pMissing` is not a parameter of `GetLastPoses`"
        );
    }

    #[test]
    fn short_format_is_single_line() {
        let rendered = format_errors(&[sample()], FormatOptions::plain(ErrorFormat::Short));
        assert!(!rendered.contains('\n'));
        assert!(rendered.starts_with("VRCompositor: error[NB0005]"));
    }

    #[test]
    fn json_format_carries_schema_version_and_entity() {
        let rendered = format_errors(&[sample()], FormatOptions::plain(ErrorFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["version"], JSON_SCHEMA_VERSION);
        assert_eq!(value["code"], "NB0005");
        assert_eq!(value["kind"], "InvalidArraySizeBinding");
        assert_eq!(value["entity"]["kind"], "parameter");
        assert_eq!(value["entity"]["parameter"], "unRenderPoseArrayCount");
    }

    #[test]
    fn error_format_parse_accepts_aliases() {
        assert_eq!(ErrorFormat::parse("TEXT"), Some(ErrorFormat::Human));
        assert_eq!(ErrorFormat::parse("json"), Some(ErrorFormat::Json));
        assert_eq!(ErrorFormat::parse("toon"), None);
    }
}
