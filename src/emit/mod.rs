//! Serialisation of linked interfaces into target-language source units.

mod c;
mod doc;
mod rust;


use serde::Serialize;

use crate::descriptor::{IntLiteral, InterfaceDescriptor, TypeDeclKind};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};
use crate::link::{LinkedInterface, ResolvedValue};
use crate::types::{PointerWidth, Scalar, TargetType};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    #[default]
    Rust,
    C,
}

impl TargetLanguage {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "rust" | "rs" => Some(Self::Rust),
            "c" | "h" => Some(Self::C),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TargetLanguage::Rust => "rust",
            TargetLanguage::C => "c",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub language: TargetLanguage,
}

/// One generated source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedUnit {
    pub interface: String,
    pub language: TargetLanguage,
    pub file_name: String,
    pub text: String,
    /// `blake3` hex digest of everything below the banner.
    pub fingerprint: String,
}

/// Render `linked` for the selected target.
///
/// Emission is all-or-nothing: nothing is produced when any referenced type cannot be
/// represented.
///
/// # Errors
/// Returns one `UnmappableType` error per entity that cannot be emitted.
pub fn emit(linked: &LinkedInterface<'_>, options: &EmitOptions) -> Result<EmittedUnit, ErrorSet> {
    check_mappable(linked, options.language)?;
    let body = match options.language {
        TargetLanguage::Rust => rust::render(linked),
        TargetLanguage::C => c::render(linked),
    };
    let fingerprint = blake3::hash(body.as_bytes()).to_hex().to_string();
    let banner = banner(linked.descriptor, options.language, &fingerprint);
    tracing::debug!(
        target: "pipeline",
        stage = "emit",
        interface = %linked.descriptor.name,
        language = options.language.as_str(),
        bytes = banner.len() + body.len()
    );
    Ok(EmittedUnit {
        interface: linked.descriptor.name.clone(),
        language: options.language,
        file_name: file_name(linked.descriptor, options.language),
        text: format!("{banner}{body}"),
        fingerprint,
    })
}

fn banner(descriptor: &InterfaceDescriptor, language: TargetLanguage, fingerprint: &str) -> String {
    let version = env!("CARGO_PKG_VERSION");
    match language {
        TargetLanguage::Rust => format!(
            "// Generated by natbind {version} from `{}`. Do not edit.\n// fingerprint: blake3:{fingerprint}\n\n",
            descriptor.name
        ),
        TargetLanguage::C => format!(
            "/* Generated by natbind {version} from `{}`. Do not edit. */\n/* fingerprint: blake3:{fingerprint} */\n\n",
            descriptor.name
        ),
    }
}

#[must_use]
pub fn file_name(descriptor: &InterfaceDescriptor, language: TargetLanguage) -> String {
    match language {
        TargetLanguage::Rust => format!("{}.rs", snake_case(descriptor.unit_name())),
        TargetLanguage::C => format!("{}.h", descriptor.unit_name()),
    }
}

/// `VRCompositor` -> `vr_compositor`, `NV_viewport_array2` -> `nv_viewport_array2`.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in chars.iter().copied().enumerate() {
        if ch == '-' || ch == '.' || ch == ' ' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if ch.is_ascii_uppercase() && index > 0 {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

/// Whether `literal` is representable in `scalar`.
///
/// Hex literals are bit patterns, so `0x80000000` fits a signed 32-bit type.
pub(crate) fn fits(literal: IntLiteral, scalar: Scalar, width: PointerWidth) -> bool {
    let value = literal.wide();
    let within = |scalar: Scalar| {
        scalar
            .range(width)
            .is_some_and(|(low, high)| (low..=high).contains(&value))
    };
    within(scalar) || (literal.hex_digits.is_some() && scalar.is_signed() && within(scalar.unsigned()))
}

/// Type given to integer constants declared without one.
pub(crate) fn infer_scalar(literal: IntLiteral) -> Scalar {
    let value = literal.wide();
    if i32::try_from(value).is_ok() {
        Scalar::I32
    } else if u32::try_from(value).is_ok() {
        Scalar::U32
    } else if i64::try_from(value).is_ok() {
        Scalar::I64
    } else {
        Scalar::U64
    }
}

fn check_mappable(linked: &LinkedInterface<'_>, language: TargetLanguage) -> Result<(), ErrorSet> {
    let interface = linked.descriptor.name.as_str();
    let width = linked.pointer_width;
    let mut errors = ErrorSet::new();
    let mut fail = |entity: Entity, message: String| {
        errors.push(GenerationError::new(
            ErrorKind::UnmappableType,
            interface,
            entity,
            message,
        ));
    };
    let unmappable = |ty: &TargetType| {
        ty.unmappable()
            .map(|(native, reason)| format!("`{native}` cannot be represented: {reason}"))
    };

    for ty in &linked.types {
        if let TypeDeclKind::Enum { values } = &ty.decl.kind {
            for value in values.iter().filter(|value| !fits(value.value, Scalar::I32, width)) {
                fail(
                    Entity::ty(ty.decl.name.clone()),
                    format!("value {} of `{}` does not fit a 32-bit enum", value.value, value.name),
                );
            }
        }
        for member in &ty.members {
            let entity = || Entity::member(ty.decl.name.clone(), member.member.name.clone());
            if let Some(message) = unmappable(&member.ty) {
                fail(entity(), message);
            } else if member.ty.is_void() {
                fail(entity(), "`void` cannot be stored by value".into());
            }
        }
    }

    for constant in &linked.constants {
        let entity = || Entity::constant(constant.constant.name.clone());
        if let Some(message) = constant.ty.as_ref().and_then(unmappable) {
            fail(entity(), message);
            continue;
        }
        match (&constant.value, constant.ty.as_ref()) {
            (ResolvedValue::Int(literal), declared) => {
                let scalar = match declared {
                    Some(ty) => match ty.integer_scalar() {
                        Some(scalar) => scalar,
                        None => {
                            fail(entity(), format!("integer constant cannot have type `{ty}`"));
                            continue;
                        }
                    },
                    None => infer_scalar(*literal),
                };
                if !fits(*literal, scalar, width) {
                    fail(
                        entity(),
                        format!("value {literal} does not fit `{}`", scalar.c_name()),
                    );
                }
            }
            (ResolvedValue::Str(_), Some(ty)) if !is_c_string(ty) => {
                fail(entity(), format!("string constant cannot have type `{ty}`"));
            }
            (ResolvedValue::Expr(_), None) if language == TargetLanguage::Rust => {
                fail(
                    entity(),
                    "expression constants need a declared `type` for the Rust target".into(),
                );
            }
            _ => {}
        }
    }

    for entry in &linked.enum_entries {
        if !fits(entry.value, Scalar::I32, width) {
            fail(
                Entity::enum_entry(entry.entry.name.clone()),
                format!("value {} does not fit the 32-bit enum `{}`", entry.value, entry.entry.extends),
            );
        }
    }

    for function in &linked.functions {
        if let Some(message) = unmappable(&function.returns) {
            fail(Entity::function(function.function.name.clone()), message);
        }
        for param in &function.params {
            let entity = || Entity::parameter(function.function.name.clone(), param.param.name.clone());
            if let Some(message) = unmappable(&param.ty) {
                fail(entity(), message);
            } else if param.ty.is_void() {
                fail(entity(), "`void` cannot be passed by value".into());
            }
        }
    }

    errors.finish(())
}

fn is_c_string(ty: &TargetType) -> bool {
    matches!(ty.pointee(), Some(TargetType::Scalar(Scalar::Char)))
}

/// Rust spelling of an integer literal of type `scalar`.
pub(crate) fn rust_int(literal: IntLiteral, scalar: Scalar, width: PointerWidth) -> String {
    let in_range = scalar
        .range(width)
        .is_some_and(|(low, high)| (low..=high).contains(&literal.wide()));
    if in_range {
        literal.to_string()
    } else {
        let unsigned = scalar.unsigned();
        format!("{literal}_{} as {}", unsigned.rust_name(), scalar.rust_name())
    }
}
