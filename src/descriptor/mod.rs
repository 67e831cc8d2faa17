//! In-memory model of one native interface surface and the loader that builds it.

mod loader;
mod modifiers;
mod source;
mod type_token;

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

pub use loader::{DescriptorSource, LoadOptions, load_interface};
pub use modifiers::ParamModifiers;
pub use type_token::{TypeToken, TypeTokenError};

/// One native API surface: a Vulkan extension, an EGL extension, an OpenVR interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    /// Target module/class name; defaults to `name`.
    pub class_name: Option<String>,
    pub library: Option<String>,
    pub prefix: NativePrefix,
    pub convention: CallingConvention,
    pub binding: BindingMode,
    /// Registry extension number used to compute enum offsets.
    pub number: Option<u32>,
    pub documentation: String,
    pub types: Vec<TypeDecl>,
    pub constants: Vec<Constant>,
    pub enum_extensions: Vec<EnumExtension>,
    pub functions: Vec<Function>,
    /// Where the descriptor was read from, for reporting.
    pub origin: Option<PathBuf>,
}

impl InterfaceDescriptor {
    /// Create an empty descriptor; used by tests and programmatic callers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: None,
            library: None,
            prefix: NativePrefix::default(),
            convention: CallingConvention::default(),
            binding: BindingMode::default(),
            number: None,
            documentation: String::new(),
            types: Vec::new(),
            constants: Vec::new(),
            enum_extensions: Vec::new(),
            functions: Vec::new(),
            origin: None,
        }
    }

    /// Name used for the generated unit.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        self.class_name.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|constant| constant.name == name)
    }

    /// Native spelling of a constant (`VK_` + `NAME`).
    #[must_use]
    pub fn native_constant_name(&self, name: &str) -> String {
        format!("{}{name}", self.prefix.constant)
    }

    /// Native symbol of a function (`vk` + `Name`).
    #[must_use]
    pub fn native_function_name(&self, name: &str) -> String {
        format!("{}{name}", self.prefix.function)
    }
}

/// Prefixes prepended to declared names to form native spellings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativePrefix {
    pub constant: String,
    pub function: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallingConvention {
    C,
    #[default]
    System,
    Stdcall,
}

impl CallingConvention {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "c" | "cdecl" => Some(Self::C),
            "system" | "apientry" => Some(Self::System),
            "stdcall" => Some(Self::Stdcall),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallingConvention::C => "C",
            CallingConvention::System => "system",
            CallingConvention::Stdcall => "stdcall",
        }
    }
}

/// How emitted functions reach the native library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Link-time `extern` declarations.
    #[default]
    Static,
    /// Function-pointer table filled through a named-symbol lookup.
    Dynamic,
}

impl BindingMode {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "static" | "extern" => Some(Self::Static),
            "dynamic" | "table" | "lazy" => Some(Self::Dynamic),
            _ => None,
        }
    }
}

/// A user-defined type introduced by an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub doc: String,
    pub kind: TypeDeclKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDeclKind {
    Struct { members: Vec<Member> },
    Enum { values: Vec<EnumValueDecl> },
    Handle { dispatchable: bool },
    Opaque,
}

impl TypeDeclKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeDeclKind::Struct { .. } => "struct",
            TypeDeclKind::Enum { .. } => "enum",
            TypeDeclKind::Handle { .. } => "handle",
            TypeDeclKind::Opaque => "opaque",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: TypeToken,
    /// Fixed array length (`float m[3][4]` is flattened to 12).
    pub array_len: Option<usize>,
    pub doc: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValueDecl {
    pub name: String,
    pub value: IntLiteral,
    pub doc: String,
}

/// Integer literal with the radix (and hex digit count) it was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntLiteral {
    pub value: i64,
    /// Number of hex digits as written; `None` for decimal literals.
    pub hex_digits: Option<u8>,
    /// `value` holds the two's-complement bits of a hex literal above `i64::MAX`.
    pub wrapped: bool,
}

impl IntLiteral {
    #[must_use]
    pub const fn decimal(value: i64) -> Self {
        Self {
            value,
            hex_digits: None,
            wrapped: false,
        }
    }

    #[must_use]
    pub const fn hex(value: i64, digits: u8) -> Self {
        Self {
            value,
            hex_digits: Some(digits),
            wrapped: false,
        }
    }

    /// Hex literal from its bit pattern; `0xFFFFFFFFFFFFFFFF` keeps all 64 bits.
    #[must_use]
    pub fn hex_bits(bits: u64, digits: u8) -> Self {
        match i64::try_from(bits) {
            Ok(value) => Self::hex(value, digits),
            Err(_) => Self {
                value: i64::from_ne_bytes(bits.to_ne_bytes()),
                hex_digits: Some(digits),
                wrapped: true,
            },
        }
    }

    /// The value as written, without the wrap of 64-bit hex patterns.
    #[must_use]
    pub fn wide(self) -> i128 {
        if self.wrapped {
            i128::from(u64::from_ne_bytes(self.value.to_ne_bytes()))
        } else {
            i128::from(self.value)
        }
    }

    /// Parse `42`, `-7`, `0x33A0`, `0xFFFFFFFFFFFFFFFF` or `1000050000`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let literal = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex_digits) => {
                let cleaned = hex_digits.replace('_', "");
                let width = u8::try_from(cleaned.len()).ok()?;
                Self::hex_bits(u64::from_str_radix(&cleaned, 16).ok()?, width)
            }
            None => Self::decimal(digits.replace('_', "").parse::<i64>().ok()?),
        };
        if !negative {
            return Some(literal);
        }
        if literal.wrapped {
            return None;
        }
        Some(Self {
            value: literal.value.checked_neg()?,
            ..literal
        })
    }
}

impl fmt::Display for IntLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hex_digits {
            Some(width) => {
                let sign = if self.value < 0 && !self.wrapped { "-" } else { "" };
                let magnitude = if self.wrapped {
                    u64::from_ne_bytes(self.value.to_ne_bytes())
                } else {
                    self.value.unsigned_abs()
                };
                let width = usize::from(width);
                write!(f, "{sign}0x{magnitude:0width$X}")
            }
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantKind {
    Integer,
    String,
    Expression,
}

impl ConstantKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConstantKind::Integer => "integer",
            ConstantKind::String => "string",
            ConstantKind::Expression => "expression",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub doc: String,
    pub ty: Option<TypeToken>,
    /// Declared kind; references without one take the kind of their target.
    pub kind: Option<ConstantKind>,
    pub value: ConstantValue,
}

impl Constant {
    #[must_use]
    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            ty: None,
            kind: Some(ConstantKind::Integer),
            value: ConstantValue::Int(IntLiteral::decimal(value)),
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            ty: None,
            kind: Some(ConstantKind::String),
            value: ConstantValue::Str(value.into()),
        }
    }

    #[must_use]
    pub fn reference(name: impl Into<String>, target: ConstantRef) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            ty: None,
            kind: None,
            value: ConstantValue::Ref(target),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstantValue {
    Int(IntLiteral),
    Str(String),
    /// Emitted verbatim; never evaluated.
    Expr(String),
    Ref(ConstantRef),
}

/// Symbolic reference to another constant, optionally qualified by interface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstantRef {
    pub interface: Option<String>,
    pub name: String,
}

impl ConstantRef {
    /// Parse `NAME` or `Interface.NAME`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.rsplit_once('.') {
            Some((interface, name)) if !interface.is_empty() && !name.is_empty() => Self {
                interface: Some(interface.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                interface: None,
                name: trimmed.to_string(),
            },
        }
    }

    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            interface: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ConstantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.interface {
            Some(interface) => write!(f, "{interface}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Entry appended to an enum declared elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumExtension {
    pub name: String,
    pub extends: String,
    pub doc: String,
    pub value: EnumExtensionValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnumExtensionValue {
    Literal(IntLiteral),
    /// Vulkan extension enum offset; needs the interface registry number.
    Offset { offset: u32, negative: bool },
}

/// Base of the Vulkan extension enum value range.
pub const EXTENSION_ENUM_BASE: i64 = 1_000_000_000;
/// Values reserved per extension number.
pub const EXTENSION_ENUM_BLOCK: i64 = 1_000;

impl EnumExtensionValue {
    /// Compute the numeric value, given the owning interface's registry number.
    #[must_use]
    pub fn evaluate(self, number: Option<u32>) -> Option<i64> {
        match self {
            EnumExtensionValue::Literal(literal) => Some(literal.value),
            EnumExtensionValue::Offset { offset, negative } => {
                let number = i64::from(number?);
                if number == 0 {
                    return None;
                }
                let value = EXTENSION_ENUM_BASE
                    + (number - 1) * EXTENSION_ENUM_BLOCK
                    + i64::from(offset);
                Some(if negative { -value } else { value })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub returns: TypeToken,
    pub params: Vec<Parameter>,
    pub doc: String,
    pub return_doc: Option<String>,
}

impl Function {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|param| param.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeToken,
    pub modifiers: ParamModifiers,
    /// Sibling whose buffer length this parameter carries.
    pub length_of: Option<String>,
    /// Sibling carrying this parameter's buffer length.
    pub length: Option<String>,
    /// Minimum number of elements the pointer must reference.
    pub check: Option<u64>,
    /// The function's return value is the number of elements written to this buffer.
    pub returned_length: Option<ReturnedLength>,
    pub doc: String,
}

/// How a returned element count relates to the buffer it describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnedLength {
    Elements,
    /// The count includes the terminating NUL.
    IncludingNul,
}

impl Parameter {
    /// Build a parameter, deriving the const/pointer-to-pointer flags from the token.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeToken) -> Self {
        let modifiers = ParamModifiers::derived_from(&ty);
        Self {
            name: name.into(),
            ty,
            modifiers,
            length_of: None,
            length: None,
            check: None,
            returned_length: None,
            doc: String::new(),
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: ParamModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    #[must_use]
    pub fn carrying_length_of(mut self, sibling: impl Into<String>) -> Self {
        self.length_of = Some(sibling.into());
        self.modifiers |= ParamModifiers::LENGTH_CARRIER;
        self
    }

    #[must_use]
    pub fn with_length(mut self, sibling: impl Into<String>) -> Self {
        self.length = Some(sibling.into());
        self.modifiers |= ParamModifiers::ARRAY;
        self
    }

    #[must_use]
    pub fn checked(mut self, elements: u64) -> Self {
        self.check = Some(elements);
        self
    }

    #[must_use]
    pub fn returning_length(mut self, kind: ReturnedLength) -> Self {
        self.returned_length = Some(kind);
        self.modifiers |= ParamModifiers::RETURNED_LENGTH;
        self
    }
}
