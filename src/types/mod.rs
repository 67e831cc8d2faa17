//! Mapping from native type tokens to target-language representations.

pub mod builtins;


use std::fmt;

use crate::descriptor::{InterfaceDescriptor, ParamModifiers, Parameter, TypeDeclKind, TypeToken};
use crate::registry::{ExternalKind, Registry, UserType};

use builtins::Builtin;

/// Pointer width the layouts and size assertions are computed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    W32,
    #[default]
    W64,
}

impl PointerWidth {
    #[must_use]
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            _ => None,
        }
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            PointerWidth::W32 => 32,
            PointerWidth::W64 => 64,
        }
    }

    #[must_use]
    pub fn bytes(self) -> u64 {
        u64::from(self.bits() / 8)
    }
}

/// Fixed-size value types shared by every target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Isize,
    Usize,
    F32,
    F64,
}

impl Scalar {
    #[must_use]
    pub fn rust_name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::Char => "::core::ffi::c_char",
            Scalar::I8 => "i8",
            Scalar::U8 => "u8",
            Scalar::I16 => "i16",
            Scalar::U16 => "u16",
            Scalar::I32 => "i32",
            Scalar::U32 => "u32",
            Scalar::I64 => "i64",
            Scalar::U64 => "u64",
            Scalar::Isize => "isize",
            Scalar::Usize => "usize",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
        }
    }

    #[must_use]
    pub fn c_name(self) -> &'static str {
        match self {
            Scalar::Bool => "bool",
            Scalar::Char => "char",
            Scalar::I8 => "int8_t",
            Scalar::U8 => "uint8_t",
            Scalar::I16 => "int16_t",
            Scalar::U16 => "uint16_t",
            Scalar::I32 => "int32_t",
            Scalar::U32 => "uint32_t",
            Scalar::I64 => "int64_t",
            Scalar::U64 => "uint64_t",
            Scalar::Isize => "intptr_t",
            Scalar::Usize => "size_t",
            Scalar::F32 => "float",
            Scalar::F64 => "double",
        }
    }

    /// Size in bytes; natural alignment equals size for every scalar.
    #[must_use]
    pub fn size(self, width: PointerWidth) -> u64 {
        match self {
            Scalar::Bool | Scalar::Char | Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::I64 | Scalar::U64 | Scalar::F64 => 8,
            Scalar::Isize | Scalar::Usize => width.bytes(),
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        !matches!(self, Scalar::Bool | Scalar::Char | Scalar::F32 | Scalar::F64)
    }

    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Scalar::I8 | Scalar::I16 | Scalar::I32 | Scalar::I64 | Scalar::Isize
        )
    }

    /// Inclusive value range for integer scalars.
    #[must_use]
    pub fn range(self, width: PointerWidth) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = u32::try_from(self.size(width) * 8).ok()?;
        Some(if self.is_signed() {
            (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
        } else {
            (0, (1_i128 << bits) - 1)
        })
    }

    /// The unsigned scalar of the same width.
    #[must_use]
    pub fn unsigned(self) -> Self {
        match self {
            Scalar::I8 => Scalar::U8,
            Scalar::I16 => Scalar::U16,
            Scalar::I32 => Scalar::U32,
            Scalar::I64 => Scalar::U64,
            Scalar::Isize => Scalar::Usize,
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    Const,
    Mut,
}

/// What a user type name stands for once resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamedKind {
    Struct,
    Enum,
    Handle { dispatchable: bool },
    Opaque,
    /// Struct known only by size and alignment.
    ExternalStruct { size: u64, align: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetType {
    Void,
    Scalar(Scalar),
    Named { name: String, kind: NamedKind },
    Pointer { pointee: Box<TargetType>, access: Access },
    /// Recognised native type the targets cannot represent; emission rejects it.
    Unmappable { native: String, reason: String },
}

impl TargetType {
    #[must_use]
    pub fn pointer_to(pointee: TargetType, access: Access) -> Self {
        TargetType::Pointer {
            pointee: Box::new(pointee),
            access,
        }
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, TargetType::Void)
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, TargetType::Pointer { .. })
    }

    #[must_use]
    pub fn pointee(&self) -> Option<&TargetType> {
        match self {
            TargetType::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, TargetType::Scalar(scalar) if scalar.is_integer())
    }

    /// Integer value, or enum newtype, usable as a constant's type.
    #[must_use]
    pub fn integer_scalar(&self) -> Option<Scalar> {
        match self {
            TargetType::Scalar(scalar) if scalar.is_integer() => Some(*scalar),
            TargetType::Named {
                kind: NamedKind::Enum,
                ..
            } => Some(Scalar::I32),
            _ => None,
        }
    }

    /// First unrepresentable type reachable from this one.
    #[must_use]
    pub fn unmappable(&self) -> Option<(&str, &str)> {
        match self {
            TargetType::Unmappable { native, reason } => Some((native, reason)),
            TargetType::Pointer { pointee, .. } => pointee.unmappable(),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Void => f.write_str("void"),
            TargetType::Scalar(scalar) => f.write_str(scalar.c_name()),
            TargetType::Named { name, .. } => f.write_str(name),
            TargetType::Pointer { pointee, access } => match access {
                Access::Const => write!(f, "const {pointee} *"),
                Access::Mut => write!(f, "{pointee} *"),
            },
            TargetType::Unmappable { native, .. } => write!(f, "<unmappable {native}>"),
        }
    }
}

/// How a parameter is passed, derived from its type and modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Value,
    /// `const T *`: the callee only reads.
    ReadOnly,
    /// Plain `T *` the callee may read and write.
    Mutable,
    /// `T *` marked output: the callee writes one value.
    Output,
    /// Caller-allocated buffer the callee fills; its length travels in an output count.
    OutputBuffer,
}

impl ParamRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamRole::Value => "value",
            ParamRole::ReadOnly => "read-only",
            ParamRole::Mutable => "mutable",
            ParamRole::Output => "output",
            ParamRole::OutputBuffer => "output buffer",
        }
    }
}

/// Name neither builtin nor registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownType {
    pub name: String,
}

impl fmt::Display for UnknownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown type `{}`", self.name)
    }
}

impl std::error::Error for UnknownType {}

const MAX_ALIAS_DEPTH: usize = 16;

/// Resolves type tokens against the builtin table, then the registry's user types.
#[derive(Clone, Copy, Debug)]
pub struct TypeResolver<'r> {
    registry: &'r Registry,
    local: Option<&'r InterfaceDescriptor>,
}

impl<'r> TypeResolver<'r> {
    #[must_use]
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            local: None,
        }
    }

    /// Also consult the types of `descriptor`, which may not be registered.
    #[must_use]
    pub fn with_local(mut self, descriptor: &'r InterfaceDescriptor) -> Self {
        self.local = Some(descriptor);
        self
    }

    /// # Errors
    /// Returns [`UnknownType`] when the base name is neither builtin nor registered.
    pub fn resolve(&self, token: &TypeToken) -> Result<TargetType, UnknownType> {
        let mut resolved = self.resolve_base(&token.base, 0)?;
        for level in 0..token.pointer_depth {
            let access = if level == 0 && token.is_const {
                Access::Const
            } else {
                Access::Mut
            };
            resolved = TargetType::pointer_to(resolved, access);
        }
        Ok(resolved)
    }

    fn resolve_base(&self, name: &str, depth: usize) -> Result<TargetType, UnknownType> {
        let unknown = || UnknownType {
            name: name.to_string(),
        };
        if let Some(builtin) = builtins::lookup(name) {
            return Ok(match builtin {
                Builtin::Void => TargetType::Void,
                Builtin::Scalar(scalar) => TargetType::Scalar(scalar),
                Builtin::Handle => TargetType::pointer_to(TargetType::Void, Access::Mut),
                Builtin::Unmappable(reason) => TargetType::Unmappable {
                    native: name.to_string(),
                    reason: reason.to_string(),
                },
            });
        }
        let local = self
            .local
            .and_then(|descriptor| descriptor.types.iter().find(|decl| decl.name == name))
            .map(|decl| UserType::Declared {
                interface: self.local.map_or("", |descriptor| descriptor.name.as_str()),
                decl,
            });
        let user_type = match local {
            Some(user_type) => user_type,
            None => self.registry.user_type(name).ok_or_else(unknown)?,
        };
        let kind = match user_type {
            UserType::Declared { decl, .. } => match &decl.kind {
                TypeDeclKind::Struct { .. } => NamedKind::Struct,
                TypeDeclKind::Enum { .. } => NamedKind::Enum,
                TypeDeclKind::Handle { dispatchable } => NamedKind::Handle {
                    dispatchable: *dispatchable,
                },
                TypeDeclKind::Opaque => NamedKind::Opaque,
            },
            UserType::External(external) => match &external.kind {
                ExternalKind::Enum => NamedKind::Enum,
                ExternalKind::Handle { dispatchable } => NamedKind::Handle {
                    dispatchable: *dispatchable,
                },
                ExternalKind::Opaque => NamedKind::Opaque,
                ExternalKind::Struct { size, align } => NamedKind::ExternalStruct {
                    size: *size,
                    align: *align,
                },
                ExternalKind::Alias { target } => {
                    if depth >= MAX_ALIAS_DEPTH {
                        return Err(unknown());
                    }
                    return self.resolve_base(target, depth + 1);
                }
            },
        };
        Ok(TargetType::Named {
            name: name.to_string(),
            kind,
        })
    }
}

/// Classify how a resolved parameter is passed.
///
/// `carrier` is the sibling holding this parameter's buffer length, when there is one.
#[must_use]
pub fn classify_parameter(
    param: &Parameter,
    ty: &TargetType,
    carrier: Option<&Parameter>,
) -> ParamRole {
    let TargetType::Pointer { access, .. } = ty else {
        return ParamRole::Value;
    };
    let output = param.modifiers.contains(ParamModifiers::OUTPUT);
    let output_count = carrier.is_some_and(|carrier| {
        carrier.ty.is_pointer() && carrier.modifiers.contains(ParamModifiers::OUTPUT)
    });
    let double_pointer = param.modifiers.contains(ParamModifiers::POINTER_TO_POINTER);
    if output_count && (output || double_pointer) {
        return ParamRole::OutputBuffer;
    }
    if output {
        return ParamRole::Output;
    }
    match access {
        Access::Const => ParamRole::ReadOnly,
        Access::Mut => ParamRole::Mutable,
    }
}
