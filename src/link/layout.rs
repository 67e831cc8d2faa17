//! C struct layout for the configured pointer width.

use std::collections::HashMap;

use crate::descriptor::{InterfaceDescriptor, Member, TypeDeclKind};
use crate::registry::{Registry, UserType};
use crate::types::{NamedKind, PointerWidth, TargetType, TypeResolver};

/// Size, alignment and member offsets of one struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u64,
    pub align: u64,
    pub offsets: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum LayoutError {
    /// Names along the by-value containment chain, ending with the repeated struct.
    Recursive(Vec<String>),
    OpaqueByValue(String),
    /// Size of the named member does not fit in 64 bits.
    Overflow(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Recursive(chain) => {
                write!(f, "struct contains itself by value ({})", chain.join(" -> "))
            }
            LayoutError::OpaqueByValue(name) => {
                write!(f, "opaque type `{name}` can only be used behind a pointer")
            }
            LayoutError::Overflow(member) => {
                write!(f, "struct size overflows 64 bits at member `{member}`")
            }
        }
    }
}

pub(super) fn align_to(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        value.div_ceil(align).checked_mul(align)
    }
}

/// Memoising layout calculator for one link call.
pub(super) struct LayoutEngine<'a> {
    local: &'a InterfaceDescriptor,
    registry: &'a Registry,
    resolver: TypeResolver<'a>,
    width: PointerWidth,
    done: HashMap<String, Option<StructLayout>>,
    visiting: Vec<String>,
}

impl<'a> LayoutEngine<'a> {
    pub(super) fn new(
        local: &'a InterfaceDescriptor,
        registry: &'a Registry,
        width: PointerWidth,
    ) -> Self {
        Self {
            local,
            registry,
            resolver: TypeResolver::new(registry).with_local(local),
            width,
            done: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Layout of a named struct; `None` when some member has no representation yet
    /// (unknown or unmappable types are reported elsewhere).
    pub(super) fn struct_layout(
        &mut self,
        name: &str,
    ) -> Result<Option<StructLayout>, LayoutError> {
        if let Some(layout) = self.done.get(name) {
            return Ok(layout.clone());
        }
        if self.visiting.iter().any(|entry| entry == name) {
            let mut chain = self.visiting.clone();
            chain.push(name.to_string());
            return Err(LayoutError::Recursive(chain));
        }
        let Some(members) = self.members_of(name) else {
            return Ok(None);
        };

        self.visiting.push(name.to_string());
        let computed = self.compute(members);
        self.visiting.pop();

        let layout = computed?;
        self.done.insert(name.to_string(), layout.clone());
        Ok(layout)
    }

    fn members_of(&self, name: &str) -> Option<&'a [Member]> {
        let local = self.local.types.iter().find(|decl| decl.name == name);
        let decl = match local {
            Some(decl) => decl,
            None => match self.registry.user_type(name)? {
                UserType::Declared { decl, .. } => decl,
                UserType::External(_) => return None,
            },
        };
        match &decl.kind {
            TypeDeclKind::Struct { members } => Some(members.as_slice()),
            _ => None,
        }
    }

    fn compute(&mut self, members: &'a [Member]) -> Result<Option<StructLayout>, LayoutError> {
        let mut offset = 0_u64;
        let mut align = 1_u64;
        let mut offsets = Vec::with_capacity(members.len());
        let mut complete = true;
        for member in members {
            let Ok(ty) = self.resolver.resolve(&member.ty) else {
                complete = false;
                continue;
            };
            let Some((size, member_align)) = self.value_layout(&ty)? else {
                complete = false;
                continue;
            };
            let overflow = || LayoutError::Overflow(member.name.clone());
            let count = u64::try_from(member.array_len.unwrap_or(1)).map_err(|_| overflow())?;
            offset = align_to(offset, member_align).ok_or_else(overflow)?;
            offsets.push(offset);
            offset = size
                .checked_mul(count)
                .and_then(|bytes| offset.checked_add(bytes))
                .ok_or_else(overflow)?;
            align = align.max(member_align);
        }
        if !complete {
            return Ok(None);
        }
        let size = match members.last() {
            Some(last) => align_to(offset, align)
                .ok_or_else(|| LayoutError::Overflow(last.name.clone()))?,
            None => 0,
        };
        Ok(Some(StructLayout {
            size,
            align,
            offsets,
        }))
    }

    /// Size and alignment of a by-value use of `ty`.
    pub(super) fn value_layout(
        &mut self,
        ty: &TargetType,
    ) -> Result<Option<(u64, u64)>, LayoutError> {
        let pointer = self.width.bytes();
        Ok(match ty {
            TargetType::Void | TargetType::Unmappable { .. } => None,
            TargetType::Scalar(scalar) => {
                let size = scalar.size(self.width);
                Some((size, size))
            }
            TargetType::Pointer { .. } => Some((pointer, pointer)),
            TargetType::Named { name, kind } => match kind {
                NamedKind::Struct => self
                    .struct_layout(name)?
                    .map(|layout| (layout.size, layout.align)),
                NamedKind::Enum => Some((4, 4)),
                NamedKind::Handle { dispatchable: true } => Some((pointer, pointer)),
                NamedKind::Handle {
                    dispatchable: false,
                } => Some((8, 8)),
                NamedKind::Opaque => return Err(LayoutError::OpaqueByValue(name.clone())),
                NamedKind::ExternalStruct { size, align } => Some((*size, *align)),
            },
        })
    }
}
