//! Symbolic resolution of constant references.

use std::fmt;

use crate::descriptor::{
    Constant, ConstantKind, ConstantRef, ConstantValue, IntLiteral, InterfaceDescriptor,
    TypeToken,
};
use crate::registry::Registry;

/// Literal value a constant ends up with after following references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedValue {
    Int(IntLiteral),
    Str(String),
    Expr(String),
}

impl ResolvedValue {
    #[must_use]
    pub fn kind(&self) -> ConstantKind {
        match self {
            ResolvedValue::Int(_) => ConstantKind::Integer,
            ResolvedValue::Str(_) => ConstantKind::String,
            ResolvedValue::Expr(_) => ConstantKind::Expression,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Resolution<'a> {
    pub value: ResolvedValue,
    /// First declared type along the reference chain.
    pub ty: Option<&'a TypeToken>,
    /// `Interface.NAME` of the constant holding the literal, for references.
    pub target: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum RefError {
    Absent(ConstantRef),
    Ambiguous(ConstantRef, Vec<String>),
    Cyclic(Vec<String>),
    UnknownInterface(String),
    DeclaredLater { interface: String, from: String },
    KindMismatch {
        declared: ConstantKind,
        found: ConstantKind,
        target: String,
    },
}

impl fmt::Display for RefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefError::Absent(reference) => write!(
                f,
                "`{reference}` does not name a constant of this or an earlier interface"
            ),
            RefError::Ambiguous(reference, candidates) => write!(
                f,
                "`{reference}` is ambiguous; it matches {}",
                candidates.join(", ")
            ),
            RefError::Cyclic(chain) => write!(f, "reference cycle {}", chain.join(" -> ")),
            RefError::UnknownInterface(name) => write!(f, "interface `{name}` is not registered"),
            RefError::DeclaredLater { interface, from } => write!(
                f,
                "interface `{interface}` is declared after `{from}` and cannot be referenced"
            ),
            RefError::KindMismatch {
                declared,
                found,
                target,
            } => write!(
                f,
                "declared as {} but `{target}` is a {} constant",
                declared.as_str(),
                found.as_str()
            ),
        }
    }
}

fn qualified(interface: &InterfaceDescriptor, constant: &Constant) -> String {
    format!("{}.{}", interface.name, constant.name)
}

/// Follows reference chains through the linked interface and the interfaces before it.
pub(super) struct ConstantResolver<'a> {
    local: &'a InterfaceDescriptor,
    registry: &'a Registry,
}

impl<'a> ConstantResolver<'a> {
    pub(super) fn new(local: &'a InterfaceDescriptor, registry: &'a Registry) -> Self {
        Self { local, registry }
    }

    pub(super) fn resolve(&self, constant: &'a Constant) -> Result<Resolution<'a>, RefError> {
        let mut interface = self.local;
        let mut current = constant;
        let mut ty = constant.ty.as_ref();
        let mut chain = vec![qualified(interface, current)];

        let value = loop {
            let reference = match &current.value {
                ConstantValue::Int(literal) => break ResolvedValue::Int(*literal),
                ConstantValue::Str(text) => break ResolvedValue::Str(text.clone()),
                ConstantValue::Expr(expr) => break ResolvedValue::Expr(expr.clone()),
                ConstantValue::Ref(reference) => reference,
            };
            let (next_interface, next) = self.lookup(interface, reference)?;
            let key = qualified(next_interface, next);
            let repeated = chain.contains(&key);
            chain.push(key);
            if repeated {
                return Err(RefError::Cyclic(chain));
            }
            if ty.is_none() {
                ty = next.ty.as_ref();
            }
            interface = next_interface;
            current = next;
        };

        if let Some(declared) = constant.kind {
            if declared != value.kind() {
                return Err(RefError::KindMismatch {
                    declared,
                    found: value.kind(),
                    target: chain.last().cloned().unwrap_or_default(),
                });
            }
        }
        let target = matches!(constant.value, ConstantValue::Ref(_))
            .then(|| chain.last().cloned())
            .flatten();
        Ok(Resolution { value, ty, target })
    }

    /// The registered descriptor, or the one being linked when the names match.
    fn descriptor(&self, name: &str) -> Option<&'a InterfaceDescriptor> {
        if name == self.local.name {
            return Some(self.local);
        }
        let registry: &'a Registry = self.registry;
        registry.get(name).map(|entry| entry.descriptor.as_ref())
    }

    fn earlier(&self, interface: &InterfaceDescriptor) -> Vec<&'a InterfaceDescriptor> {
        let registry: &'a Registry = self.registry;
        registry
            .earlier_than(&interface.name)
            .into_iter()
            .filter_map(|entry| self.descriptor(&entry.descriptor.name))
            .collect()
    }

    fn lookup(
        &self,
        from: &'a InterfaceDescriptor,
        reference: &ConstantRef,
    ) -> Result<(&'a InterfaceDescriptor, &'a Constant), RefError> {
        if let Some(qualifier) = &reference.interface {
            let target = if *qualifier == from.name {
                from
            } else {
                let earlier = self.earlier(from);
                match earlier.into_iter().find(|entry| entry.name == *qualifier) {
                    Some(target) => target,
                    None if self.descriptor(qualifier).is_some() => {
                        return Err(RefError::DeclaredLater {
                            interface: qualifier.clone(),
                            from: from.name.clone(),
                        });
                    }
                    None => return Err(RefError::UnknownInterface(qualifier.clone())),
                }
            };
            return find_in(target, &reference.name)
                .map(|constant| (target, constant))
                .ok_or_else(|| RefError::Absent(reference.clone()));
        }

        let earlier = self.earlier(from);
        let by_local = |interface: &'a InterfaceDescriptor| interface.constant(&reference.name);
        let by_native = |interface: &'a InterfaceDescriptor| {
            interface
                .constants
                .iter()
                .find(|constant| interface.native_constant_name(&constant.name) == reference.name)
        };

        if let Some(constant) = by_local(from) {
            return Ok((from, constant));
        }
        if let Some(found) = unique_match(&earlier, reference, by_local)? {
            return Ok(found);
        }
        if let Some(constant) = by_native(from) {
            return Ok((from, constant));
        }
        unique_match(&earlier, reference, by_native)?
            .ok_or_else(|| RefError::Absent(reference.clone()))
    }
}

fn find_in<'a>(interface: &'a InterfaceDescriptor, name: &str) -> Option<&'a Constant> {
    interface.constant(name).or_else(|| {
        interface
            .constants
            .iter()
            .find(|constant| interface.native_constant_name(&constant.name) == name)
    })
}

fn unique_match<'a>(
    candidates: &[&'a InterfaceDescriptor],
    reference: &ConstantRef,
    find: impl Fn(&'a InterfaceDescriptor) -> Option<&'a Constant>,
) -> Result<Option<(&'a InterfaceDescriptor, &'a Constant)>, RefError> {
    let matches: Vec<_> = candidates
        .iter()
        .filter_map(|interface| find(interface).map(|constant| (*interface, constant)))
        .collect();
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.into_iter().next()),
        _ => Err(RefError::Ambiguous(
            reference.clone(),
            matches
                .iter()
                .map(|(interface, constant)| qualified(interface, constant))
                .collect(),
        )),
    }
}
