//! Name registry of the interfaces loaded for one generation run.
//!
//! Loads are handed to a single [`Registrar`] that inserts them in input order; once every load
//! has joined the registry is unwrapped into a plain [`Registry`] and only read from.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::descriptor::{InterfaceDescriptor, TypeDecl};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};
use crate::types::builtins;

/// Label used for errors raised against manifest-declared types.
pub const MANIFEST_SCOPE: &str = "manifest";

/// An interface plus its position in the declared input order.
#[derive(Clone, Debug)]
pub struct RegisteredInterface {
    pub ordinal: usize,
    pub descriptor: Arc<InterfaceDescriptor>,
}

/// A type the registry knows about without any interface declaring it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ExternalType {
    pub name: String,
    #[serde(flatten)]
    pub kind: ExternalKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExternalKind {
    /// 32-bit enumeration declared by the base API.
    Enum,
    Handle {
        #[serde(default = "dispatchable_default")]
        dispatchable: bool,
    },
    Opaque,
    /// Struct whose layout is known but whose members are not described.
    Struct { size: u64, align: u64 },
    /// Another name for a builtin or registered type (`VkImageCreateFlags: VkFlags`).
    Alias { target: String },
}

fn dispatchable_default() -> bool {
    true
}

impl ExternalType {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ExternalKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// What a registered type name refers to.
#[derive(Clone, Copy, Debug)]
pub enum UserType<'r> {
    Declared {
        interface: &'r str,
        decl: &'r TypeDecl,
    },
    External(&'r ExternalType),
}

#[derive(Clone, Debug)]
enum TypeSlot {
    Declared { interface: String, index: usize },
    External(ExternalType),
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    interfaces: HashMap<String, RegisteredInterface>,
    types: HashMap<String, TypeSlot>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with manifest types.
    ///
    /// # Errors
    /// Returns `DuplicateName` for every external type declared twice or shadowing a builtin.
    pub fn with_external_types(types: &[ExternalType]) -> Result<Self, ErrorSet> {
        let mut registry = Self::new();
        let mut errors = ErrorSet::new();
        for ty in types {
            if let Err(error) = registry.register_external(ty.clone()) {
                errors.push(error);
            }
        }
        errors.finish(registry)
    }

    /// # Errors
    /// Returns `DuplicateName` when the name is already known.
    pub fn register_external(&mut self, ty: ExternalType) -> Result<(), GenerationError> {
        if let Some(message) = self.type_conflict(&ty.name) {
            return Err(GenerationError::new(
                ErrorKind::DuplicateName,
                MANIFEST_SCOPE,
                Entity::ty(ty.name.clone()),
                message,
            ));
        }
        self.types.insert(ty.name.clone(), TypeSlot::External(ty));
        Ok(())
    }

    /// Insert a descriptor under its qualified name.
    ///
    /// Nothing is inserted when the interface name, or any type it declares, is already taken;
    /// the earlier registration is kept.
    ///
    /// # Errors
    /// Returns one `DuplicateName` error per conflicting name.
    pub fn register(
        &mut self,
        descriptor: InterfaceDescriptor,
        ordinal: usize,
    ) -> Result<Arc<InterfaceDescriptor>, ErrorSet> {
        let mut errors = ErrorSet::new();
        if let Some(existing) = self.interfaces.get(&descriptor.name) {
            errors.push(GenerationError::new(
                ErrorKind::DuplicateName,
                descriptor.name.clone(),
                Entity::Interface,
                format!(
                    "interface `{}` is already registered (input #{})",
                    descriptor.name,
                    existing.ordinal + 1
                ),
            ));
        }
        for decl in &descriptor.types {
            if let Some(message) = self.type_conflict(&decl.name) {
                errors.push(GenerationError::new(
                    ErrorKind::DuplicateName,
                    descriptor.name.clone(),
                    Entity::ty(decl.name.clone()),
                    message,
                ));
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        for (index, decl) in descriptor.types.iter().enumerate() {
            self.types.insert(
                decl.name.clone(),
                TypeSlot::Declared {
                    interface: descriptor.name.clone(),
                    index,
                },
            );
        }
        let descriptor = Arc::new(descriptor);
        self.interfaces.insert(
            descriptor.name.clone(),
            RegisteredInterface {
                ordinal,
                descriptor: Arc::clone(&descriptor),
            },
        );
        Ok(descriptor)
    }

    fn type_conflict(&self, name: &str) -> Option<String> {
        if builtins::lookup(name).is_some() {
            return Some(format!("type `{name}` shadows a builtin type"));
        }
        match self.types.get(name)? {
            TypeSlot::Declared { interface, .. } => Some(format!(
                "type `{name}` is already declared by interface `{interface}`"
            )),
            TypeSlot::External(_) => Some(format!(
                "type `{name}` is already declared in the manifest"
            )),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredInterface> {
        self.interfaces.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Every registered interface, in declaration order.
    #[must_use]
    pub fn interfaces(&self) -> Vec<&RegisteredInterface> {
        let mut interfaces: Vec<_> = self.interfaces.values().collect();
        interfaces.sort_by(|a, b| {
            a.ordinal
                .cmp(&b.ordinal)
                .then_with(|| a.descriptor.name.cmp(&b.descriptor.name))
        });
        interfaces
    }

    /// Interfaces declared before `name`, in declaration order.
    ///
    /// An interface that is not registered sees everything.
    #[must_use]
    pub fn earlier_than(&self, name: &str) -> Vec<&RegisteredInterface> {
        let bound = self.interfaces.get(name).map(|entry| entry.ordinal);
        self.interfaces()
            .into_iter()
            .filter(|entry| entry.descriptor.name != name)
            .filter(|entry| bound.is_none_or(|bound| entry.ordinal < bound))
            .collect()
    }

    #[must_use]
    pub fn user_type(&self, name: &str) -> Option<UserType<'_>> {
        match self.types.get(name)? {
            TypeSlot::Declared { interface, index } => {
                let entry = self.interfaces.get(interface)?;
                let decl = entry.descriptor.types.get(*index)?;
                Some(UserType::Declared {
                    interface: entry.descriptor.name.as_str(),
                    decl,
                })
            }
            TypeSlot::External(ty) => Some(UserType::External(ty)),
        }
    }
}

/// Registration outcome for one input.
pub type Registration = Result<Arc<InterfaceDescriptor>, ErrorSet>;

/// Sole writer of the registry while loads are running.
///
/// Loaders hand over descriptors in whatever order they finish; they are registered strictly in
/// input order, so the earliest declaration of a name is the one that wins.
#[derive(Debug, Default)]
pub struct Registrar {
    registry: Registry,
    next: usize,
    pending: BTreeMap<usize, Option<InterfaceDescriptor>>,
}

impl Registrar {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Accept the load result of input `ordinal`; `None` marks an input that failed to load.
    ///
    /// Returns the registrations this made possible, in input order.
    pub fn submit(
        &mut self,
        ordinal: usize,
        descriptor: Option<InterfaceDescriptor>,
    ) -> Vec<(usize, Registration)> {
        self.pending.insert(ordinal, descriptor);
        let mut ready = Vec::new();
        while let Some(descriptor) = self.pending.remove(&self.next) {
            let ordinal = self.next;
            self.next += 1;
            if let Some(descriptor) = descriptor {
                ready.push((ordinal, self.register(descriptor, ordinal)));
            }
        }
        ready
    }

    fn register(&mut self, descriptor: InterfaceDescriptor, ordinal: usize) -> Registration {
        let name = descriptor.name.clone();
        let result = self.registry.register(descriptor, ordinal);
        tracing::debug!(
            target: "pipeline",
            stage = "registry.register",
            interface = %name,
            ordinal,
            ok = result.is_ok()
        );
        result
    }

    /// Inputs still waiting behind one that never reported.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Consume the registrar once every loader has stopped.
    #[must_use]
    pub fn into_inner(self) -> Registry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDeclKind;

    fn with_type(name: &str, ty: &str) -> InterfaceDescriptor {
        let mut descriptor = InterfaceDescriptor::new(name);
        descriptor.types.push(TypeDecl {
            name: ty.to_string(),
            doc: String::new(),
            kind: TypeDeclKind::Opaque,
        });
        descriptor
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = Registry::new();
        registry
            .register(InterfaceDescriptor::new("Sample"), 1)
            .unwrap();
        let err = registry
            .register(InterfaceDescriptor::new("Sample"), 0)
            .unwrap_err();
        assert_eq!(err.kinds(), vec![ErrorKind::DuplicateName]);
        assert_eq!(registry.get("Sample").unwrap().ordinal, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn type_collisions_reject_the_whole_interface() {
        let mut registry = Registry::new();
        registry.register(with_type("A", "Handle_t"), 0).unwrap();
        let err = registry.register(with_type("B", "Handle_t"), 1).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("already declared by interface `A`"));
        assert!(registry.get("B").is_none());
        assert!(matches!(
            registry.user_type("Handle_t"),
            Some(UserType::Declared { interface: "A", .. })
        ));
    }

    #[test]
    fn builtin_names_cannot_be_redeclared() {
        let mut registry = Registry::new();
        let err = registry.register(with_type("A", "uint32_t"), 0).unwrap_err();
        assert!(err.to_string().contains("shadows a builtin"));
        let err = Registry::with_external_types(&[ExternalType::new("EGLint", ExternalKind::Enum)])
            .unwrap_err();
        assert_eq!(err.iter().next().unwrap().interface, MANIFEST_SCOPE);
    }

    #[test]
    fn earlier_than_follows_ordinals() {
        let mut registry = Registry::new();
        for (ordinal, name) in ["Base", "Middle", "Last"].into_iter().enumerate() {
            registry
                .register(InterfaceDescriptor::new(name), ordinal)
                .unwrap();
        }
        let names = |entries: Vec<&RegisteredInterface>| {
            entries
                .into_iter()
                .map(|entry| entry.descriptor.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(registry.earlier_than("Middle")), vec!["Base"]);
        assert!(registry.earlier_than("Base").is_empty());
        assert_eq!(
            names(registry.earlier_than("Unregistered")),
            vec!["Base", "Middle", "Last"]
        );
    }

    #[test]
    fn registrar_registers_in_input_order() {
        let mut registrar = Registrar::new(Registry::new());
        assert!(registrar.submit(2, Some(InterfaceDescriptor::new("Same"))).is_empty());
        assert!(registrar.submit(1, None).is_empty());
        assert_eq!(registrar.pending(), 2);

        let ready = registrar.submit(0, Some(InterfaceDescriptor::new("Same")));
        let outcomes: Vec<(usize, bool)> = ready
            .iter()
            .map(|(ordinal, registration)| (*ordinal, registration.is_ok()))
            .collect();
        assert_eq!(outcomes, vec![(0, true), (2, false)]);
        assert_eq!(registrar.pending(), 0);

        let registry = registrar.into_inner();
        assert_eq!(registry.get("Same").unwrap().ordinal, 0);
    }

    #[test]
    fn external_types_deserialize_from_yaml() {
        let types: Vec<ExternalType> = serde_yaml::from_str(
            r#"
- { name: VkStructureType, kind: enum }
- { name: VkDevice, kind: handle }
- { name: VkFence, kind: handle, dispatchable: false }
- { name: VkExtent2D, kind: struct, size: 8, align: 4 }
- { name: VkImageCreateFlags, kind: alias, target: VkFlags }
"#,
        )
        .unwrap();
        assert_eq!(types[1].kind, ExternalKind::Handle { dispatchable: true });
        assert_eq!(
            types[4].kind,
            ExternalKind::Alias {
                target: "VkFlags".into()
            }
        );
        let registry = Registry::with_external_types(&types).unwrap();
        assert!(matches!(
            registry.user_type("VkExtent2D"),
            Some(UserType::External(_))
        ));
    }
}
