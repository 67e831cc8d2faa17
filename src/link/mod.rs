//! Resolution of one interface against the registry: constant references, array-length
//! bindings, type tokens and struct layouts.

mod arrays;
mod constants;
mod layout;


use std::collections::{BTreeMap, HashMap};

use crate::descriptor::{
    Constant, EnumExtension, EnumExtensionValue, Function, IntLiteral, InterfaceDescriptor,
    Member, Parameter, TypeDecl, TypeDeclKind, TypeToken,
};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};
use crate::registry::{Registry, UserType};
use crate::types::{
    NamedKind, ParamRole, PointerWidth, TargetType, TypeResolver, classify_parameter,
};

pub use arrays::ArrayBinding;
pub use constants::ResolvedValue;
pub use layout::StructLayout;

use constants::ConstantResolver;
use layout::LayoutEngine;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkOptions {
    pub pointer_width: PointerWidth,
}

/// Read-only view of a descriptor with every reference resolved.
#[derive(Clone, Debug)]
pub struct LinkedInterface<'d> {
    pub descriptor: &'d InterfaceDescriptor,
    pub pointer_width: PointerWidth,
    pub types: Vec<LinkedType<'d>>,
    pub constants: Vec<LinkedConstant<'d>>,
    pub enum_entries: Vec<LinkedEnumEntry<'d>>,
    pub functions: Vec<LinkedFunction<'d>>,
    /// Types used here but declared elsewhere, sorted by name.
    pub imports: Vec<TypeImport>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeImport {
    pub name: String,
    pub origin: ImportOrigin,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOrigin {
    /// Declared by another interface; `unit` is its generated unit name.
    Interface { name: String, unit: String },
    /// Declared in the manifest's `types` list.
    Manifest,
}

#[derive(Clone, Debug)]
pub struct LinkedType<'d> {
    pub decl: &'d TypeDecl,
    /// Struct members; empty for other kinds.
    pub members: Vec<LinkedMember<'d>>,
    pub layout: Option<StructLayout>,
}

#[derive(Clone, Debug)]
pub struct LinkedMember<'d> {
    pub member: &'d Member,
    pub ty: TargetType,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LinkedConstant<'d> {
    pub constant: &'d Constant,
    pub native_name: String,
    /// Declared type, own or inherited along the reference chain.
    pub ty: Option<TargetType>,
    pub value: ResolvedValue,
    /// `Interface.NAME` the value was taken from, for references.
    pub resolved_from: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LinkedEnumEntry<'d> {
    pub entry: &'d EnumExtension,
    pub native_name: String,
    pub value: IntLiteral,
}

#[derive(Clone, Debug)]
pub struct LinkedFunction<'d> {
    pub function: &'d Function,
    pub native_name: String,
    pub returns: TargetType,
    pub params: Vec<LinkedParameter<'d>>,
    pub bindings: Vec<ArrayBinding>,
}

#[derive(Clone, Debug)]
pub struct LinkedParameter<'d> {
    pub param: &'d Parameter,
    pub ty: TargetType,
    pub role: ParamRole,
    /// Sibling carrying this buffer's length.
    pub carrier: Option<String>,
}

struct Linker<'a> {
    descriptor: &'a InterfaceDescriptor,
    registry: &'a Registry,
    resolver: TypeResolver<'a>,
    errors: ErrorSet,
}

/// Resolve `descriptor` against `registry`. The descriptor itself is never modified.
///
/// # Errors
/// Returns every `UnknownType`, `UnresolvedReference`, `InvalidArraySizeBinding` and
/// `InvalidLayout` problem found.
pub fn link<'d>(
    descriptor: &'d InterfaceDescriptor,
    registry: &'d Registry,
    options: &LinkOptions,
) -> Result<LinkedInterface<'d>, ErrorSet> {
    let mut linker = Linker {
        descriptor,
        registry,
        resolver: TypeResolver::new(registry).with_local(descriptor),
        errors: ErrorSet::new(),
    };

    let types = linker.types(options.pointer_width);
    let constants = linker.constants();
    let enum_entries = linker.enum_entries();
    let functions = linker.functions();
    let imports = linker.imports(&types, &constants, &enum_entries, &functions);

    tracing::debug!(
        target: "pipeline",
        stage = "link",
        interface = %descriptor.name,
        types = types.len(),
        constants = constants.len(),
        functions = functions.len(),
        errors = linker.errors.len()
    );
    linker.errors.finish(LinkedInterface {
        descriptor,
        pointer_width: options.pointer_width,
        types,
        constants,
        enum_entries,
        functions,
        imports,
    })
}

fn collect_named<'t>(ty: &'t TargetType, names: &mut Vec<&'t str>) {
    match ty {
        TargetType::Named { name, .. } => names.push(name),
        TargetType::Pointer { pointee, .. } => collect_named(pointee, names),
        _ => {}
    }
}

impl<'a> Linker<'a> {
    fn fail(&mut self, kind: ErrorKind, entity: Entity, message: impl Into<String>) {
        self.errors.push(GenerationError::new(
            kind,
            self.descriptor.name.clone(),
            entity,
            message,
        ));
    }

    fn resolve(&mut self, token: &TypeToken, entity: Entity) -> Option<TargetType> {
        match self.resolver.resolve(token) {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.fail(ErrorKind::UnknownType, entity, err.to_string());
                None
            }
        }
    }

    fn imports(
        &self,
        types: &[LinkedType<'_>],
        constants: &[LinkedConstant<'_>],
        enum_entries: &[LinkedEnumEntry<'_>],
        functions: &[LinkedFunction<'_>],
    ) -> Vec<TypeImport> {
        let mut names = Vec::new();
        for member in types.iter().flat_map(|ty| &ty.members) {
            collect_named(&member.ty, &mut names);
        }
        for ty in constants.iter().filter_map(|constant| constant.ty.as_ref()) {
            collect_named(ty, &mut names);
        }
        names.extend(enum_entries.iter().map(|entry| entry.entry.extends.as_str()));
        for function in functions {
            collect_named(&function.returns, &mut names);
            for param in &function.params {
                collect_named(&param.ty, &mut names);
            }
        }

        let mut imports = BTreeMap::new();
        for name in names {
            if self.descriptor.types.iter().any(|decl| decl.name == name) {
                continue;
            }
            let origin = match self.registry.user_type(name) {
                Some(UserType::Declared { interface, .. }) => ImportOrigin::Interface {
                    name: interface.to_string(),
                    unit: self
                        .registry
                        .get(interface)
                        .map_or(interface, |entry| entry.descriptor.unit_name())
                        .to_string(),
                },
                Some(UserType::External(_)) => ImportOrigin::Manifest,
                None => continue,
            };
            imports.entry(name.to_string()).or_insert(origin);
        }
        imports
            .into_iter()
            .map(|(name, origin)| TypeImport { name, origin })
            .collect()
    }

    fn types(&mut self, width: PointerWidth) -> Vec<LinkedType<'a>> {
        let mut engine = LayoutEngine::new(self.descriptor, self.registry, width);
        let mut linked = Vec::with_capacity(self.descriptor.types.len());
        for decl in &self.descriptor.types {
            let TypeDeclKind::Struct { members } = &decl.kind else {
                linked.push(LinkedType {
                    decl,
                    members: Vec::new(),
                    layout: None,
                });
                continue;
            };
            let mut linked_members = Vec::with_capacity(members.len());
            for member in members {
                let entity = Entity::member(decl.name.clone(), member.name.clone());
                if let Some(ty) = self.resolve(&member.ty, entity) {
                    linked_members.push(LinkedMember {
                        member,
                        ty,
                        offset: None,
                    });
                }
            }
            let layout = match engine.struct_layout(&decl.name) {
                Ok(layout) => layout,
                Err(err) => {
                    self.fail(
                        ErrorKind::InvalidLayout,
                        Entity::ty(decl.name.clone()),
                        err.to_string(),
                    );
                    None
                }
            };
            if let Some(layout) = &layout {
                for (member, offset) in linked_members.iter_mut().zip(&layout.offsets) {
                    member.offset = Some(*offset);
                }
            }
            linked.push(LinkedType {
                decl,
                members: linked_members,
                layout,
            });
        }
        linked
    }

    fn constants(&mut self) -> Vec<LinkedConstant<'a>> {
        let resolver = ConstantResolver::new(self.descriptor, self.registry);
        let mut linked = Vec::with_capacity(self.descriptor.constants.len());
        for constant in &self.descriptor.constants {
            let resolution = match resolver.resolve(constant) {
                Ok(resolution) => resolution,
                Err(err) => {
                    self.fail(
                        ErrorKind::UnresolvedReference,
                        Entity::constant(constant.name.clone()),
                        err.to_string(),
                    );
                    continue;
                }
            };
            let ty = match resolution.ty {
                Some(token) => {
                    match self.resolve(token, Entity::constant(constant.name.clone())) {
                        Some(ty) => Some(ty),
                        None => continue,
                    }
                }
                None => None,
            };
            linked.push(LinkedConstant {
                constant,
                native_name: self.descriptor.native_constant_name(&constant.name),
                ty,
                value: resolution.value,
                resolved_from: resolution.target,
            });
        }
        linked
    }

    fn enum_entries(&mut self) -> Vec<LinkedEnumEntry<'a>> {
        let mut linked = Vec::with_capacity(self.descriptor.enum_extensions.len());
        for entry in &self.descriptor.enum_extensions {
            let entity = || Entity::enum_entry(entry.name.clone());
            let token = TypeToken::named(entry.extends.clone());
            let Some(extended) = self.resolve(&token, entity()) else {
                continue;
            };
            if !matches!(
                extended,
                TargetType::Named {
                    kind: NamedKind::Enum,
                    ..
                }
            ) {
                self.fail(
                    ErrorKind::UnknownType,
                    entity(),
                    format!("`{}` is not an enum type", entry.extends),
                );
                continue;
            }
            let literal = match entry.value {
                EnumExtensionValue::Literal(literal) => Some(literal),
                offset => offset
                    .evaluate(self.descriptor.number)
                    .map(IntLiteral::decimal),
            };
            let Some(value) = literal else {
                self.fail(
                    ErrorKind::MalformedDescriptor,
                    entity(),
                    "`offset` values need the interface registry `number`",
                );
                continue;
            };
            linked.push(LinkedEnumEntry {
                entry,
                native_name: self.descriptor.native_constant_name(&entry.name),
                value,
            });
        }
        linked
    }

    fn functions(&mut self) -> Vec<LinkedFunction<'a>> {
        let mut linked = Vec::with_capacity(self.descriptor.functions.len());
        for function in &self.descriptor.functions {
            let returns = self.resolve(&function.returns, Entity::function(function.name.clone()));
            let mut resolved: HashMap<&str, TargetType> = HashMap::new();
            for param in &function.params {
                let entity = Entity::parameter(function.name.clone(), param.name.clone());
                if let Some(ty) = self.resolve(&param.ty, entity) {
                    resolved.insert(param.name.as_str(), ty);
                }
            }
            let bindings = arrays::bind_arrays(
                &self.descriptor.name,
                function,
                returns.as_ref(),
                &resolved,
                &mut self.errors,
            );

            let Some(returns) = returns else {
                continue;
            };
            if resolved.len() != function.params.len() {
                continue;
            }
            let params = function
                .params
                .iter()
                .filter_map(|param| {
                    let ty = resolved.remove(param.name.as_str())?;
                    let carrier = bindings
                        .iter()
                        .find(|binding| binding.buffer == param.name)
                        .map(|binding| binding.carrier.clone());
                    let carrier_param = carrier.as_deref().and_then(|name| function.param(name));
                    let role = classify_parameter(param, &ty, carrier_param);
                    Some(LinkedParameter {
                        param,
                        ty,
                        role,
                        carrier,
                    })
                })
                .collect();
            linked.push(LinkedFunction {
                function,
                native_name: self.descriptor.native_function_name(&function.name),
                returns,
                params,
                bindings,
            });
        }
        linked
    }
}
