use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::source::{
    RawConstant, RawEnumExtension, RawFunction, RawInterface, RawParam, RawScalar, RawType,
};
use super::{
    BindingMode, CallingConvention, Constant, ConstantKind, ConstantRef, ConstantValue,
    EnumExtension, EnumExtensionValue, EnumValueDecl, Function, IntLiteral, InterfaceDescriptor,
    Member, NativePrefix, ParamModifiers, Parameter, ReturnedLength, TypeDecl, TypeDeclKind,
    TypeToken,
};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|err| panic!("identifier regex: {err}"))
});

/// Text of one descriptor plus where it came from.
#[derive(Clone, Debug)]
pub struct DescriptorSource {
    pub label: String,
    pub path: Option<PathBuf>,
    pub text: String,
}

impl DescriptorSource {
    #[must_use]
    pub fn inline(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: None,
            text: text.into(),
        }
    }

    /// Read a descriptor file.
    ///
    /// # Errors
    /// Propagates the I/O error when the file cannot be read.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self {
            label: path.display().to_string(),
            path: Some(path.to_path_buf()),
            text,
        })
    }
}

/// Defaults applied while loading.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Library binding used when a descriptor with functions declares none.
    pub default_library: Option<String>,
}

/// Parse and validate one descriptor source.
///
/// Loading never touches a registry; the caller registers the returned descriptor.
///
/// # Errors
/// Returns every `MalformedDescriptor` problem found in the source.
pub fn load_interface(
    source: &DescriptorSource,
    options: &LoadOptions,
) -> Result<InterfaceDescriptor, ErrorSet> {
    let raw: RawInterface = serde_yaml::from_str(&source.text).map_err(|err| {
        ErrorSet::from(GenerationError::new(
            ErrorKind::MalformedDescriptor,
            source.label.clone(),
            Entity::Interface,
            format!("invalid descriptor: {err}"),
        ))
    })?;

    let name = match raw.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(malformed(
                &source.label,
                Entity::Interface,
                "missing required field `name`",
            )
            .into());
        }
    };

    let mut checker = Checker {
        interface: name.clone(),
        errors: ErrorSet::new(),
    };
    checker.identifier(&name, Entity::Interface, "interface name");
    if let Some(class_name) = raw.class_name.as_deref() {
        checker.identifier(class_name, Entity::Interface, "class name");
    }

    let convention = match raw.convention.as_deref() {
        None => CallingConvention::default(),
        Some(spec) => CallingConvention::parse(spec).unwrap_or_else(|| {
            checker.fail(
                Entity::Interface,
                format!("unknown calling convention `{spec}` (expected c|system|stdcall)"),
            );
            CallingConvention::default()
        }),
    };
    let binding = match raw.binding.as_deref() {
        None => BindingMode::default(),
        Some(spec) => BindingMode::parse(spec).unwrap_or_else(|| {
            checker.fail(
                Entity::Interface,
                format!("unknown binding mode `{spec}` (expected static|dynamic)"),
            );
            BindingMode::default()
        }),
    };
    if raw.number == Some(0) {
        checker.fail(Entity::Interface, "registry numbers start at 1");
    }

    let types = checker.types(raw.types);
    let constants = checker.constants(raw.constants);
    let enum_extensions = checker.enum_extensions(raw.enums, raw.number);
    let functions = checker.functions(raw.functions);

    let library = raw
        .library
        .filter(|library| !library.trim().is_empty())
        .or_else(|| options.default_library.clone());
    if !functions.is_empty() && library.is_none() {
        checker.fail(
            Entity::Interface,
            "interface declares functions but no `library` binding",
        );
    }

    let descriptor = InterfaceDescriptor {
        name,
        class_name: raw.class_name,
        library,
        prefix: NativePrefix {
            constant: raw.prefix.constant,
            function: raw.prefix.function,
        },
        convention,
        binding,
        number: raw.number,
        documentation: trim_doc(&raw.documentation),
        types,
        constants,
        enum_extensions,
        functions,
        origin: source.path.clone(),
    };
    tracing::debug!(
        target: "pipeline",
        stage = "descriptor.load",
        interface = %descriptor.name,
        constants = descriptor.constants.len(),
        enums = descriptor.enum_extensions.len(),
        functions = descriptor.functions.len(),
        ok = checker.errors.is_empty()
    );
    checker.errors.finish(descriptor)
}

fn malformed(interface: &str, entity: Entity, message: impl Into<String>) -> GenerationError {
    GenerationError::new(ErrorKind::MalformedDescriptor, interface, entity, message)
}

/// Documentation is carried verbatim apart from the trailing newline of YAML block scalars.
fn trim_doc(doc: &str) -> String {
    doc.trim_end_matches(['\n', '\r']).to_string()
}

struct Checker {
    interface: String,
    errors: ErrorSet,
}

impl Checker {
    fn fail(&mut self, entity: Entity, message: impl Into<String>) {
        self.errors.push(malformed(&self.interface, entity, message));
    }

    fn identifier(&mut self, name: &str, entity: Entity, what: &str) -> bool {
        if IDENTIFIER.is_match(name) {
            true
        } else {
            self.fail(entity, format!("{what} `{name}` is not a valid C identifier"));
            false
        }
    }

    fn unique(&mut self, seen: &mut HashSet<String>, name: &str, entity: Entity, what: &str) {
        if !seen.insert(name.to_string()) {
            self.fail(entity, format!("{what} `{name}` is declared more than once"));
        }
    }

    fn type_token(&mut self, text: &str, entity: Entity) -> Option<TypeToken> {
        match TypeToken::parse(text) {
            Ok(token) => Some(token),
            Err(err) => {
                self.fail(entity, err.to_string());
                None
            }
        }
    }

    fn int_literal(&mut self, scalar: &RawScalar, entity: Entity) -> Option<IntLiteral> {
        match scalar {
            RawScalar::Int(value) => Some(IntLiteral::decimal(*value)),
            RawScalar::Text(text) => IntLiteral::parse(text).or_else(|| {
                self.fail(entity, format!("`{text}` is not an integer literal"));
                None
            }),
        }
    }

    fn types(&mut self, raw: Vec<RawType>) -> Vec<TypeDecl> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for ty in raw {
            let entity = || Entity::ty(ty.name.clone());
            self.identifier(&ty.name, entity(), "type name");
            self.unique(&mut seen, &ty.name, entity(), "type");
            let kind = ty.kind.to_ascii_lowercase();
            if kind != "struct" && !ty.members.is_empty() {
                self.fail(entity(), "only structs declare `members`");
            }
            if kind != "enum" && !ty.values.is_empty() {
                self.fail(entity(), "only enums declare `values`");
            }
            if kind != "handle" && ty.dispatchable.is_some() {
                self.fail(entity(), "only handles declare `dispatchable`");
            }
            let decl_kind = match kind.as_str() {
                "struct" => {
                    if ty.members.is_empty() {
                        self.fail(entity(), "struct declares no members");
                    }
                    let mut member_names = HashSet::new();
                    let mut members = Vec::with_capacity(ty.members.len());
                    for member in ty.members {
                        let member_entity = || Entity::member(ty.name.clone(), member.name.clone());
                        self.identifier(&member.name, member_entity(), "member name");
                        self.unique(&mut member_names, &member.name, member_entity(), "member");
                        if member.count == Some(0) {
                            self.fail(member_entity(), "array members need a positive `count`");
                        }
                        if let Some(token) = self.type_token(&member.ty, member_entity()) {
                            members.push(Member {
                                name: member.name,
                                ty: token,
                                array_len: member.count,
                                doc: trim_doc(&member.doc),
                            });
                        }
                    }
                    TypeDeclKind::Struct { members }
                }
                "enum" => {
                    let mut value_names = HashSet::new();
                    let mut values = Vec::with_capacity(ty.values.len());
                    for value in ty.values {
                        let value_entity = || Entity::enum_entry(value.name.clone());
                        self.identifier(&value.name, value_entity(), "enum value name");
                        self.unique(&mut value_names, &value.name, value_entity(), "enum value");
                        if let Some(literal) = self.int_literal(&value.value, value_entity()) {
                            values.push(EnumValueDecl {
                                name: value.name,
                                value: literal,
                                doc: trim_doc(&value.doc),
                            });
                        }
                    }
                    TypeDeclKind::Enum { values }
                }
                "handle" => TypeDeclKind::Handle {
                    dispatchable: ty.dispatchable.unwrap_or(true),
                },
                "opaque" => TypeDeclKind::Opaque,
                other => {
                    self.fail(
                        entity(),
                        format!("unknown type kind `{other}` (expected struct|enum|handle|opaque)"),
                    );
                    continue;
                }
            };
            out.push(TypeDecl {
                name: ty.name,
                doc: trim_doc(&ty.doc),
                kind: decl_kind,
            });
        }
        out
    }

    fn constants(&mut self, raw: Vec<RawConstant>) -> Vec<Constant> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for constant in raw {
            if let Some(parsed) = self.constant(constant, &mut seen) {
                out.push(parsed);
            }
        }
        out
    }

    fn constant(&mut self, raw: RawConstant, seen: &mut HashSet<String>) -> Option<Constant> {
        let entity = || Entity::constant(raw.name.clone());
        self.identifier(&raw.name, entity(), "constant name");
        self.unique(seen, &raw.name, entity(), "constant");

        let declared_kind = match raw.kind.as_deref() {
            None => None,
            Some("integer" | "int") => Some(ConstantKind::Integer),
            Some("string" | "str") => Some(ConstantKind::String),
            Some("expression" | "expr") => Some(ConstantKind::Expression),
            Some(other) => {
                self.fail(
                    entity(),
                    format!("unknown constant kind `{other}` (expected integer|string|expression)"),
                );
                return None;
            }
        };

        let declared_values = [
            raw.int.is_some(),
            raw.string.is_some(),
            raw.expr.is_some(),
            raw.reference.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        if declared_values != 1 {
            self.fail(
                entity(),
                "exactly one of `int`, `string`, `expr` or `ref` must be given",
            );
            return None;
        }

        let (value, literal_kind) = if let Some(scalar) = raw.int.as_ref() {
            (
                ConstantValue::Int(self.int_literal(scalar, entity())?),
                Some(ConstantKind::Integer),
            )
        } else if let Some(text) = raw.string {
            if text.contains('\0') {
                self.fail(entity(), "string constants cannot contain NUL");
                return None;
            }
            (ConstantValue::Str(text), Some(ConstantKind::String))
        } else if let Some(expr) = raw.expr {
            if expr.trim().is_empty() {
                self.fail(entity(), "expression constants cannot be empty");
                return None;
            }
            (
                ConstantValue::Expr(expr.trim().to_string()),
                Some(ConstantKind::Expression),
            )
        } else {
            let target = raw.reference.unwrap_or_default();
            let reference = ConstantRef::parse(&target);
            if reference.name == raw.name && reference.interface.is_none() {
                self.fail(entity(), "a constant cannot refer to itself");
                return None;
            }
            (ConstantValue::Ref(reference), None)
        };

        if let (Some(declared), Some(literal)) = (declared_kind, literal_kind) {
            if declared != literal {
                self.fail(
                    entity(),
                    format!(
                        "declared as {} but given a {} value",
                        declared.as_str(),
                        literal.as_str()
                    ),
                );
                return None;
            }
        }

        let ty = match raw.ty.as_deref() {
            Some(text) => Some(self.type_token(text, entity())?),
            None => None,
        };

        Some(Constant {
            name: raw.name,
            doc: trim_doc(&raw.doc),
            ty,
            kind: declared_kind.or(literal_kind),
            value,
        })
    }

    fn enum_extensions(
        &mut self,
        raw: Vec<RawEnumExtension>,
        number: Option<u32>,
    ) -> Vec<EnumExtension> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            let entity = || Entity::enum_entry(entry.name.clone());
            self.identifier(&entry.name, entity(), "enum entry name");
            self.identifier(&entry.extends, entity(), "extended enum");
            self.unique(&mut seen, &entry.name, entity(), "enum entry");
            let value = match (entry.value.as_ref(), entry.offset) {
                (Some(scalar), None) => {
                    if entry.negative {
                        self.fail(entity(), "`negative` only applies to `offset` values");
                    }
                    match self.int_literal(scalar, entity()) {
                        Some(literal) => EnumExtensionValue::Literal(literal),
                        None => continue,
                    }
                }
                (None, Some(offset)) => {
                    if number.is_none() {
                        self.fail(
                            entity(),
                            "`offset` values need the interface registry `number`",
                        );
                        continue;
                    }
                    EnumExtensionValue::Offset {
                        offset,
                        negative: entry.negative,
                    }
                }
                _ => {
                    self.fail(entity(), "exactly one of `value` or `offset` must be given");
                    continue;
                }
            };
            out.push(EnumExtension {
                name: entry.name,
                extends: entry.extends,
                doc: trim_doc(&entry.doc),
                value,
            });
        }
        out
    }

    fn functions(&mut self, raw: Vec<RawFunction>) -> Vec<Function> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());
        for function in raw {
            let entity = || Entity::function(function.name.clone());
            self.identifier(&function.name, entity(), "function name");
            self.unique(&mut seen, &function.name, entity(), "function");
            let returns = match function.returns.as_deref() {
                Some(text) => match self.type_token(text, entity()) {
                    Some(token) => token,
                    None => continue,
                },
                None => TypeToken::void(),
            };
            let mut param_names = HashSet::new();
            let mut params = Vec::with_capacity(function.params.len());
            for param in function.params {
                if let Some(parsed) = self.parameter(&function.name, param, &mut param_names) {
                    params.push(parsed);
                }
            }
            out.push(Function {
                name: function.name,
                returns,
                params,
                doc: trim_doc(&function.doc),
                return_doc: function.return_doc.as_deref().map(trim_doc),
            });
        }
        out
    }

    fn parameter(
        &mut self,
        function: &str,
        raw: RawParam,
        seen: &mut HashSet<String>,
    ) -> Option<Parameter> {
        let entity = || Entity::parameter(function, raw.name.clone());
        self.identifier(&raw.name, entity(), "parameter name");
        self.unique(seen, &raw.name, entity(), "parameter");
        let token = self.type_token(&raw.ty, entity())?;

        let mut modifiers = ParamModifiers::derived_from(&token);
        for keyword in &raw.modifiers {
            match ParamModifiers::parse_keyword(keyword) {
                Some(flag) => modifiers |= flag,
                None => self.fail(entity(), format!("unknown modifier `{keyword}`")),
            }
        }
        if modifiers.contains(ParamModifiers::CONST) && !token.is_pointer() {
            self.fail(entity(), "`const` modifier needs a pointer type");
        }
        if raw.length_of.is_some() && raw.length.is_some() {
            self.fail(
                entity(),
                "a parameter cannot both carry a length and have one carried",
            );
            return None;
        }
        if let Some(elements) = raw.check {
            if elements == 0 {
                self.fail(entity(), "`check` needs a positive element count");
            }
            if !token.is_pointer() {
                self.fail(entity(), "`check` needs a pointer type");
            }
            if raw.length.is_some() || raw.length_of.is_some() {
                self.fail(entity(), "`check` cannot be combined with `length` or `length_of`");
            }
        }
        if raw.returned_length {
            if !token.is_pointer() {
                self.fail(entity(), "`returned_length` needs a pointer type");
            }
            if raw.length_of.is_some() {
                self.fail(entity(), "a length carrier cannot have its length returned");
            }
        } else if raw.includes_nul {
            self.fail(entity(), "`includes_nul` needs `returned_length`");
        }

        let mut parameter = Parameter {
            name: raw.name,
            ty: token,
            modifiers,
            length_of: None,
            length: None,
            check: raw.check,
            returned_length: None,
            doc: trim_doc(&raw.doc),
        };
        if let Some(sibling) = raw.length_of {
            parameter = parameter.carrying_length_of(sibling);
        }
        if let Some(sibling) = raw.length {
            parameter = parameter.with_length(sibling);
        }
        if raw.returned_length {
            parameter = parameter.returning_length(if raw.includes_nul {
                ReturnedLength::IncludingNul
            } else {
                ReturnedLength::Elements
            });
        }
        Some(parameter)
    }
}
