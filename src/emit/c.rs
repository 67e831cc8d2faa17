//! C target: a guarded header with typedefs, `#define`s and prototypes.

use crate::descriptor::{BindingMode, CallingConvention, TypeDeclKind};
use crate::link::{
    ImportOrigin, LinkedConstant, LinkedEnumEntry, LinkedFunction, LinkedInterface, LinkedType,
    ResolvedValue,
};
use crate::types::{Access, PointerWidth, Scalar, TargetType};

use super::doc::{c_doc, function_doc};
use super::infer_scalar;

/// Simplified C type descriptor: a base name behind `pointer_level` stars, with `const`
/// applying to the base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct CType {
    base: String,
    pointer_level: usize,
    is_const: bool,
}

impl CType {
    pub(super) fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            pointer_level: 0,
            is_const: false,
        }
    }

    pub(super) fn from_target(ty: &TargetType) -> Self {
        match ty {
            TargetType::Void => Self::new("void"),
            TargetType::Scalar(scalar) => Self::new(scalar.c_name()),
            TargetType::Named { name, .. } => Self::new(name.as_str()),
            TargetType::Pointer { pointee, access } => {
                let mut inner = Self::from_target(pointee);
                if inner.pointer_level == 0 && *access == Access::Const {
                    inner.is_const = true;
                }
                inner.pointer_level += 1;
                inner
            }
            TargetType::Unmappable { native, .. } => Self::new(native.as_str()),
        }
    }

    pub(super) fn render_return(&self) -> String {
        let const_prefix = if self.is_const { "const " } else { "" };
        if self.pointer_level == 0 {
            format!("{const_prefix}{}", self.base)
        } else {
            let ptrs = "*".repeat(self.pointer_level);
            format!("{const_prefix}{} {}", self.base, ptrs)
        }
    }

    pub(super) fn render_declarator(&self, name: &str) -> String {
        let const_prefix = if self.is_const { "const " } else { "" };
        if self.pointer_level == 0 {
            format!("{const_prefix}{} {}", self.base, name)
        } else {
            let ptrs = "*".repeat(self.pointer_level);
            format!("{const_prefix}{} {}{}", self.base, ptrs, name)
        }
    }
}

pub(super) fn include_guard(unit: &str) -> String {
    format!("NATBIND_{}_H", super::snake_case(unit).to_ascii_uppercase())
}

pub(super) fn render(linked: &LinkedInterface<'_>) -> String {
    let descriptor = linked.descriptor;
    let guard = include_guard(descriptor.unit_name());
    let mut out = format!("#ifndef {guard}\n#define {guard}\n");

    if !descriptor.documentation.is_empty() {
        out.push('\n');
        c_doc(&mut out, "", &descriptor.documentation);
    }

    out.push_str("\n#include <stdbool.h>\n#include <stddef.h>\n#include <stdint.h>\n");
    let mut units: Vec<&str> = linked
        .imports
        .iter()
        .filter_map(|import| match &import.origin {
            ImportOrigin::Interface { unit, .. } => Some(unit.as_str()),
            ImportOrigin::Manifest => None,
        })
        .collect();
    units.sort_unstable();
    units.dedup();
    for unit in units {
        out.push_str(&format!("#include \"{unit}.h\"\n"));
    }

    let uses_apientry = !linked.functions.is_empty()
        && descriptor.convention != CallingConvention::C;
    if uses_apientry {
        out.push_str(
            "\n#ifndef NATBIND_APIENTRY\n#  if defined(_WIN32)\n#    define NATBIND_APIENTRY __stdcall\n#  else\n#    define NATBIND_APIENTRY\n#  endif\n#endif\n",
        );
    }

    out.push_str("\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n");

    let structs: Vec<&str> = linked
        .types
        .iter()
        .filter(|ty| matches!(ty.decl.kind, TypeDeclKind::Struct { .. }))
        .map(|ty| ty.decl.name.as_str())
        .collect();
    if !structs.is_empty() {
        out.push('\n');
        for name in structs {
            out.push_str(&format!("typedef struct {name} {name};\n"));
        }
    }

    for ty in &linked.types {
        out.push('\n');
        type_block(&mut out, ty, linked.pointer_width);
    }

    if !linked.constants.is_empty() {
        out.push('\n');
        for constant in &linked.constants {
            constant_define(&mut out, constant);
        }
    }

    if !linked.enum_entries.is_empty() {
        out.push('\n');
        for entry in &linked.enum_entries {
            extension_define(&mut out, entry);
        }
    }

    if !linked.functions.is_empty() {
        if descriptor.binding == BindingMode::Dynamic {
            if let Some(library) = &descriptor.library {
                out.push_str(&format!(
                    "\n#define {}_LIBRARY \"{}\"\n",
                    guard.strip_suffix("_H").unwrap_or(&guard),
                    escape(library)
                ));
            }
        }
        let apientry = if uses_apientry { "NATBIND_APIENTRY " } else { "" };
        for function in &linked.functions {
            out.push('\n');
            function_decl(&mut out, function, descriptor.binding, apientry);
        }
    }

    out.push_str("\n#ifdef __cplusplus\n}\n#endif\n");
    out.push_str(&format!("\n#endif /* {guard} */\n"));
    out
}

fn type_block(out: &mut String, ty: &LinkedType<'_>, width: PointerWidth) {
    let decl = ty.decl;
    c_doc(out, "", &decl.doc);
    match &decl.kind {
        TypeDeclKind::Struct { .. } => {
            out.push_str(&format!("struct {} {{\n", decl.name));
            for member in &ty.members {
                c_doc(out, "    ", &member.member.doc);
                let declarator = CType::from_target(&member.ty).render_declarator(&member.member.name);
                match member.member.array_len {
                    Some(len) => out.push_str(&format!("    {declarator}[{len}];\n")),
                    None => out.push_str(&format!("    {declarator};\n")),
                }
            }
            out.push_str("};\n");
            if let Some(layout) = &ty.layout {
                let max = match width {
                    PointerWidth::W32 => "0xFFFFFFFFu",
                    PointerWidth::W64 => "0xFFFFFFFFFFFFFFFFu",
                };
                out.push_str(&format!(
                    "#if UINTPTR_MAX == {max}\n_Static_assert(sizeof({name}) == {} && _Alignof({name}) == {}, \"{name} layout\");\n#endif\n",
                    layout.size,
                    layout.align,
                    name = decl.name
                ));
            }
        }
        TypeDeclKind::Enum { values } => {
            out.push_str(&format!("typedef int32_t {};\n", decl.name));
            for value in values {
                c_doc(out, "", &value.doc);
                out.push_str(&format!(
                    "#define {} (({}){})\n",
                    value.name, decl.name, value.value
                ));
            }
        }
        TypeDeclKind::Handle { dispatchable: true } => {
            out.push_str(&format!("typedef struct {name}_T *{name};\n", name = decl.name));
        }
        TypeDeclKind::Handle { dispatchable: false } => {
            out.push_str(&format!("typedef uint64_t {};\n", decl.name));
        }
        TypeDeclKind::Opaque => {
            out.push_str(&format!("typedef struct {name} {name};\n", name = decl.name));
        }
    }
}

fn constant_define(out: &mut String, constant: &LinkedConstant<'_>) {
    c_doc(out, "", &constant.constant.doc);
    let name = &constant.native_name;
    let value = match (&constant.value, &constant.ty) {
        (ResolvedValue::Int(literal), Some(ty)) => {
            format!("(({}){literal})", CType::from_target(ty).render_return())
        }
        (ResolvedValue::Int(literal), None) => {
            let suffix = match infer_scalar(*literal) {
                Scalar::U32 => "u",
                Scalar::I64 => "LL",
                Scalar::U64 => "ULL",
                _ => "",
            };
            format!("{literal}{suffix}")
        }
        (ResolvedValue::Str(text), _) => format!("\"{}\"", escape(text)),
        (ResolvedValue::Expr(expr), Some(ty)) => {
            format!("(({})({expr}))", CType::from_target(ty).render_return())
        }
        (ResolvedValue::Expr(expr), None) => format!("({expr})"),
    };
    out.push_str(&format!("#define {name} {value}\n"));
}

fn extension_define(out: &mut String, entry: &LinkedEnumEntry<'_>) {
    c_doc(out, "", &entry.entry.doc);
    out.push_str(&format!(
        "#define {} (({}){})\n",
        entry.native_name, entry.entry.extends, entry.value
    ));
}

fn function_decl(
    out: &mut String,
    function: &LinkedFunction<'_>,
    binding: BindingMode,
    apientry: &str,
) {
    let text = function_doc(
        &function.function.doc,
        &function.params,
        function.function.return_doc.as_deref(),
    );
    c_doc(out, "", &text);
    let params = if function.params.is_empty() {
        "void".to_string()
    } else {
        function
            .params
            .iter()
            .map(|param| CType::from_target(&param.ty).render_declarator(&param.param.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let returns = CType::from_target(&function.returns).render_return();
    match binding {
        BindingMode::Static => out.push_str(&format!(
            "{returns} {apientry}{}({params});\n",
            function.native_name
        )),
        BindingMode::Dynamic => out.push_str(&format!(
            "typedef {returns} ({apientry}*PFN_{})({params});\n",
            function.native_name
        )),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'"' => escaped.push_str("\\\""),
            b'\\' => escaped.push_str("\\\\"),
            b'\n' => escaped.push_str("\\n"),
            b'\r' => escaped.push_str("\\r"),
            b'\t' => escaped.push_str("\\t"),
            0x20..=0x7e => escaped.push(char::from(byte)),
            other => escaped.push_str(&format!("\\{other:03o}")),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pointer_declarators() {
        let ty = TargetType::pointer_to(
            TargetType::pointer_to(TargetType::Scalar(Scalar::Char), Access::Const),
            Access::Mut,
        );
        let ctype = CType::from_target(&ty);
        assert_eq!(ctype.render_return(), "const char **");
        assert_eq!(ctype.render_declarator("ppNames"), "const char **ppNames");
        assert_eq!(CType::new("uint32_t").render_declarator("count"), "uint32_t count");
    }

    #[test]
    fn const_applies_to_base_only_at_the_innermost_level() {
        let ty = TargetType::pointer_to(TargetType::Scalar(Scalar::F32), Access::Mut);
        assert_eq!(CType::from_target(&ty).render_return(), "float *");
    }

    #[test]
    fn guards_use_the_snake_cased_unit() {
        assert_eq!(include_guard("VRCompositor"), "NATBIND_VR_COMPOSITOR_H");
    }

    #[test]
    fn escapes_non_ascii_as_octal() {
        assert_eq!(escape("é\""), "\\303\\251\\\"");
    }
}
