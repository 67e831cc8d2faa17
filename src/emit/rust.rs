//! Rust target: `#[repr(C)]` declarations plus an extern block or a function table.

use crate::descriptor::{BindingMode, TypeDeclKind};
use crate::link::{
    ImportOrigin, LinkedConstant, LinkedEnumEntry, LinkedFunction, LinkedInterface, LinkedType,
    ResolvedValue,
};
use crate::types::{Access, NamedKind, PointerWidth, Scalar, TargetType};

use super::doc::{function_doc, rust_doc, rust_module_doc};
use super::{infer_scalar, rust_int, snake_case};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Identifier usable in Rust source. `self`-like words cannot be raw and get a trailing `_`.
pub(super) fn ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{name}_"),
        _ if KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_string(),
    }
}

pub(super) fn render(linked: &LinkedInterface<'_>) -> String {
    let descriptor = linked.descriptor;
    let mut out = String::new();
    if !descriptor.documentation.is_empty() {
        rust_module_doc(&mut out, &descriptor.documentation);
        out.push('\n');
    }
    out.push_str(
        "#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]\n",
    );

    let mut blocks: Vec<String> = Vec::new();
    if !linked.imports.is_empty() {
        let mut uses = String::new();
        for import in &linked.imports {
            match &import.origin {
                ImportOrigin::Interface { unit, .. } => {
                    uses.push_str(&format!("use super::{}::{};\n", snake_case(unit), import.name));
                }
                ImportOrigin::Manifest => uses.push_str(&format!("use super::{};\n", import.name)),
            }
        }
        blocks.push(uses);
    }
    for ty in &linked.types {
        blocks.push(type_block(ty, linked.pointer_width));
    }
    if !linked.constants.is_empty() {
        let mut constants = String::new();
        for constant in &linked.constants {
            constant_item(&mut constants, constant, linked.pointer_width);
        }
        blocks.push(constants);
    }
    for run in linked
        .enum_entries
        .chunk_by(|a, b| a.entry.extends == b.entry.extends)
    {
        blocks.push(extension_block(run, linked.pointer_width));
    }
    if !linked.functions.is_empty() {
        blocks.push(match descriptor.binding {
            BindingMode::Static => extern_block(linked),
            BindingMode::Dynamic => function_table(linked),
        });
    }

    for block in blocks {
        out.push('\n');
        out.push_str(&block);
    }
    out
}

/// Type as written in a declaration; `void` only appears behind pointers.
pub(super) fn type_name(ty: &TargetType) -> String {
    match ty {
        TargetType::Void => "::core::ffi::c_void".to_string(),
        TargetType::Scalar(scalar) => scalar.rust_name().to_string(),
        TargetType::Named { name, .. } => name.clone(),
        TargetType::Pointer { pointee, access } => match access {
            Access::Const => format!("*const {}", type_name(pointee)),
            Access::Mut => format!("*mut {}", type_name(pointee)),
        },
        // Rejected before rendering.
        TargetType::Unmappable { native, .. } => native.clone(),
    }
}

fn type_block(ty: &LinkedType<'_>, width: PointerWidth) -> String {
    let decl = ty.decl;
    let mut out = String::new();
    rust_doc(&mut out, "", &decl.doc);
    match &decl.kind {
        TypeDeclKind::Struct { .. } => {
            out.push_str("#[repr(C)]\n#[derive(Clone, Copy, Debug)]\n");
            out.push_str(&format!("pub struct {} {{\n", decl.name));
            for member in &ty.members {
                rust_doc(&mut out, "    ", &member.member.doc);
                let field = type_name(&member.ty);
                let field = match member.member.array_len {
                    Some(len) => format!("[{field}; {len}]"),
                    None => field,
                };
                out.push_str(&format!("    pub {}: {field},\n", ident(&member.member.name)));
            }
            out.push_str("}\n");
            if let Some(layout) = &ty.layout {
                out.push_str(&format!(
                    "\n#[cfg(target_pointer_width = \"{}\")]\nconst _: () = assert!(\n    ::core::mem::size_of::<{name}>() == {}\n        && ::core::mem::align_of::<{name}>() == {}\n);\n",
                    width.bits(),
                    layout.size,
                    layout.align,
                    name = decl.name,
                ));
            }
        }
        TypeDeclKind::Enum { values } => {
            out.push_str(
                "#[repr(transparent)]\n#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]\n",
            );
            out.push_str(&format!("pub struct {}(pub i32);\n", decl.name));
            if !values.is_empty() {
                out.push_str(&format!("\nimpl {} {{\n", decl.name));
                for value in values {
                    rust_doc(&mut out, "    ", &value.doc);
                    out.push_str(&format!(
                        "    pub const {}: Self = Self({});\n",
                        ident(&value.name),
                        rust_int(value.value, Scalar::I32, width)
                    ));
                }
                out.push_str("}\n");
            }
        }
        TypeDeclKind::Handle { dispatchable: true } => {
            out.push_str(&format!(
                "pub type {name} = *mut {name}_T;\n\n#[repr(C)]\npub struct {name}_T {{\n    _private: [u8; 0],\n}}\n",
                name = decl.name
            ));
        }
        TypeDeclKind::Handle { dispatchable: false } => {
            out.push_str(&format!("pub type {} = u64;\n", decl.name));
        }
        TypeDeclKind::Opaque => {
            out.push_str(&format!(
                "#[repr(C)]\npub struct {} {{\n    _private: [u8; 0],\n}}\n",
                decl.name
            ));
        }
    }
    out
}

fn constant_item(out: &mut String, constant: &LinkedConstant<'_>, width: PointerWidth) {
    rust_doc(out, "", &constant.constant.doc);
    let name = ident(&constant.native_name);
    match (&constant.value, &constant.ty) {
        (ResolvedValue::Int(literal), Some(ty @ TargetType::Named { kind: NamedKind::Enum, .. })) => {
            out.push_str(&format!(
                "pub const {name}: {ty} = {ty}({});\n",
                rust_int(*literal, Scalar::I32, width),
                ty = type_name(ty)
            ));
        }
        (ResolvedValue::Int(literal), ty) => {
            let scalar = ty
                .as_ref()
                .and_then(TargetType::integer_scalar)
                .unwrap_or_else(|| infer_scalar(*literal));
            out.push_str(&format!(
                "pub const {name}: {} = {};\n",
                scalar.rust_name(),
                rust_int(*literal, scalar, width)
            ));
        }
        (ResolvedValue::Str(text), _) => {
            out.push_str(&format!(
                "pub const {name}: &::core::ffi::CStr = c\"{}\";\n",
                escape(text)
            ));
        }
        (ResolvedValue::Expr(expr), Some(ty)) => {
            out.push_str(&format!("pub const {name}: {} = {expr};\n", type_name(ty)));
        }
        // Rejected before rendering.
        (ResolvedValue::Expr(expr), None) => {
            out.push_str(&format!("pub const {name}: i32 = {expr};\n"));
        }
    }
}

fn extension_block(run: &[LinkedEnumEntry<'_>], width: PointerWidth) -> String {
    let mut out = String::new();
    let Some(first) = run.first() else {
        return out;
    };
    out.push_str(&format!("impl {} {{\n", first.entry.extends));
    for entry in run {
        rust_doc(&mut out, "    ", &entry.entry.doc);
        out.push_str(&format!(
            "    pub const {}: Self = Self({});\n",
            ident(&entry.native_name),
            rust_int(entry.value, Scalar::I32, width)
        ));
    }
    out.push_str("}\n");
    out
}

fn signature(function: &LinkedFunction<'_>) -> (String, String) {
    let params = function
        .params
        .iter()
        .map(|param| format!("{}: {}", ident(&param.param.name), type_name(&param.ty)))
        .collect::<Vec<_>>()
        .join(", ");
    let returns = if function.returns.is_void() {
        String::new()
    } else {
        format!(" -> {}", type_name(&function.returns))
    };
    (params, returns)
}

fn docs(out: &mut String, indent: &str, function: &LinkedFunction<'_>) {
    let text = function_doc(
        &function.function.doc,
        &function.params,
        function.function.return_doc.as_deref(),
    );
    rust_doc(out, indent, &text);
}

fn extern_block(linked: &LinkedInterface<'_>) -> String {
    let descriptor = linked.descriptor;
    let mut out = String::new();
    if let Some(library) = &descriptor.library {
        out.push_str(&format!("#[link(name = \"{}\")]\n", escape(library)));
    }
    out.push_str(&format!(
        "unsafe extern \"{}\" {{\n",
        descriptor.convention.as_str()
    ));
    for (index, function) in linked.functions.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        docs(&mut out, "    ", function);
        let (params, returns) = signature(function);
        out.push_str(&format!(
            "    pub fn {}({params}){returns};\n",
            function.native_name
        ));
    }
    out.push_str("}\n");
    out
}

fn function_table(linked: &LinkedInterface<'_>) -> String {
    let descriptor = linked.descriptor;
    let convention = descriptor.convention.as_str();
    let table = format!("{}Fns", descriptor.unit_name());
    let mut out = String::new();

    for function in &linked.functions {
        docs(&mut out, "", function);
        let (params, returns) = signature(function);
        out.push_str(&format!(
            "pub type PFN_{} = unsafe extern \"{convention}\" fn({params}){returns};\n\n",
            function.native_name
        ));
    }

    out.push_str(&format!(
        "/// Entry points of `{}`, resolved at runtime.\n#[derive(Clone, Copy, Default)]\npub struct {table} {{\n",
        descriptor.name
    ));
    for function in &linked.functions {
        out.push_str(&format!(
            "    pub {}: Option<PFN_{}>,\n",
            function.native_name, function.native_name
        ));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {table} {{\n"));
    let library = descriptor.library.as_deref().unwrap_or_default();
    out.push_str(&format!(
        "    /// Library identifier handed to the lookup.\n    pub const LIBRARY: &'static str = \"{}\";\n\n",
        escape(library)
    ));
    out.push_str(
        "    /// Resolve every entry point with `lookup(library, symbol)`.\n    ///\n    /// A null result leaves the entry `None`.\n",
    );
    out.push_str(
        "    pub fn load(mut lookup: impl FnMut(&str, &str) -> *const ::core::ffi::c_void) -> Self {\n        Self {\n",
    );
    for function in &linked.functions {
        let name = &function.native_name;
        out.push_str(&format!(
            "            {name}: unsafe {{\n                ::core::mem::transmute::<*const ::core::ffi::c_void, Option<PFN_{name}>>(lookup(\n                    Self::LIBRARY,\n                    \"{name}\",\n                ))\n            }},\n"
        ));
    }
    out.push_str("        }\n    }\n}\n");
    out
}

/// Escape for a Rust string or C-string literal.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            ch if ch.is_control() => escaped.push_str(&format!("\\u{{{:x}}}", u32::from(ch))),
            ch => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_keywords() {
        assert_eq!(ident("type"), "r#type");
        assert_eq!(ident("self"), "self_");
        assert_eq!(ident("pDevice"), "pDevice");
    }

    #[test]
    fn escapes_string_literals() {
        assert_eq!(escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    }
}
