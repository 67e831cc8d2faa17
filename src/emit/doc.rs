//! Documentation blocks, copied line by line without reflowing.

use crate::descriptor::{ParamModifiers, ReturnedLength};
use crate::link::LinkedParameter;
use crate::types::ParamRole;

pub(super) fn rust_doc(out: &mut String, indent: &str, text: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push_str(&format!("{indent}///\n"));
        } else {
            out.push_str(&format!("{indent}/// {line}\n"));
        }
    }
}

pub(super) fn rust_module_doc(out: &mut String, text: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push_str("//!\n");
        } else {
            out.push_str(&format!("//! {line}\n"));
        }
    }
}

pub(super) fn c_doc(out: &mut String, indent: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(&format!("{indent}/*\n"));
    for line in text.lines() {
        let line = line.replace("*/", "* /");
        if line.is_empty() {
            out.push_str(&format!("{indent} *\n"));
        } else {
            out.push_str(&format!("{indent} * {line}\n"));
        }
    }
    out.push_str(&format!("{indent} */\n"));
}

/// Function documentation followed by one entry per parameter and the return note.
pub(super) fn function_doc(
    doc: &str,
    params: &[LinkedParameter<'_>],
    return_doc: Option<&str>,
) -> String {
    let mut text = doc.to_string();
    let described: Vec<_> = params
        .iter()
        .filter(|param| !param.param.doc.is_empty() || !qualifiers(param).is_empty())
        .collect();
    if !described.is_empty() {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str("# Parameters\n");
        for param in described {
            text.push_str(&format!("\n- `{}`", param.param.name));
            let qualifiers = qualifiers(param);
            if !qualifiers.is_empty() {
                text.push_str(&format!(" ({qualifiers})"));
            }
            if !param.param.doc.is_empty() {
                let mut lines = param.param.doc.lines();
                if let Some(first) = lines.next() {
                    text.push_str(&format!(": {first}"));
                }
                for line in lines {
                    text.push_str(&format!("\n  {line}"));
                }
            }
        }
    }
    if let Some(returns) = return_doc.filter(|returns| !returns.is_empty()) {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&format!("Returns {returns}"));
    }
    text
}

fn qualifiers(param: &LinkedParameter<'_>) -> String {
    let mut words: Vec<String> = Vec::new();
    match param.role {
        ParamRole::Output => words.push("out".into()),
        ParamRole::OutputBuffer => words.push("out buffer".into()),
        _ => {}
    }
    let documented = param.param.modifiers & (ParamModifiers::NULLABLE | ParamModifiers::NULL_TERMINATED);
    words.extend(documented.keywords().into_iter().map(String::from));
    if let Some(carrier) = &param.carrier {
        words.push(format!("length in `{carrier}`"));
    }
    if let Some(buffer) = &param.param.length_of {
        words.push(format!("length of `{buffer}`"));
    }
    match param.param.check {
        Some(1) => words.push("at least 1 element".into()),
        Some(elements) => words.push(format!("at least {elements} elements")),
        None => {}
    }
    match param.param.returned_length {
        Some(ReturnedLength::Elements) => words.push("length returned".into()),
        Some(ReturnedLength::IncludingNul) => words.push("length returned, including NUL".into()),
        None => {}
    }
    words.join(", ")
}
