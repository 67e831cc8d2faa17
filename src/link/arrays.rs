//! Validation of array-length carrier bindings between sibling parameters.

use std::collections::HashMap;

use crate::descriptor::{Function, ParamModifiers, Parameter};
use crate::diagnostics::{Entity, ErrorKind, ErrorSet, GenerationError};
use crate::types::TargetType;

/// A buffer parameter and the sibling carrying its element count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayBinding {
    pub buffer: String,
    pub carrier: String,
}

struct Declared<'f> {
    buffer: &'f Parameter,
    carrier: &'f Parameter,
    /// Parameter whose `length`/`length_of` key introduced the pairing.
    declared_by: &'f str,
}

/// Check every `length`/`length_of` pairing of `function` and its returned-length buffer.
///
/// `resolved` maps parameter names to the types that resolved; parameters missing from it
/// already failed with `UnknownType` and are not checked again. The same holds for an
/// unresolved `returns`.
pub(super) fn bind_arrays(
    interface: &str,
    function: &Function,
    returns: Option<&TargetType>,
    resolved: &HashMap<&str, TargetType>,
    errors: &mut ErrorSet,
) -> Vec<ArrayBinding> {
    let mut fail = |param: &str, message: String| {
        errors.push(GenerationError::new(
            ErrorKind::InvalidArraySizeBinding,
            interface,
            Entity::parameter(function.name.clone(), param),
            message,
        ));
    };

    let mut returned: Option<&str> = None;
    for param in function.params.iter().filter(|param| param.returned_length.is_some()) {
        if let Some(first) = returned {
            fail(
                &param.name,
                format!("`{first}` already takes its length from the return value"),
            );
            continue;
        }
        returned = Some(param.name.as_str());
        if returns.is_some_and(|ty| !ty.is_integer()) {
            fail(
                &param.name,
                format!("`{}` must return an integer to report a buffer length", function.name),
            );
        }
        if resolved.get(param.name.as_str()).is_some_and(|ty| !ty.is_pointer()) {
            fail(&param.name, "a returned length needs a pointer buffer".into());
        }
        if param.length_of.is_some() {
            fail(&param.name, "a length carrier cannot have its length returned".into());
        }
    }

    let mut declared = Vec::new();
    for param in &function.params {
        if let Some(target) = &param.length_of {
            if *target == param.name {
                fail(&param.name, "a parameter cannot carry its own length".into());
                continue;
            }
            if param.length.is_some() || param.modifiers.contains(ParamModifiers::ARRAY) {
                fail(&param.name, "an array cannot carry another buffer's length".into());
                continue;
            }
            let Some(buffer) = function.param(target) else {
                fail(
                    &param.name,
                    format!("`{target}` is not a parameter of `{}`", function.name),
                );
                continue;
            };
            if buffer.length_of.is_some() {
                fail(
                    &param.name,
                    format!("`{target}` is itself a length carrier and cannot be a buffer"),
                );
                continue;
            }
            if let Some(other) = buffer.length.as_ref().filter(|other| **other != param.name) {
                fail(
                    &param.name,
                    format!("`{target}` already takes its length from `{other}`"),
                );
                continue;
            }
            declared.push(Declared {
                buffer,
                carrier: param,
                declared_by: &param.name,
            });
        }
        if let Some(source) = &param.length {
            if *source == param.name {
                fail(&param.name, "a buffer cannot carry its own length".into());
                continue;
            }
            let Some(carrier) = function.param(source) else {
                fail(
                    &param.name,
                    format!("`{source}` is not a parameter of `{}`", function.name),
                );
                continue;
            };
            if carrier.length.is_some() || carrier.modifiers.contains(ParamModifiers::ARRAY) {
                fail(
                    &param.name,
                    format!("`{source}` is itself an array and cannot carry a length"),
                );
                continue;
            }
            if let Some(other) = carrier.length_of.as_ref() {
                if *other != param.name {
                    fail(
                        &param.name,
                        format!("`{source}` already carries the length of `{other}`"),
                    );
                }
                // Declared from the carrier side as well; checked there.
                continue;
            }
            declared.push(Declared {
                buffer: param,
                carrier,
                declared_by: &param.name,
            });
        }
    }

    let mut carriers: HashMap<&str, &str> = HashMap::new();
    let mut bindings = Vec::new();
    for pairing in declared {
        let buffer = pairing.buffer.name.as_str();
        let carrier = pairing.carrier.name.as_str();
        match carriers.get(buffer) {
            Some(existing) if *existing != carrier => {
                fail(
                    pairing.declared_by,
                    format!("`{buffer}` has more than one length carrier (`{existing}`, `{carrier}`)"),
                );
                continue;
            }
            Some(_) => continue,
            None => {}
        }
        carriers.insert(buffer, carrier);

        let mut valid = true;
        if let Some(ty) = resolved.get(carrier) {
            if !is_count(pairing.carrier, ty) {
                fail(
                    pairing.declared_by,
                    format!(
                        "length carrier `{carrier}` must be an integer, or a pointer to an integer marked `out`"
                    ),
                );
                valid = false;
            }
        }
        if let Some(ty) = resolved.get(buffer) {
            if !ty.is_pointer() {
                fail(
                    pairing.declared_by,
                    format!("`{buffer}` has a length carrier but is not a pointer"),
                );
                valid = false;
            }
        }
        if valid {
            bindings.push(ArrayBinding {
                buffer: buffer.to_string(),
                carrier: carrier.to_string(),
            });
        }
    }
    bindings
}

fn is_count(carrier: &Parameter, ty: &TargetType) -> bool {
    match ty {
        TargetType::Scalar(scalar) => scalar.is_integer(),
        TargetType::Pointer { pointee, .. } => {
            carrier.modifiers.contains(ParamModifiers::OUTPUT) && pointee.is_integer()
        }
        _ => false,
    }
}
