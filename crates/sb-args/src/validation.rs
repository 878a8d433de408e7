//! Validation and coercion against declared arg types
//!
//! - [`validate`]: drops changes that violate a declared `options` list
//! - [`map_to_declared_types`]: coerces raw (URL-decoded) values into the
//!   representation implied by each arg's declared type

use crate::arg_types::{ArgType, ArgTypes, SbType};
use crate::delta::{ArgsPatch, Change, Slot};
use crate::value::{ArgValue, Args};

/// Validate a patch against declared options
///
/// Keys without an arg type, or whose arg type declares no options, pass
/// unchanged. Illegal values are dropped with a warning.
#[must_use]
pub fn validate(patch: &ArgsPatch, arg_types: &ArgTypes) -> ArgsPatch {
    patch
        .iter()
        .filter(|(key, change)| match arg_types.get(key.as_str()) {
            Some(arg_type) => change_allowed(key, change, arg_type),
            None => true,
        })
        .map(|(k, c)| (k.clone(), c.clone()))
        .collect()
}

fn change_allowed(key: &str, change: &Change, arg_type: &ArgType) -> bool {
    let Some(options) = arg_type.options.as_deref() else {
        return true;
    };

    if options.iter().any(|opt| !opt.is_scalar()) {
        tracing::error!(
            arg = key,
            "options for arg '{key}' must be scalars; skipping options validation"
        );
        return true;
    }

    match first_illegal(change, options) {
        None => true,
        Some(index) => {
            let field = match index {
                Some(i) => format!("{key}[{i}]"),
                None => key.to_string(),
            };
            tracing::warn!(
                arg = key,
                "Received illegal value for '{field}'. Supported options: {}",
                describe_options(options)
            );
            false
        }
    }
}

/// Locate the first illegal value: `Some(None)` for the whole value,
/// `Some(Some(i))` for a sequence element
fn first_illegal(change: &Change, options: &[ArgValue]) -> Option<Option<usize>> {
    match change {
        Change::Unset => None,
        Change::Set(ArgValue::Sequence(items)) if !options.contains(&ArgValue::Sequence(items.clone())) => items
            .iter()
            .position(|item| !options.contains(item))
            .map(Some),
        Change::Set(value) => {
            if options.contains(value) {
                None
            } else {
                Some(None)
            }
        }
        Change::Mapping(_) => Some(None),
        Change::Sequence(slots) => slots
            .iter()
            .position(|slot| match slot {
                Slot::Keep | Slot::Patch(Change::Unset) => false,
                Slot::Patch(Change::Set(value)) => !options.contains(value),
                Slot::Patch(_) => true,
            })
            .map(Some),
    }
}

fn describe_options(options: &[ArgValue]) -> String {
    options
        .iter()
        .map(|opt| match opt {
            ArgValue::String(s) => format!("'{s}'"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coerce raw values into declared representations
///
/// Keys without an arg type and values incompatible with their declared
/// type are dropped. Arg types that declare neither a type nor an implying
/// control pass values through.
#[must_use]
pub fn map_to_declared_types(values: &Args, arg_types: &ArgTypes) -> Args {
    let mut mapped = Args::new();
    for (key, value) in values {
        let Some(arg_type) = arg_types.get(key) else {
            continue;
        };
        let coerced = match arg_type.effective_type() {
            Some(sb_type) => map_value(value, &sb_type),
            None => Some(value.clone()),
        };
        match coerced {
            Some(v) => {
                mapped.insert(key.clone(), v);
            }
            None => {
                tracing::debug!(arg = %key, "dropping value incompatible with declared type");
            }
        }
    }
    mapped
}

/// `None` means incompatible
fn map_value(value: &ArgValue, sb_type: &SbType) -> Option<ArgValue> {
    if value.is_null() {
        return Some(ArgValue::Null);
    }
    match sb_type {
        SbType::String => match value {
            ArgValue::String(_) => Some(value.clone()),
            ArgValue::Number(_) | ArgValue::Bool(_) => Some(ArgValue::String(value.to_string())),
            _ => None,
        },
        SbType::Number => match value {
            ArgValue::Number(_) => Some(value.clone()),
            ArgValue::Bool(b) => Some(ArgValue::Number(if *b { 1.0 } else { 0.0 })),
            ArgValue::String(s) => parse_number(s).map(ArgValue::Number),
            _ => None,
        },
        SbType::Boolean => match value {
            ArgValue::Bool(_) => Some(value.clone()),
            other => Some(ArgValue::Bool(other.as_str() == Some("true"))),
        },
        SbType::Enum { .. } => Some(value.clone()),
        SbType::Array { value: element } => {
            let items = value.as_sequence()?;
            Some(ArgValue::Sequence(
                items.iter().filter_map(|item| map_value(item, element)).collect(),
            ))
        }
        SbType::Object { value: fields } => match value {
            ArgValue::String(_) | ArgValue::Number(_) => Some(value.clone()),
            ArgValue::Mapping(entries) => Some(ArgValue::Mapping(
                entries
                    .iter()
                    .filter_map(|(k, v)| {
                        let mapped = match fields.get(k) {
                            Some(field_type) => map_value(v, field_type)?,
                            None => v.clone(),
                        };
                        Some((k.clone(), mapped))
                    })
                    .collect(),
            )),
            _ => None,
        },
        SbType::Function | SbType::Other { .. } => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
