//! Persisted args codec
//!
//! Args edits are persisted as a compact `key:value;key:value` string, the
//! format used for the `args` URL parameter. Nested values use `a.b` and
//! `a[0]` key paths; non-string scalars use `!` markers (`!null`, `!true`,
//! `!hex(f00)`, ...). Values outside a conservative character set are
//! omitted on both ends.
//!
//! Parsed values are raw: numbers stay strings until
//! [`map_to_declared_types`](crate::validation::map_to_declared_types)
//! coerces them.

use crate::delta::{self, ArgsPatch, Change, Slot};
use crate::error::PersistedError;
use crate::value::{ArgValue, Args};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// Highest sequence index accepted in a key path
pub const MAX_INDEX: usize = 100;

static SAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9 _-]*$").expect("invalid safe-value regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("invalid number regex"));
static HEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([a-fA-F0-9]{3}|[a-fA-F0-9]{6}|[a-fA-F0-9]{8})$").expect("invalid hex regex")
});
static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i)(rgba?|hsla?)\(([0-9]{1,3}),\s?([0-9]{1,3})%?,\s?([0-9]{1,3})%?,?\s?([0-9](\.[0-9]{1,2})?)?\)$",
    )
    .expect("invalid color regex")
});
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}(:\d{2}(\.\d{1,3})?)?Z?)?$")
        .expect("invalid date regex")
});
static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z0-9 _-]+)((?:\.[a-zA-Z0-9 _-]+|\[[0-9]+\])*)$")
        .expect("invalid key path regex")
});
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.([a-zA-Z0-9 _-]+)|\[([0-9]+)\]").expect("invalid path segment regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a persisted args string
///
/// Rejected pairs are skipped with a warning; parsing never fails.
#[must_use]
pub fn parse_args_param(param: &str) -> Args {
    let mut root = ArgValue::Mapping(Args::new());

    for pair in param.split(';').filter(|p| !p.is_empty()) {
        match parse_pair(pair) {
            Ok(Some((path, value))) => insert_path(&mut root, &path, value),
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "ignoring persisted arg"),
        }
    }

    match root {
        ArgValue::Mapping(args) => args,
        _ => Args::new(),
    }
}

/// Serialize the difference between `args` and `initial`
///
/// Only changed values are written. Removed keys are written as
/// `!undefined`; values that cannot be represented safely are omitted.
#[must_use]
pub fn stringify_args(args: &Args, initial: &Args) -> String {
    let patch = delta::diff(initial, args).into_patch();
    let mut pairs = Vec::new();
    encode_patch(&patch, "", &mut pairs);
    pairs.join(";")
}

fn parse_pair(pair: &str) -> Result<Option<(Vec<Segment>, ArgValue)>, PersistedError> {
    let (raw_key, raw_value) = pair
        .split_once(':')
        .ok_or_else(|| PersistedError::MalformedPair(pair.to_string()))?;

    let key = decode(raw_key);
    let path = parse_path(&key)?;
    let value = decode(raw_value);

    if let Some(marker) = value.strip_prefix('!') {
        return parse_marker(marker)
            .map(|v| v.map(|v| (path, v)))
            .ok_or(PersistedError::Unsafe(key));
    }

    if SAFE_RE.is_match(&value) || NUMBER_RE.is_match(&value) {
        Ok(Some((path, ArgValue::String(value))))
    } else {
        Err(PersistedError::Unsafe(key))
    }
}

/// `None` outer: unrecognized marker. `Some(None)`: `!undefined`
#[allow(clippy::option_option)]
fn parse_marker(marker: &str) -> Option<Option<ArgValue>> {
    match marker {
        "null" => return Some(Some(ArgValue::Null)),
        "undefined" => return Some(None),
        "true" => return Some(Some(ArgValue::Bool(true))),
        "false" => return Some(Some(ArgValue::Bool(false))),
        _ => {}
    }

    if let Some(date) = marker.strip_prefix("date(").and_then(|r| r.strip_suffix(')')) {
        return DATE_RE
            .is_match(date)
            .then(|| Some(ArgValue::String(date.to_string())));
    }
    if let Some(hex) = marker.strip_prefix("hex(").and_then(|r| r.strip_suffix(')')) {
        let color = format!("#{hex}");
        return HEX_RE.is_match(&color).then(|| Some(ArgValue::String(color)));
    }
    let caps = COLOR_RE.captures(marker)?;
    let func = caps.get(1)?.as_str().to_lowercase();
    let c = |i: usize| caps.get(i).map_or("", |m| m.as_str());
    let alpha = caps.get(5).map(|m| format!(", {}", m.as_str())).unwrap_or_default();
    let color = if func.starts_with("hsl") {
        format!("{func}({}, {}%, {}%{alpha})", c(2), c(3), c(4))
    } else {
        format!("{func}({}, {}, {}{alpha})", c(2), c(3), c(4))
    };
    Some(Some(ArgValue::String(color)))
}

fn parse_path(key: &str) -> Result<Vec<Segment>, PersistedError> {
    let invalid = || PersistedError::InvalidPath(key.to_string());
    let caps = PATH_RE.captures(key).ok_or_else(invalid)?;

    let mut path = vec![Segment::Key(caps[1].to_string())];
    let rest = caps.get(2).map_or("", |m| m.as_str());
    for seg in SEGMENT_RE.captures_iter(rest) {
        if let Some(name) = seg.get(1) {
            path.push(Segment::Key(name.as_str().to_string()));
        } else if let Some(index) = seg.get(2) {
            let index: usize = index.as_str().parse().map_err(|_| invalid())?;
            if index > MAX_INDEX {
                return Err(invalid());
            }
            path.push(Segment::Index(index));
        }
    }
    Ok(path)
}

fn insert_path(target: &mut ArgValue, path: &[Segment], value: ArgValue) {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return;
    };

    match head {
        Segment::Key(key) => {
            if !matches!(target, ArgValue::Mapping(_)) {
                *target = ArgValue::Mapping(Args::new());
            }
            if let ArgValue::Mapping(fields) = target {
                let slot = fields.entry(key.clone()).or_default();
                insert_path(slot, rest, value);
            }
        }
        Segment::Index(index) => {
            if !matches!(target, ArgValue::Sequence(_)) {
                *target = ArgValue::Sequence(Vec::new());
            }
            if let ArgValue::Sequence(items) = target {
                if items.len() <= *index {
                    items.resize(index + 1, ArgValue::Null);
                }
                insert_path(&mut items[*index], rest, value);
            }
        }
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn encode_patch(patch: &ArgsPatch, prefix: &str, out: &mut Vec<String>) {
    for (key, change) in patch {
        if key.is_empty() || !SAFE_RE.is_match(key) {
            tracing::warn!(arg = %key, "omitting arg with unsafe key from persisted args");
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        encode_change(change, &path, out);
    }
}

fn encode_change(change: &Change, path: &str, out: &mut Vec<String>) {
    match change {
        Change::Set(value) => encode_value(value, path, out),
        Change::Unset => out.push(format!("{path}:!undefined")),
        Change::Mapping(patch) => encode_patch(patch, path, out),
        Change::Sequence(slots) => {
            for (i, slot) in slots.iter().enumerate() {
                if let Slot::Patch(change) = slot {
                    encode_change(change, &format!("{path}[{i}]"), out);
                }
            }
        }
    }
}

fn encode_value(value: &ArgValue, path: &str, out: &mut Vec<String>) {
    match value {
        ArgValue::Null => out.push(format!("{path}:!null")),
        ArgValue::Bool(b) => out.push(format!("{path}:!{b}")),
        ArgValue::Number(_) => out.push(format!("{path}:{value}")),
        ArgValue::String(s) => match encode_string(s) {
            Some(encoded) => out.push(format!("{path}:{encoded}")),
            None => tracing::warn!(arg = path, "omitting unsafe string from persisted args"),
        },
        ArgValue::Mapping(fields) => encode_patch(&Change::set_all(fields), path, out),
        ArgValue::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                encode_value(item, &format!("{path}[{i}]"), out);
            }
        }
        ArgValue::Opaque(_) => {
            tracing::debug!(arg = path, "opaque values are not persisted");
        }
    }
}

fn encode_string(s: &str) -> Option<String> {
    if SAFE_RE.is_match(s) {
        return Some(s.replace(' ', "+"));
    }
    if let Some(hex) = s.strip_prefix('#').filter(|_| HEX_RE.is_match(s)) {
        return Some(format!("!hex({hex})"));
    }
    if COLOR_RE.is_match(s) {
        let compact: String = s.chars().filter(|c| !c.is_whitespace() && *c != '%').collect();
        return Some(format!("!{compact}"));
    }
    if DATE_RE.is_match(s) {
        return Some(format!("!date({s})"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::args_from_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_flat_pairs() {
        let args = parse_args_param("label:Hello+world;count:3;on:!true;off:!false;none:!null");
        assert_eq!(
            args,
            args_from_json(json!({
                "label": "Hello world",
                "count": "3",
                "on": true,
                "off": false,
                "none": null
            }))
        );
    }

    #[test]
    fn parses_nested_paths() {
        let args = parse_args_param("style.color:red;items[1]:b;items[0]:a");
        assert_eq!(
            args,
            args_from_json(json!({"style": {"color": "red"}, "items": ["a", "b"]}))
        );
    }

    #[test]
    fn sparse_indices_pad_with_null() {
        let args = parse_args_param("items[2]:c");
        assert_eq!(args, args_from_json(json!({"items": [null, null, "c"]})));
    }

    #[test]
    fn undefined_marker_drops_key() {
        let args = parse_args_param("gone:!undefined;kept:yes");
        assert_eq!(args, args_from_json(json!({"kept": "yes"})));
    }

    #[test]
    fn colors_and_dates() {
        let args = parse_args_param(
            "bg:!hex(ff0000);fg:!rgba(0,0,0,0.5);hue:!hsl(120,50,50);day:!date(2024-01-02)",
        );
        assert_eq!(args["bg"], ArgValue::from("#ff0000"));
        assert_eq!(args["fg"], ArgValue::from("rgba(0, 0, 0, 0.5)"));
        assert_eq!(args["hue"], ArgValue::from("hsl(120, 50%, 50%)"));
        assert_eq!(args["day"], ArgValue::from("2024-01-02"));
    }

    #[test]
    fn rejects_unsafe_values_and_keys() {
        let args = parse_args_param("html:<script>;ok:fine;bad$key:x;nocolon;idx[500]:x");
        assert_eq!(args, args_from_json(json!({"ok": "fine"})));
    }

    #[test]
    fn percent_decoding() {
        let args = parse_args_param("label:a%20b;title:c+d;note:50%");
        assert_eq!(args["label"], ArgValue::from("a b"));
        assert_eq!(args["title"], ArgValue::from("c d"));
        assert!(!args.contains_key("note"));
    }

    #[test]
    fn stringify_writes_only_changes() {
        let initial = args_from_json(json!({"label": "Hi", "count": 1, "on": false}));
        let current = args_from_json(json!({"label": "Hello there", "count": 1, "on": true}));

        assert_eq!(stringify_args(&current, &initial), "label:Hello+there;on:!true");
    }

    #[test]
    fn stringify_nested_and_removed() {
        let initial = args_from_json(json!({"style": {"color": "red"}, "extra": 1}));
        let current = args_from_json(json!({"style": {"color": "#00ff00"}, "items": ["a"]}));

        assert_eq!(
            stringify_args(&current, &initial),
            "style.color:!hex(00ff00);extra:!undefined;items[0]:a"
        );
    }

    #[test]
    fn stringify_omits_unsafe_and_opaque() {
        let initial = Args::new();
        let mut current = args_from_json(json!({"html": "<b>", "n": 2.5}));
        current.insert("cb".into(), ArgValue::opaque("onClick"));

        assert_eq!(stringify_args(&current, &initial), "n:2.5");
    }

    #[test]
    fn stringified_changes_parse_back() {
        let initial = args_from_json(json!({"label": "a"}));
        let current = args_from_json(json!({"label": "b c", "on": true, "tags": ["x", "y"]}));

        let parsed = parse_args_param(&stringify_args(&current, &initial));
        assert_eq!(
            parsed,
            args_from_json(json!({"label": "b c", "on": true, "tags": ["x", "y"]}))
        );
    }
}
