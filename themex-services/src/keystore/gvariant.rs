//! GVariant text format for the value types a [KeyStore](super::KeyStore) holds.

use super::{StoreError, StoreResult, Value, ValueKind};

/// Parse the text form printed by `gsettings get` or `gsettings monitor`.
pub(crate) fn parse(key: &str, kind: ValueKind, text: &str) -> StoreResult<Value> {
    let text = text.trim();
    match kind {
        ValueKind::Bool => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(StoreError::parse(key, format!("expected boolean, got {:?}", other))),
        },
        ValueKind::String => {
            let text = text.strip_prefix("@s ").unwrap_or(text);
            parse_string(text).map(Value::String).ok_or_else(|| {
                StoreError::parse(key, format!("expected quoted string, got {:?}", text))
            })
        },
    }
}

fn parse_string(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;

    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                other => out.push(other),
            },
            c if c == quote => break,
            c => out.push(c),
        }
    }

    // Nothing may follow the closing quote.
    if chars.next().is_some() {
        return None;
    }
    Some(out)
}

/// Format a value for `gsettings set`.
pub(crate) fn format(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                match c {
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('\'');
            out
        },
    }
}
