use crate::shared::errors::{ErrorCode, LineError};
use serde_json::{Map, Value};

/// Strict parsing failed, and so did parsing the repaired text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: invalid JSON ({original}); repair attempt failed ({repaired})")]
pub struct ParseError {
    pub line: usize,
    pub original: String,
    pub repaired: String,
}

impl From<ParseError> for LineError {
    fn from(value: ParseError) -> Self {
        LineError::new(
            value.line,
            ErrorCode::Parse,
            format!(
                "invalid JSON ({}); repair attempt failed ({})",
                value.original, value.repaired
            ),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub record: Map<String, Value>,
    pub repaired: bool,
}

/// Parses one non-blank line into a JSON object, retrying once on a repaired copy.
pub fn parse_line(line: usize, raw: &str) -> Result<ParsedLine, ParseError> {
    let original = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => {
            return as_object(value).map(|record| ParsedLine {
                record,
                repaired: false,
            })
            .map_err(|reason| ParseError {
                line,
                original: reason.clone(),
                repaired: reason,
            })
        }
        Err(err) => err.to_string(),
    };

    let repaired_text = repair_json(raw);
    match serde_json::from_str::<Value>(&repaired_text) {
        Ok(value) => as_object(value)
            .map(|record| ParsedLine {
                record,
                repaired: true,
            })
            .map_err(|reason| ParseError {
                line,
                original: original.clone(),
                repaired: reason,
            }),
        Err(err) => Err(ParseError {
            line,
            original,
            repaired: err.to_string(),
        }),
    }
}

fn as_object(value: Value) -> Result<Map<String, Value>, String> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!(
            "record must be a JSON object, got {}",
            crate::config::value_kind(&other)
        )),
    }
}

/// Best-effort fixes for the mistakes models make when hand-writing JSON: single-quoted
/// strings, unquoted keys, raw control characters inside strings, trailing commas and
/// unclosed brackets.
pub fn repair_json(raw: &str) -> String {
    let text = strip_code_fence(raw.trim());
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut last_significant: Option<char> = None;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];

        if let Some(open) = quote {
            match ch {
                '\\' => {
                    match chars.get(i + 1) {
                        Some('\'') => out.push('\''),
                        Some(next) => {
                            out.push('\\');
                            out.push(*next);
                        }
                        None => out.push_str("\\\\"),
                    }
                    i += 2;
                    continue;
                }
                c if c == open => {
                    out.push('"');
                    quote = None;
                    last_significant = Some('"');
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
            i += 1;
            continue;
        }

        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                out.push('"');
            }
            '{' => {
                closers.push('}');
                out.push(ch);
                last_significant = Some(ch);
            }
            '[' => {
                closers.push(']');
                out.push(ch);
                last_significant = Some(ch);
            }
            '}' | ']' => {
                if closers.last() == Some(&ch) {
                    closers.pop();
                }
                out.push(ch);
                last_significant = Some(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']') | None) {
                    out.push(ch);
                    last_significant = Some(ch);
                }
            }
            c if (c.is_ascii_alphabetic() || c == '_' || c == '$')
                && matches!(last_significant, Some('{') | Some(',')) =>
            {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$' || chars[i] == '-')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let next = chars[i..].iter().find(|c| !c.is_whitespace());
                if next == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                last_significant = Some('"');
                continue;
            }
            c => {
                out.push(c);
                if !c.is_whitespace() {
                    last_significant = Some(c);
                }
            }
        }
        i += 1;
    }

    if quote.is_some() {
        out.push('"');
    }
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
