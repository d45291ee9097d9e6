use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Display;

/// Deserializes a string and hands it to `parser`, prefixing failures with `kind`.
pub fn parse_via_string<'de, D, T, F>(deserializer: D, kind: &str, parser: F) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    F: FnOnce(&str) -> Result<T, String>,
{
    let raw = String::deserialize(deserializer)?;
    parser(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(u64),
    Text(String),
}

/// Like [`parse_via_string`], but YAML/JSON numbers are accepted and parsed in their
/// decimal form.
pub fn parse_via_string_or_number<'de, D, T, F>(
    deserializer: D,
    kind: &str,
    parser: F,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    F: FnOnce(&str) -> Result<T, String>,
{
    let raw = match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(number) => number.to_string(),
        StringOrNumber::Text(raw) => raw,
    };
    parser(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
}

pub fn serialize_display<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display + ?Sized,
{
    serializer.collect_str(value)
}
