//! Structural mapper shared by the YAML rules.
//!
//! Walks a parsed document, renames mapped string scalars and keys, merges
//! list values whose keys collapse onto the same name, and sorts every
//! mapping's keys.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde_yml::value::{Tag, TaggedValue};
use serde_yml::{Mapping, Value};

use super::RuleParameters;
use crate::defaults::SERVICE_REFERENCE_PREFIX;
use crate::error::{Error, Result};

/// Rename a single string scalar.
///
/// Numeric strings pass through. A leading service-reference prefix is
/// kept while the rest is looked up.
pub fn upgrade_string(value: &str, params: &RuleParameters) -> String {
    if is_numeric(value) {
        return value.to_string();
    }

    let (prefix, identifier) = match value.strip_prefix(SERVICE_REFERENCE_PREFIX) {
        Some(rest) => (SERVICE_REFERENCE_PREFIX, rest),
        None => ("", value),
    };

    if params.is_excluded(identifier) {
        return value.to_string();
    }

    match params.mapped(identifier) {
        Some(mapped) => format!("{}{}", prefix, mapped),
        None => value.to_string(),
    }
}

/// Rename every mapped scalar and key in `value`, recursively.
///
/// Fails when two keys collapse onto the same name and their values are
/// not both lists.
pub fn upgrade_structure(value: &Value, params: &RuleParameters) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(upgrade_string(s, params))),
        Value::Sequence(items) => items
            .iter()
            .map(|item| upgrade_structure(item, params))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(mapping) => upgrade_mapping(mapping, params).map(Value::Mapping),
        Value::Tagged(tagged) => Ok(Value::Tagged(Box::new(TaggedValue {
            tag: tagged.tag.clone(),
            value: upgrade_structure(&tagged.value, params)?,
        }))),
        other => Ok(other.clone()),
    }
}

fn upgrade_mapping(mapping: &Mapping, params: &RuleParameters) -> Result<Mapping> {
    let mut upgraded = Mapping::new();

    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => Value::String(upgrade_string(s, params)),
            other => other.clone(),
        };
        let value = upgrade_structure(value, params)?;

        match upgraded.get_mut(&key) {
            Some(existing) => merge_into(existing, value, &key)?,
            None => {
                upgraded.insert(key, value);
            }
        }
    }

    Ok(sort_mapping(upgraded))
}

/// Merge a value whose key collided with one already present.
/// Lists concatenate, existing entries first.
fn merge_into(existing: &mut Value, incoming: Value, key: &Value) -> Result<()> {
    match (existing, incoming) {
        (Value::Sequence(current), Value::Sequence(extra)) => {
            current.extend(extra);
            Ok(())
        }
        (current, extra) => Err(Error::rule_merge_conflict(
            key_text(key),
            kind_name(current),
            kind_name(&extra),
        )),
    }
}

/// Rebuild `mapping` with keys in ascending ordinal order.
pub(crate) fn sort_mapping(mapping: Mapping) -> Mapping {
    let mut entries: Vec<(Value, Value)> = mapping.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    entries.into_iter().collect()
}

fn compare_keys(a: &Value, b: &Value) -> Ordering {
    key_text(a).cmp(&key_text(b))
}

/// Text a key sorts and reports by.
pub(crate) fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

/// Deep comparison: mappings ignore key order, sequences do not.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Mapping(x), Value::Mapping(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| structurally_equal(v, w)))
        }
        (Value::Sequence(x), Value::Sequence(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| structurally_equal(v, w))
        }
        (Value::Tagged(x), Value::Tagged(y)) => {
            x.tag == y.tag && structurally_equal(&x.value, &y.value)
        }
        _ => a == b,
    }
}

/// True when `s` reads as a number (optional sign, digits, optional
/// fraction and exponent).
fn is_numeric(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && trimmed.parse::<f64>().is_ok()
}

/// Whether a YAML text block holds anything besides blank lines and comments.
pub(crate) fn has_payload(content: &str) -> bool {
    content.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

/// Parse one YAML document. Parser errors keep the parser's message and
/// line, offset by `first_line - 1` so they point into the whole file.
/// A repeated key overwrites the earlier entry.
pub(crate) fn parse_document(content: &str, first_line: usize) -> Result<Value> {
    serde_yml::from_str::<LastKeyWins>(content)
        .map(|parsed| parsed.0)
        .map_err(|e| {
            let line = e
                .location()
                .map(|l| l.line() + first_line.saturating_sub(1))
                .unwrap_or(0);
            Error::rule_parse_failed(line, e.to_string())
        })
}

/// `Value` whose mappings keep the last of any duplicated keys.
struct LastKeyWins(Value);

impl<'de> Deserialize<'de> for LastKeyWins {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LastKeyWinsVisitor).map(LastKeyWins)
    }
}

struct LastKeyWinsVisitor;

impl<'de> Visitor<'de> for LastKeyWinsVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any YAML value")
    }

    fn visit_bool<E: serde::de::Error>(self, value: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(value.into()))
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(value.into()))
    }

    fn visit_f64<E: serde::de::Error>(self, value: f64) -> std::result::Result<Value, E> {
        Ok(Value::Number(value.into()))
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(value.to_owned()))
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> std::result::Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        LastKeyWins::deserialize(deserializer).map(|parsed| parsed.0)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(LastKeyWins(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut mapping = Mapping::new();
        while let Some((LastKeyWins(key), LastKeyWins(value))) = map.next_entry()? {
            mapping.insert(key, value);
        }
        Ok(Value::Mapping(mapping))
    }

    fn visit_enum<A>(self, data: A) -> std::result::Result<Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, contents) = data.variant::<String>()?;
        if tag.is_empty() {
            return Err(serde::de::Error::custom("empty YAML tag is not allowed"));
        }
        let LastKeyWins(value) = contents.newtype_variant()?;
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })))
    }
}

/// Canonical YAML for a rewritten document.
pub(crate) fn to_yaml(value: &Value) -> Result<String> {
    serde_yml::to_string(value)
        .map_err(|e| Error::internal_yaml(e.to_string(), Some("serialize document".to_string())))
}
