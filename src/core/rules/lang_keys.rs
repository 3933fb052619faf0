use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use super::{RuleOutcome, RuleParameters};
use crate::change_set::Warning;
use crate::collection::SourceItem;
use crate::defaults::LANG_KEYS_INDENT;
use crate::error::{Error, Result};

/// Renames the namespace part of `Namespace.Key` entries in locale
/// source files (`lang/src/en.json`). Values are never touched.
#[derive(Debug, Clone)]
pub struct LangKeysRule {
    params: RuleParameters,
}

impl LangKeysRule {
    pub fn new(params: RuleParameters) -> Self {
        Self { params }
    }

    pub fn applies_to(&self, item: &SourceItem) -> bool {
        self.params.path_filter.matches(&item.path)
    }

    pub fn upgrade(&self, contents: &str, item: &SourceItem) -> RuleOutcome {
        if !self.applies_to(item) {
            return RuleOutcome::unchanged(contents);
        }

        let entries = match parse_entries(contents) {
            Ok(entries) => entries,
            Err(err) => return RuleOutcome::unusable(contents, &err),
        };

        let mut upgraded: BTreeMap<String, Value> = BTreeMap::new();
        let mut renamed = Vec::new();

        for (key, value) in entries {
            match self.upgrade_key(&key) {
                Some(new_key) => renamed.push((key, new_key, value)),
                None => {
                    upgraded.insert(key, value);
                }
            }
        }

        if renamed.is_empty() {
            return RuleOutcome::unchanged(contents);
        }

        let mut warnings = Vec::new();
        for (old_key, new_key, value) in renamed {
            if upgraded.contains_key(&new_key) {
                warnings.push(Warning::new(
                    0,
                    format!(
                        "Key '{}' would become '{}', which already exists; keeping the existing entry",
                        old_key, new_key
                    ),
                ));
                continue;
            }
            upgraded.insert(new_key, value);
        }

        match serialize_entries(&upgraded, contents.ends_with('\n')) {
            Ok(serialized) => RuleOutcome::new(serialized, warnings),
            Err(err) => RuleOutcome::unusable(contents, &err),
        }
    }

    /// `Namespace.Key` with a mapped namespace, rewritten.
    fn upgrade_key(&self, key: &str) -> Option<String> {
        let (namespace, rest) = key.split_once('.')?;
        let mapped = self.params.mapped(namespace)?;
        Some(format!("{}.{}", mapped, rest))
    }
}

fn parse_entries(contents: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(contents) {
        Ok(Value::Object(entries)) => Ok(entries),
        Ok(_) => Err(Error::rule_parse_failed(
            0,
            "Expected a JSON object of locale keys",
        )),
        Err(e) => Err(Error::rule_parse_failed(0, e.to_string())),
    }
}

/// Pretty-printed object, keys in map order, unicode left unescaped.
fn serialize_entries(entries: &BTreeMap<String, Value>, trailing_newline: bool) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(LANG_KEYS_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries
        .serialize(&mut serializer)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize locale keys".to_string())))?;

    let mut out = String::from_utf8(buf)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize locale keys".to_string())))?;
    if trailing_newline {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::LANG_KEYS_PATH_PATTERN;
    use crate::rules::test_support::params;

    fn rule(mappings: &[(&str, &str)]) -> LangKeysRule {
        LangKeysRule::new(params(LANG_KEYS_PATH_PATTERN, mappings, &[]))
    }

    fn item() -> SourceItem {
        SourceItem::in_memory("client/lang/src/en.json", "")
    }

    fn parse(s: &str) -> Map<String, Value> {
        match serde_json::from_str::<Value>(s).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn namespace_is_renamed_and_value_kept() {
        let outcome = rule(&[("AssetAdmin", "SilverStripe\\AssetAdmin\\AssetAdmin")])
            .upgrade(r#"{"AssetAdmin.TITLE": "Files"}"#, &item());

        assert!(outcome.warnings.is_empty());
        assert!(outcome.contents.contains('\n'), "expected pretty output");
        assert!(outcome
            .contents
            .contains(r#""SilverStripe\\AssetAdmin\\AssetAdmin.TITLE": "Files""#));

        let parsed = parse(&outcome.contents);
        assert_eq!(
            parsed.get("SilverStripe\\AssetAdmin\\AssetAdmin.TITLE"),
            Some(&Value::String("Files".to_string()))
        );
    }

    #[test]
    fn invalid_json_warns_with_parser_message() {
        let outcome = rule(&[("AssetAdmin", "X")]).upgrade("{invalid json", &item());

        assert_eq!(outcome.contents, "{invalid json");
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].line, 0);
        assert!(outcome.warnings[0].message.contains("line 1"), "{}", outcome.warnings[0].message);
    }

    #[test]
    fn non_object_json_warns() {
        let outcome = rule(&[("A", "B")]).upgrade("[1, 2]", &item());
        assert_eq!(outcome.contents, "[1, 2]");
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn splits_on_first_dot_only() {
        let outcome = rule(&[("Form", "App\\Form")])
            .upgrade(r#"{"Form.Field.LABEL": "x", "Form": "bare"}"#, &item());

        let parsed = parse(&outcome.contents);
        assert!(parsed.contains_key("App\\Form.Field.LABEL"));
        assert!(parsed.contains_key("Form"), "keys without a dot are left alone");
    }

    #[test]
    fn output_keys_are_sorted_and_unicode_is_literal() {
        let outcome = rule(&[("Zeta", "Alpha")]).upgrade(
            "{\n  \"Beta.X\": \"Grüße\",\n  \"Zeta.Y\": \"日本\"\n}\n",
            &item(),
        );

        assert_eq!(
            outcome.contents,
            "{\n    \"Alpha.Y\": \"日本\",\n    \"Beta.X\": \"Grüße\"\n}\n"
        );
    }

    #[test]
    fn unmapped_file_is_byte_identical() {
        let text = "{ \"Other.KEY\" : \"v\" }";
        let outcome = rule(&[("AssetAdmin", "X")]).upgrade(text, &item());
        assert_eq!(outcome, RuleOutcome::unchanged(text));
    }

    #[test]
    fn collision_with_existing_key_keeps_existing_and_warns() {
        let outcome = rule(&[("Old", "New")])
            .upgrade(r#"{"New.TITLE": "kept", "Old.TITLE": "dropped"}"#, &item());

        let parsed = parse(&outcome.contents);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["New.TITLE"], Value::String("kept".to_string()));
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn nested_values_are_not_transformed() {
        let outcome = rule(&[("A", "B")]).upgrade(r#"{"A.k": {"A.inner": "A"}}"#, &item());
        let parsed = parse(&outcome.contents);
        assert_eq!(parsed["B.k"]["A.inner"], Value::String("A".to_string()));
    }

    #[test]
    fn rewriting_is_idempotent() {
        let r = rule(&[("AssetAdmin", "SilverStripe\\AssetAdmin\\AssetAdmin")]);
        let once = r.upgrade(r#"{"AssetAdmin.TITLE": "Files", "B.x": "y"}"#, &item()).contents;
        assert_eq!(r.upgrade(&once, &item()), RuleOutcome::unchanged(&once));
    }
}
