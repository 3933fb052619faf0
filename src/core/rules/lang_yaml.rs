use super::structure::{has_payload, parse_document, structurally_equal, to_yaml, upgrade_structure};
use super::{RuleOutcome, RuleParameters};
use crate::collection::SourceItem;
use crate::error::Result;

/// Renames identifiers in single-document locale YAML files
/// (`lang/en.yml` and friends).
#[derive(Debug, Clone)]
pub struct LangYamlRule {
    params: RuleParameters,
}

impl LangYamlRule {
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

        match self.upgrade_contents(contents) {
            Ok(Some(upgraded)) => RuleOutcome::new(upgraded, Vec::new()),
            Ok(None) => RuleOutcome::unchanged(contents),
            Err(err) => RuleOutcome::unusable(contents, &err),
        }
    }

    fn upgrade_contents(&self, contents: &str) -> Result<Option<String>> {
        if !has_payload(contents) {
            return Ok(None);
        }

        let original = parse_document(contents, 1)?;
        let upgraded = upgrade_structure(&original, &self.params)?;

        if structurally_equal(&original, &upgraded) {
            return Ok(None);
        }

        to_yaml(&upgraded).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::LANG_YAML_PATH_PATTERN;
    use crate::rules::test_support::params;
    use serde_yml::Value;

    fn rule(mappings: &[(&str, &str)]) -> LangYamlRule {
        LangYamlRule::new(params(LANG_YAML_PATH_PATTERN, mappings, &[]))
    }

    fn item() -> SourceItem {
        SourceItem::in_memory("lang/en.yml", "")
    }

    #[test]
    fn namespaces_are_renamed_and_sorted() {
        let text = "en:\n  Page:\n    TITLE: Page\n  Member:\n    NAME: Name\n";
        let outcome = rule(&[("Page", "SilverStripe\\CMS\\Model\\SiteTree")]).upgrade(text, &item());

        let parsed: Value = serde_yml::from_str(&outcome.contents).unwrap();
        let namespaces: Vec<&str> = parsed["en"]
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(namespaces, vec!["Member", "SilverStripe\\CMS\\Model\\SiteTree"]);
    }

    #[test]
    fn untouched_file_keeps_comments() {
        let text = "# Translations\nen:\n  Member:\n    NAME: Name\n";
        let outcome = rule(&[("Page", "X")]).upgrade(text, &item());
        assert_eq!(outcome.contents, text);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn multi_line_values_survive_rewrite() {
        let text = "en:\n  Page:\n    HELP: \"line one\\nline two\\n\"\n";
        let outcome = rule(&[("Page", "App\\Page")]).upgrade(text, &item());

        let parsed: Value = serde_yml::from_str(&outcome.contents).unwrap();
        assert_eq!(parsed["en"]["App\\Page"]["HELP"], Value::String("line one\nline two\n".into()));
    }

    #[test]
    fn repeated_namespace_keeps_last_block() {
        let text = "en:\n  Page:\n    TITLE: Old\n  Page:\n    TITLE: New\n";
        let outcome = rule(&[("Page", "App\\Page")]).upgrade(text, &item());

        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        let parsed: Value = serde_yml::from_str(&outcome.contents).unwrap();
        assert_eq!(parsed["en"]["App\\Page"]["TITLE"], Value::String("New".into()));
        assert!(parsed["en"].get("Page").is_none());
    }

    #[test]
    fn malformed_yaml_warns_and_keeps_contents() {
        let text = "en:\n  Page: [unclosed\n";
        let outcome = rule(&[("Page", "App\\Page")]).upgrade(text, &item());
        assert_eq!(outcome.contents, text);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn empty_file_is_left_alone() {
        let outcome = rule(&[("Page", "App\\Page")]).upgrade("", &item());
        assert_eq!(outcome, RuleOutcome::unchanged(""));
    }

    #[test]
    fn rewriting_is_idempotent() {
        let text = "en:\n  Page:\n    TITLE: Page\n";
        let r = rule(&[("Page", "App\\Page")]);
        let once = r.upgrade(text, &item()).contents;
        assert_eq!(r.upgrade(&once, &item()).contents, once);
    }
}
