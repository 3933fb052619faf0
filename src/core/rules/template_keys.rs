use std::collections::BTreeMap;

use regex::{Captures, Regex};

use super::{RuleOutcome, RuleParameters};
use crate::collection::SourceItem;
use crate::error::{Error, Result};

/// `_t('Namespace.Key'` / `_t("Namespace.Key"` up to the closing quote.
const FUNCTION_TAG_PATTERN: &str =
    r#"_t\(\s*(?:'(?P<single>[^'.\s]+)\.[^']*'|"(?P<double>[^".\s]+)\.[^"]*")"#;

/// `<%t Namespace.Key`, bare or quoted.
const DIRECTIVE_TAG_PATTERN: &str = r#"<%t\s+(?:'(?P<single>[^'.\s]+)\.[^']*'|"(?P<double>[^".\s]+)\.[^"]*"|(?P<bare>[^'"\s.%]+)\.[^\s%]*)"#;

const NAMESPACE_GROUPS: &[&str] = &["single", "double", "bare"];

/// Renames the namespace of locale keys referenced from template tags.
///
/// Replacement is literal: every occurrence of a matched tag's exact text
/// is rewritten, wherever it appears in the file.
#[derive(Debug, Clone)]
pub struct TemplateKeysRule {
    params: RuleParameters,
    patterns: Vec<Regex>,
}

impl TemplateKeysRule {
    pub fn new(params: RuleParameters) -> Result<Self> {
        let patterns = [FUNCTION_TAG_PATTERN, DIRECTIVE_TAG_PATTERN]
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::internal_unexpected(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { params, patterns })
    }

    pub fn applies_to(&self, item: &SourceItem) -> bool {
        self.params.path_filter.matches(&item.path)
    }

    pub fn upgrade(&self, contents: &str, item: &SourceItem) -> RuleOutcome {
        if !self.applies_to(item) {
            return RuleOutcome::unchanged(contents);
        }

        let replacements = self.collect_replacements(contents);
        if replacements.is_empty() {
            return RuleOutcome::unchanged(contents);
        }

        match replace_literals(contents, &replacements) {
            Ok(upgraded) => RuleOutcome::new(upgraded, Vec::new()),
            Err(err) => RuleOutcome::unusable(contents, &err),
        }
    }

    /// Matched tag text → rewritten tag text, across both tag shapes.
    fn collect_replacements(&self, contents: &str) -> BTreeMap<String, String> {
        let mut replacements = BTreeMap::new();

        for pattern in &self.patterns {
            for caps in pattern.captures_iter(contents) {
                if let Some((original, replacement)) = self.rewrite_tag(&caps) {
                    if original != replacement {
                        replacements.insert(original, replacement);
                    }
                }
            }
        }

        replacements
    }

    fn rewrite_tag(&self, caps: &Captures) -> Option<(String, String)> {
        let tag = caps.get(0)?;
        let namespace = NAMESPACE_GROUPS.iter().find_map(|name| caps.name(name))?;
        let mapped = self.params.mapped(namespace.as_str())?;

        let start = namespace.start() - tag.start();
        let end = namespace.end() - tag.start();
        let text = tag.as_str();

        let replacement = format!(
            "{}{}{}",
            &text[..start],
            escape_for_template(mapped),
            &text[end..]
        );
        Some((text.to_string(), replacement))
    }
}

/// Quadruple every backslash; the template renderer unescapes once.
fn escape_for_template(namespace: &str) -> String {
    namespace.replace('\\', "\\\\\\\\")
}

/// Replace every occurrence of each key in one left-to-right pass.
/// At any position the longest key wins and replaced text is never
/// rescanned.
fn replace_literals(contents: &str, replacements: &BTreeMap<String, String>) -> Result<String> {
    let mut keys: Vec<&String> = replacements.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let matcher = Regex::new(&alternation).map_err(|e| Error::internal_unexpected(e.to_string()))?;

    Ok(matcher
        .replace_all(contents, |caps: &Captures| {
            replacements
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned())
}
