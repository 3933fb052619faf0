//! Upgrade rules: per-file rewriters driven by an identifier mapping table.
//!
//! Every rule answers two questions about a file: does it apply, and what
//! are the new contents plus any warnings. Rules hold only their
//! immutable `RuleParameters`; they never see each other, only the text
//! the previous rule produced.

mod config_classes;
mod lang_keys;
mod lang_yaml;
mod structure;
mod template_keys;
mod yaml_documents;

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

pub use config_classes::ConfigClassesRule;
pub use lang_keys::LangKeysRule;
pub use lang_yaml::LangYamlRule;
pub use structure::{structurally_equal, upgrade_string, upgrade_structure};
pub use template_keys::TemplateKeysRule;
pub use yaml_documents::{split_documents, YamlDocument};

use crate::change_set::Warning;
use crate::collection::SourceItem;
use crate::config::UpgradeConfig;
use crate::defaults;
use crate::error::{Error, Result};

/// Which files a rule looks at, as a regex over the `/`-separated
/// relative path.
#[derive(Debug, Clone)]
pub struct PathFilter {
    pattern: Regex,
}

impl PathFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::config_invalid_value("pathFilter", Some(pattern.to_string()), e.to_string())
        })?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Immutable configuration a rule is built with.
#[derive(Debug, Clone)]
pub struct RuleParameters {
    pub mappings: BTreeMap<String, String>,
    pub exclusions: BTreeSet<String>,
    pub path_filter: PathFilter,
}

impl RuleParameters {
    pub fn new(
        mappings: BTreeMap<String, String>,
        exclusions: BTreeSet<String>,
        path_filter: PathFilter,
    ) -> Self {
        Self {
            mappings,
            exclusions,
            path_filter,
        }
    }

    /// Mapped value for `identifier`, ignoring exclusions.
    pub fn mapped(&self, identifier: &str) -> Option<&str> {
        self.mappings.get(identifier).map(String::as_str)
    }

    pub fn is_excluded(&self, identifier: &str) -> bool {
        self.exclusions.contains(identifier)
    }
}

/// New contents and warnings produced by one rule for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub contents: String,
    pub warnings: Vec<Warning>,
}

impl RuleOutcome {
    pub fn new(contents: String, warnings: Vec<Warning>) -> Self {
        Self { contents, warnings }
    }

    pub fn unchanged(contents: &str) -> Self {
        Self {
            contents: contents.to_string(),
            warnings: Vec::new(),
        }
    }

    /// The rule could not use the contents: hand them back untouched
    /// alongside the reason.
    pub fn unusable(contents: &str, err: &Error) -> Self {
        Self {
            contents: contents.to_string(),
            warnings: vec![Warning::new(err.line(), err.message.clone())],
        }
    }
}

/// Name and one-line description of each built-in rule, in default order.
pub const RULES: &[(&str, &str)] = &[
    (
        "config-classes",
        "Rename identifiers in project config YAML, collapsing no-op service registrations",
    ),
    ("lang-yaml", "Rename identifiers in locale YAML files"),
    ("lang-keys", "Rename locale key namespaces in lang/src JSON files"),
    ("template-keys", "Rename locale key namespaces in template _t() and <%t %> tags"),
];

/// The closed set of rules the orchestrator can run.
#[derive(Debug, Clone)]
pub enum UpgradeRule {
    ConfigClasses(ConfigClassesRule),
    LangYaml(LangYamlRule),
    LangKeys(LangKeysRule),
    TemplateKeys(TemplateKeysRule),
}

impl UpgradeRule {
    /// Build a named rule from the merged upgrade config.
    pub fn from_name(name: &str, config: &UpgradeConfig) -> Result<Self> {
        let rule = match name {
            "config-classes" => UpgradeRule::ConfigClasses(ConfigClassesRule::new(
                config.rule_parameters(defaults::CONFIG_PATH_PATTERN)?,
                config.registration_keys(),
            )),
            "lang-yaml" => UpgradeRule::LangYaml(LangYamlRule::new(
                config.rule_parameters(defaults::LANG_YAML_PATH_PATTERN)?,
            )),
            "lang-keys" => UpgradeRule::LangKeys(LangKeysRule::new(
                config.rule_parameters(defaults::LANG_KEYS_PATH_PATTERN)?,
            )),
            "template-keys" => UpgradeRule::TemplateKeys(TemplateKeysRule::new(
                config.rule_parameters(defaults::TEMPLATE_PATH_PATTERN)?,
            )?),
            _ => {
                return Err(Error::validation_unknown_rule(
                    name,
                    RULES.iter().map(|(n, _)| n.to_string()).collect(),
                ))
            }
        };
        Ok(rule)
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpgradeRule::ConfigClasses(_) => "config-classes",
            UpgradeRule::LangYaml(_) => "lang-yaml",
            UpgradeRule::LangKeys(_) => "lang-keys",
            UpgradeRule::TemplateKeys(_) => "template-keys",
        }
    }

    pub fn applies_to(&self, item: &SourceItem) -> bool {
        match self {
            UpgradeRule::ConfigClasses(rule) => rule.applies_to(item),
            UpgradeRule::LangYaml(rule) => rule.applies_to(item),
            UpgradeRule::LangKeys(rule) => rule.applies_to(item),
            UpgradeRule::TemplateKeys(rule) => rule.applies_to(item),
        }
    }

    /// Rewrite `contents` (the output of the previous rule, not
    /// necessarily `item.contents`).
    pub fn upgrade(&self, contents: &str, item: &SourceItem) -> RuleOutcome {
        match self {
            UpgradeRule::ConfigClasses(rule) => rule.upgrade(contents, item),
            UpgradeRule::LangYaml(rule) => rule.upgrade(contents, item),
            UpgradeRule::LangKeys(rule) => rule.upgrade(contents, item),
            UpgradeRule::TemplateKeys(rule) => rule.upgrade(contents, item),
        }
    }
}

/// Build rules in the given order.
pub fn build_rules(names: &[String], config: &UpgradeConfig) -> Result<Vec<UpgradeRule>> {
    names
        .iter()
        .map(|name| UpgradeRule::from_name(name, config))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_filter_matches_relative_paths() {
        let filter = PathFilter::new(defaults::CONFIG_PATH_PATTERN).unwrap();
        assert!(filter.matches("_config/app.yml"));
        assert!(filter.matches("app/_config/nested/extensions.yaml"));
        assert!(!filter.matches("app/config/app.yml"));
        assert!(!filter.matches("_config.php"));
    }

    #[test]
    fn lang_filters_are_disjoint() {
        let yaml = PathFilter::new(defaults::LANG_YAML_PATH_PATTERN).unwrap();
        let keys = PathFilter::new(defaults::LANG_KEYS_PATH_PATTERN).unwrap();

        assert!(yaml.matches("lang/en.yml"));
        assert!(!yaml.matches("client/lang/src/en.json"));
        assert!(keys.matches("client/lang/src/en.json"));
        assert!(keys.matches("client/lang/src/de.js"));
        assert!(!keys.matches("client/lang/en.js"));
    }

    #[test]
    fn invalid_filter_is_config_error() {
        let err = PathFilter::new("(unclosed").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn unknown_rule_name_is_rejected() {
        let err = UpgradeRule::from_name("php-classes", &UpgradeConfig::default()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationUnknownRule);
    }

    #[test]
    fn build_rules_keeps_requested_order() {
        let names = vec!["template-keys".to_string(), "config-classes".to_string()];
        let rules = build_rules(&names, &UpgradeConfig::default()).unwrap();
        let built: Vec<&str> = rules.iter().map(UpgradeRule::name).collect();
        assert_eq!(built, vec!["template-keys", "config-classes"]);
    }

    #[test]
    fn rule_table_matches_default_order() {
        let table: Vec<&str> = RULES.iter().map(|(n, _)| *n).collect();
        assert_eq!(table, defaults::DEFAULT_RULE_ORDER);
    }

    #[test]
    fn unusable_outcome_carries_error_line() {
        let err = Error::rule_parse_failed(4, "bad indent");
        let outcome = RuleOutcome::unusable("a: b", &err);
        assert_eq!(outcome.contents, "a: b");
        assert_eq!(outcome.warnings, vec![Warning::new(4, "bad indent")]);
    }
}
