use serde_yml::Value;

use super::structure::{has_payload, parse_document, structurally_equal, to_yaml, upgrade_structure};
use super::yaml_documents::{join_documents, split_documents, YamlDocument};
use super::{RuleOutcome, RuleParameters};
use crate::collection::SourceItem;
use crate::error::Result;

/// Renames identifiers in multi-document project config files and drops
/// service registrations that became no-ops.
#[derive(Debug, Clone)]
pub struct ConfigClassesRule {
    params: RuleParameters,
    registration_keys: Vec<String>,
}

impl ConfigClassesRule {
    pub fn new(params: RuleParameters, registration_keys: Vec<String>) -> Self {
        Self {
            params,
            registration_keys,
        }
    }

    pub fn applies_to(&self, item: &SourceItem) -> bool {
        self.params.path_filter.matches(&item.path)
    }

    pub fn upgrade(&self, contents: &str, item: &SourceItem) -> RuleOutcome {
        if !self.applies_to(item) {
            return RuleOutcome::unchanged(contents);
        }

        match self.upgrade_stream(contents) {
            Ok(Some(upgraded)) => RuleOutcome::new(upgraded, Vec::new()),
            Ok(None) => RuleOutcome::unchanged(contents),
            Err(err) => RuleOutcome::unusable(contents, &err),
        }
    }

    /// New stream text, or `None` when no document changed.
    fn upgrade_stream(&self, contents: &str) -> Result<Option<String>> {
        let documents = split_documents(contents);
        let mut parts = Vec::with_capacity(documents.len());
        let mut changed = false;

        for document in &documents {
            match self.upgrade_document(document)? {
                Some(part) => {
                    changed = true;
                    parts.push(part);
                }
                None => parts.push(document.raw()),
            }
        }

        Ok(changed.then(|| join_documents(&parts)))
    }

    fn upgrade_document(&self, document: &YamlDocument) -> Result<Option<String>> {
        if !has_payload(&document.content) {
            return Ok(None);
        }

        let original = parse_document(&document.content, document.content_line())?;
        let mut upgraded = upgrade_structure(&original, &self.params)?;
        self.collapse_registrations(&mut upgraded);

        if structurally_equal(&original, &upgraded) {
            return Ok(None);
        }

        Ok(Some(document.with_content(&to_yaml(&upgraded)?)))
    }

    /// Drop `Name: Name` and `Name: {class: Name}` entries under each
    /// service-registration root. The root itself stays, even if emptied.
    fn collapse_registrations(&self, document: &mut Value) {
        let Some(root) = document.as_mapping_mut() else {
            return;
        };

        for key in &self.registration_keys {
            let Some(Value::Mapping(services)) = root.get_mut(key.as_str()) else {
                continue;
            };

            // Rebuilt rather than removed in place so the sorted order holds
            *services = std::mem::take(services)
                .into_iter()
                .filter(|(name, definition)| !is_redundant_registration(name, definition))
                .collect();
        }
    }
}

fn is_redundant_registration(name: &Value, definition: &Value) -> bool {
    let Value::String(name) = name else {
        return false;
    };

    match definition {
        Value::String(class) => class == name,
        Value::Mapping(fields) => {
            fields.len() == 1
                && matches!(fields.get("class"), Some(Value::String(class)) if class == name)
        }
        _ => false,
    }
}
