//! Runs an ordered list of rules over every file of a collection.
//!
//! For each file the rules are chained: each sees the previous rule's
//! output. Warnings are recorded as they are produced. A rule that warns
//! and hands back its input untouched ends the chain for that file.

use crate::change_set::ChangeSet;
use crate::collection::{CodeCollection, SourceItem};
use crate::config::UpgradeConfig;
use crate::error::Result;
use crate::rules::{build_rules, UpgradeRule};

pub struct Upgrader {
    rules: Vec<UpgradeRule>,
}

impl Upgrader {
    pub fn new(rules: Vec<UpgradeRule>) -> Self {
        Self { rules }
    }

    /// Build the named rules (in order) from a merged config.
    pub fn from_config(config: &UpgradeConfig, rule_names: &[String]) -> Result<Self> {
        Ok(Self::new(build_rules(rule_names, config)?))
    }

    pub fn rules(&self) -> &[UpgradeRule] {
        &self.rules
    }

    /// Upgrade every item. Only the collection can fail; rule problems
    /// end up as warnings in the change set.
    pub fn upgrade(&self, collection: &dyn CodeCollection) -> Result<ChangeSet> {
        let items = collection.items()?;
        let mut changes = ChangeSet::new();

        for item in &items {
            self.upgrade_item(item, &mut changes);
        }

        log_status!(
            "upgrade",
            "{} file(s) scanned, {} changed, {} warning(s)",
            items.len(),
            changes.changed_contents().len(),
            changes.warning_count()
        );

        Ok(changes)
    }

    fn upgrade_item(&self, item: &SourceItem, changes: &mut ChangeSet) {
        let mut current = item.contents.clone();

        for rule in &self.rules {
            if !rule.applies_to(item) {
                continue;
            }

            let outcome = rule.upgrade(&current, item);
            let unusable = !outcome.warnings.is_empty() && outcome.contents == current;

            if !outcome.warnings.is_empty() {
                log_status!(
                    "upgrade",
                    "{}: {} warning(s) from {}",
                    item.path,
                    outcome.warnings.len(),
                    rule.name()
                );
            }
            changes.add_warnings(&item.path, outcome.warnings);

            if unusable {
                break;
            }
            current = outcome.contents;
        }

        if current != item.contents {
            changes.add_contents(&item.path, current);
        }
    }
}
