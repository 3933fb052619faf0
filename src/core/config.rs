//! Upgrade config files: the mapping table and exclusions a run uses.
//!
//! Modules ship an `.upgrade.yml` (or `.upgrade.json`) next to their code:
//!
//! ```yaml
//! mappings:
//!   Page: SilverStripe\CMS\Model\SiteTree
//! skipConfigs:
//!   - Page
//! excludedPaths:
//!   - "thirdparty/**"
//! ```
//!
//! Every config found under a project root is merged; an explicitly
//! passed file is merged last.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yml::Value;

use crate::collection::relative_path;
use crate::defaults::{self, CONFIG_DISCOVERY_SKIP_DIRS, UPGRADE_CONFIG_FILES};
use crate::error::{Error, Result};
use crate::local_files::FileSystem;
use crate::rules::{PathFilter, RuleParameters};

/// Merged upgrade configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeConfig {
    /// Old identifier → new identifier.
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,

    /// Identifiers the structural rules leave alone even when mapped.
    #[serde(default)]
    pub skip_configs: Vec<String>,

    /// Globs (relative to the root) removed from the collection.
    #[serde(default)]
    pub excluded_paths: Vec<String>,

    /// Overrides the service-registration root keys used to collapse
    /// no-op registrations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_keys: Option<Vec<String>>,
}

impl UpgradeConfig {
    /// Parse a YAML config. Empty or comment-only text is an empty config.
    pub fn from_yaml_str(content: &str, source: &str) -> Result<Self> {
        let value: Value =
            serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(source, e))?;
        if value.is_null() {
            return Ok(Self::default());
        }

        let config: Self =
            serde_yml::from_value(value).map_err(|e| Error::config_invalid_yaml(source, e))?;
        config.validate(source)?;
        Ok(config)
    }

    pub fn from_json_str(content: &str, source: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))?;
        config.validate(source)?;
        Ok(config)
    }

    /// Load one config file, choosing the parser by extension.
    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self> {
        let content = fs.read(path)?;
        let source = path.to_string_lossy().to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content, &source),
            _ => Self::from_yaml_str(&content, &source),
        }
    }

    /// Merge `other` on top of `self`: mappings later-wins per key,
    /// lists unioned in first-seen order.
    pub fn merge(&mut self, other: UpgradeConfig) {
        self.mappings.extend(other.mappings);

        for skip in other.skip_configs {
            if !self.skip_configs.contains(&skip) {
                self.skip_configs.push(skip);
            }
        }

        for pattern in other.excluded_paths {
            if !self.excluded_paths.contains(&pattern) {
                self.excluded_paths.push(pattern);
            }
        }

        if other.registration_keys.is_some() {
            self.registration_keys = other.registration_keys;
        }
    }

    pub fn exclusions(&self) -> BTreeSet<String> {
        self.skip_configs.iter().cloned().collect()
    }

    pub fn registration_keys(&self) -> Vec<String> {
        self.registration_keys
            .clone()
            .unwrap_or_else(defaults::service_registration_keys)
    }

    /// Parameters for one rule instance, filtered by `path_pattern`.
    pub fn rule_parameters(&self, path_pattern: &str) -> Result<RuleParameters> {
        Ok(RuleParameters::new(
            self.mappings.clone(),
            self.exclusions(),
            PathFilter::new(path_pattern)?,
        ))
    }

    fn validate(&self, source: &str) -> Result<()> {
        for (from, to) in &self.mappings {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    "mappings",
                    Some(format!("{}: {}", from, to)),
                    format!("Mapping entries must be non-empty ({})", source),
                ));
            }
        }
        Ok(())
    }
}

/// Configs found under a root, merged, plus the files they came from.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredConfig {
    pub config: UpgradeConfig,
    pub sources: Vec<String>,
}

/// Find and merge every upgrade config under `root`, in sorted path order.
pub fn discover(root: &Path, fs: &dyn FileSystem) -> Result<DiscoveredConfig> {
    let mut files = Vec::new();
    find_config_files(root, fs, &mut files)?;
    files.sort();

    let mut discovered = DiscoveredConfig::default();
    for file in files {
        let config = UpgradeConfig::load(&file, fs)?;
        let relative = relative_path(root, &file);
        log_status!(
            "config",
            "Loaded {} mapping(s) from {}",
            config.mappings.len(),
            relative
        );
        discovered.config.merge(config);
        discovered.sources.push(relative);
    }

    Ok(discovered)
}

fn find_config_files(dir: &Path, fs: &dyn FileSystem, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs.list(dir)? {
        let name = entry.file_name();
        if entry.is_dir {
            if !CONFIG_DISCOVERY_SKIP_DIRS.contains(&name.as_str()) {
                find_config_files(&entry.path, fs, files)?;
            }
        } else if UPGRADE_CONFIG_FILES.contains(&name.as_str()) {
            files.push(entry.path);
        }
    }
    Ok(())
}
