//! Built-in conventions describing the layout of a stock project.

/// Rules in the order they run when no explicit list is given.
/// Later rules see earlier rules' output.
pub const DEFAULT_RULE_ORDER: &[&str] = &["config-classes", "lang-yaml", "lang-keys", "template-keys"];

/// Root keys under which service registrations live in project config.
pub const SERVICE_REGISTRATION_KEYS: &[&str] = &["Injector", "SilverStripe\\Core\\Injector\\Injector"];

/// Prefix marking a config value as a reference to a registered service.
pub const SERVICE_REFERENCE_PREFIX: &str = "%$";

/// Project-config files: YAML under a `_config` directory.
pub const CONFIG_PATH_PATTERN: &str = r"(^|/)_config/(.+/)?[^/]+\.ya?ml$";

/// Locale YAML files: directly under a `lang` directory.
pub const LANG_YAML_PATH_PATTERN: &str = r"(^|/)lang/[^/]+\.ya?ml$";

/// Locale key sources: `.js`/`.json` directly under `lang/src`.
pub const LANG_KEYS_PATH_PATTERN: &str = r"(^|/)lang/src/[^/]+\.(js|json)$";

/// Templates.
pub const TEMPLATE_PATH_PATTERN: &str = r"\.ss$";

/// Extensions the disk collection yields. Anything else is never read.
pub const COLLECTED_EXTENSIONS: &[&str] = &["yml", "yaml", "json", "js", "ss", "php"];

/// Directories skipped at any depth by the disk collection.
pub const COLLECTION_SKIP_DIRS: &[&str] = &[".git", ".svn", ".hg", "node_modules", "vendor"];

/// Directories skipped at any depth during config discovery.
///
/// `vendor` is walked: installed modules ship their own upgrade configs there.
pub const CONFIG_DISCOVERY_SKIP_DIRS: &[&str] = &[".git", ".svn", ".hg", "node_modules"];

/// File names recognised as upgrade configs.
pub const UPGRADE_CONFIG_FILES: &[&str] = &[".upgrade.yml", ".upgrade.yaml", ".upgrade.json"];

/// Indent used when re-serialising locale key files.
pub const LANG_KEYS_INDENT: &[u8] = b"    ";

pub fn default_rule_order() -> Vec<String> {
    DEFAULT_RULE_ORDER.iter().map(|s| s.to_string()).collect()
}

pub fn service_registration_keys() -> Vec<String> {
    SERVICE_REGISTRATION_KEYS.iter().map(|s| s.to_string()).collect()
}
