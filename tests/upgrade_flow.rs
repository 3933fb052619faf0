use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use upgrader::config;
use upgrader::defaults::default_rule_order;
use upgrader::local_files::local;
use upgrader::output::{map_cmd_result_to_json, CliResponse};
use upgrader::{DiskCollection, Error, Upgrader};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "vendor/silverstripe/cms/.upgrade.yml",
        "mappings:\n  Page: SilverStripe\\CMS\\Model\\SiteTree\n  AssetAdmin: SilverStripe\\AssetAdmin\\AssetAdmin\n",
    );
    write(root, ".upgrade.yml", "skipConfigs:\n  - Member\nexcludedPaths:\n  - \"thirdparty/**\"\n");

    write(root, "app/_config/app.yml", "---\nName: app\n---\nPage:\n  extensions:\n    - '%$Member'\nInjector:\n  Member: Member\n");
    write(root, "app/lang/en.yml", "en:\n  Page:\n    TITLE: Page\n");
    write(root, "client/lang/src/en.json", "{\"AssetAdmin.TITLE\": \"Files\"}\n");
    write(root, "client/lang/src/de.json", "{invalid json");
    write(root, "templates/Layout/Page.ss", "<h1><%t Page.TITLE 'Page' %></h1>\n");
    write(root, "thirdparty/lib/_config/lib.yml", "Page: x\n");
    write(root, "app/src/Page.php", "<?php class Page {}\n");

    dir
}

#[test]
fn dry_run_reports_changes_without_touching_disk() {
    let dir = project();
    let root = dir.path();
    let fs = local();

    let discovered = config::discover(root, &fs).unwrap();
    let upgrader = Upgrader::from_config(&discovered.config, &default_rule_order()).unwrap();
    let collection = DiskCollection::new(root).excluding(&discovered.config.excluded_paths);
    let changes = upgrader.upgrade(&collection).unwrap();

    let mut changed: Vec<&str> = changes.changed_contents().keys().map(String::as_str).collect();
    changed.sort();
    assert_eq!(
        changed,
        vec![
            "app/_config/app.yml",
            "app/lang/en.yml",
            "client/lang/src/en.json",
            "templates/Layout/Page.ss",
        ]
    );
    assert_eq!(changes.warnings("client/lang/src/de.json").len(), 1);
    assert!(!changes.has_new_contents("thirdparty/lib/_config/lib.yml"));
    assert_eq!(read(root, "app/lang/en.yml"), "en:\n  Page:\n    TITLE: Page\n");
}

#[test]
fn apply_writes_every_changed_file() {
    let dir = project();
    let root = dir.path();
    let fs = local();

    let discovered = config::discover(root, &fs).unwrap();
    let upgrader = Upgrader::from_config(&discovered.config, &default_rule_order()).unwrap();
    let collection = DiskCollection::new(root).excluding(&discovered.config.excluded_paths);
    let changes = upgrader.upgrade(&collection).unwrap();

    assert_eq!(changes.apply(root, &fs).unwrap(), 4);

    let config_yaml = read(root, "app/_config/app.yml");
    assert!(config_yaml.starts_with("---\nName: app\n---\n"), "{}", config_yaml);
    assert!(config_yaml.contains("SilverStripe\\CMS\\Model\\SiteTree"), "{}", config_yaml);
    assert!(config_yaml.contains("%$Member"), "excluded reference must survive: {}", config_yaml);
    assert!(!config_yaml.contains("Member: Member"), "{}", config_yaml);

    assert_eq!(
        read(root, "templates/Layout/Page.ss"),
        "<h1><%t SilverStripe\\\\\\\\CMS\\\\\\\\Model\\\\\\\\SiteTree.TITLE 'Page' %></h1>\n"
    );
    assert_eq!(
        read(root, "client/lang/src/en.json"),
        "{\n    \"SilverStripe\\\\AssetAdmin\\\\AssetAdmin.TITLE\": \"Files\"\n}\n"
    );
    assert_eq!(read(root, "client/lang/src/de.json"), "{invalid json");
    assert_eq!(read(root, "thirdparty/lib/_config/lib.yml"), "Page: x\n");

    let second = upgrader
        .upgrade(&DiskCollection::new(root).excluding(&discovered.config.excluded_paths))
        .unwrap();
    assert!(second.changed_contents().is_empty(), "second run should change nothing");
}

#[test]
fn error_envelope_carries_code_and_exit_code() {
    let err = Error::validation_unknown_rule("php-classes", vec!["config-classes".to_string()]);
    let json = CliResponse::from_result(&Err(err.clone())).to_json().unwrap();

    assert!(json.contains("\"success\": false"));
    assert!(json.contains("\"code\": \"validation.unknown_rule\""));

    let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));
    assert_eq!(exit_code, 2);
}

#[test]
fn cli_dry_run_prints_report_envelope() {
    let dir = project();

    let output = Command::new(env!("CARGO_BIN_EXE_upgrader"))
        .arg("upgrade")
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["command"], "upgrade");
    assert_eq!(response["data"]["dry_run"], true);
    assert_eq!(response["data"]["total_changed"], 4);
    assert_eq!(response["data"]["total_warnings"], 1);
    assert_eq!(read(dir.path(), "client/lang/src/en.json"), "{\"AssetAdmin.TITLE\": \"Files\"}\n");
}

#[test]
fn cli_rejects_unknown_rule_with_exit_code_2() {
    let dir = project();

    let output = Command::new(env!("CARGO_BIN_EXE_upgrader"))
        .args(["upgrade", "--rule", "php-classes"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["error"]["code"], "validation.unknown_rule");
}
