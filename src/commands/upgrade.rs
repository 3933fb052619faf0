use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use upgrader::change_set::FileReport;
use upgrader::config::{self, UpgradeConfig};
use upgrader::defaults;
use upgrader::local_files::{self, FileSystem};
use upgrader::{DiskCollection, Upgrader};

use crate::commands::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct UpgradeArgs {
    /// Project root to upgrade (default: current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Extra upgrade config, merged after the discovered ones
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Rule to run, in order (repeatable; default: all rules)
    #[arg(long = "rule", value_name = "NAME")]
    pub rules: Vec<String>,

    /// Write changed files to disk (default is dry-run)
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum UpgradeOutput {
    #[serde(rename = "upgrade")]
    Upgrade {
        root: String,
        dry_run: bool,
        config_sources: Vec<String>,
        rules: Vec<String>,
        files: Vec<FileReport>,
        total_changed: usize,
        total_warnings: usize,
        written: usize,
    },
}

pub fn run(args: UpgradeArgs, _global: &GlobalArgs) -> CmdResult<UpgradeOutput> {
    let root = expand_path(&args.path);
    if !root.is_dir() {
        return Err(upgrader::Error::validation_invalid_argument(
            "path",
            "Path is not a directory",
            Some(args.path.clone()),
            None,
        ));
    }

    let fs = local_files::local();
    let (merged, sources) = load_config(&root, args.config.as_deref(), &fs)?;

    let rule_names = if args.rules.is_empty() {
        defaults::default_rule_order()
    } else {
        args.rules.clone()
    };
    let upgrader = Upgrader::from_config(&merged, &rule_names)?;

    let collection = DiskCollection::new(root.clone()).excluding(&merged.excluded_paths);
    let changes = upgrader.upgrade(&collection)?;

    let written = if args.write {
        changes.apply(&root, &fs)?
    } else {
        0
    };

    let report = changes.report();

    Ok((
        UpgradeOutput::Upgrade {
            root: root.to_string_lossy().to_string(),
            dry_run: !args.write,
            config_sources: sources,
            rules: rule_names,
            files: report.files,
            total_changed: report.total_changed,
            total_warnings: report.total_warnings,
            written,
        },
        0,
    ))
}

fn load_config(
    root: &Path,
    explicit: Option<&str>,
    fs: &dyn FileSystem,
) -> upgrader::Result<(UpgradeConfig, Vec<String>)> {
    let discovered = config::discover(root, fs)?;
    let mut merged = discovered.config;
    let mut sources = discovered.sources;

    if let Some(path) = explicit {
        let path = expand_path(path);
        merged.merge(UpgradeConfig::load(&path, fs)?);
        sources.push(path.to_string_lossy().to_string());
    }

    Ok((merged, sources))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
