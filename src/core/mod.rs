pub mod change_set;
pub mod collection;
pub mod config;
pub mod defaults;
pub mod error;
pub mod local_files;
pub mod rules;
pub mod upgrader;

// Re-export common types for convenience
pub use change_set::{ChangeSet, UpgradeReport, Warning};
pub use collection::{CodeCollection, DiskCollection, MemoryCollection, SourceItem};
pub use config::UpgradeConfig;
pub use error::{Error, ErrorCode, Result};
pub use upgrader::Upgrader;
