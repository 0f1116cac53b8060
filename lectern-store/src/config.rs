//! Data manager configuration.

use lectern_model::DataKind;
use lectern_persist::PathResolver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where each entity type lives on disk.
///
/// Type `kind` is stored under `{root}/{kind}` and exported to
/// `{export_root}/{kind}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataManagerConfig {
    pub root: PathBuf,
    pub export_root: PathBuf,
    /// Native file extension, without the dot.
    pub extension: String,
    /// Thread name of the presentation context.
    pub context_name: String,
}

impl Default for DataManagerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            export_root: PathBuf::from("data").join("export"),
            extension: "json".to_string(),
            context_name: "lectern-presentation".to_string(),
        }
    }
}

impl DataManagerConfig {
    /// Config rooted at `root`, exporting to `{root}/export`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            export_root: root.join("export"),
            root,
            ..Self::default()
        }
    }

    pub fn data_path(&self, kind: DataKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    pub fn export_path(&self, kind: DataKind) -> PathBuf {
        self.export_root.join(kind.as_str())
    }

    pub fn resolver_for(&self, kind: DataKind) -> PathResolver {
        PathResolver::from_paths(self.data_path(kind), self.export_path(kind), &self.extension)
    }
}
