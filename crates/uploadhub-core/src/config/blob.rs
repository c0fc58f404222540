//! Final blob placement configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where assembled uploads end up and how they are referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Root directory; files land in `{root_path}/{scope_id}/`.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Prefix of the public reference returned to clients.
    #[serde(default = "default_public_path_prefix")]
    pub public_path_prefix: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            public_path_prefix: default_public_path_prefix(),
        }
    }
}

fn default_root_path() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_public_path_prefix() -> String {
    "/api/scopes".to_string()
}
