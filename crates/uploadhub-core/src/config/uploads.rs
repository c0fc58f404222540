//! Chunked upload limits and quota configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Limits applied to resumable chunked uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Master switch; when off, new sessions are refused.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root under which `_chunk_sessions/{id}` directories are kept.
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Largest accepted declared file size.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: i64,
    /// Chunk size used when the client does not ask for one.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size_bytes: i32,
    /// Largest chunk size a client may request.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size_bytes: i32,
    /// Sliding expiry window, reset by every accepted chunk.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,
    /// Concurrent active sessions allowed per actor.
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions_per_actor: u64,
    /// Ceiling on the summed declared size of a scope's active sessions.
    #[serde(default = "default_max_active_bytes")]
    pub max_active_bytes_per_scope: i64,
    /// Declared content types a session may be opened for.
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            root_path: default_root_path(),
            max_file_size_bytes: default_max_file_size(),
            default_chunk_size_bytes: default_chunk_size(),
            max_chunk_size_bytes: default_max_chunk_size(),
            session_ttl_seconds: default_session_ttl(),
            max_active_sessions_per_actor: default_max_active_sessions(),
            max_active_bytes_per_scope: default_max_active_bytes(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_root_path() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_max_file_size() -> i64 {
    2 * 1024 * 1024 * 1024
}

fn default_chunk_size() -> i32 {
    8 * 1024 * 1024
}

fn default_max_chunk_size() -> i32 {
    16 * 1024 * 1024
}

fn default_session_ttl() -> u64 {
    48 * 60 * 60
}

fn default_max_active_sessions() -> u64 {
    3
}

fn default_max_active_bytes() -> i64 {
    16 * 1024 * 1024 * 1024
}

fn default_allowed_content_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/heic",
        "image/heif",
        "video/mp4",
        "video/quicktime",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
