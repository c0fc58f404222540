//! Per-session chunk persistence on the local filesystem.
//!
//! Layout: `{root}/_chunk_sessions/{session_id}/chunk-{index}.part`. One
//! directory per session keeps removal a single recursive delete that can
//! never reach another session's data.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use uploadhub_core::error::{AppError, ErrorKind};
use uploadhub_core::result::AppResult;
use uploadhub_core::types::UploadSessionId;

/// Directory under the uploads root that holds session directories.
pub const SESSIONS_DIR: &str = "_chunk_sessions";

const CHUNK_PREFIX: &str = "chunk-";
const CHUNK_SUFFIX: &str = ".part";

/// Byte persistence for chunks, addressed by `(session id, chunk index)`.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    /// `{uploads root}/_chunk_sessions`.
    root: PathBuf,
}

impl ChunkStore {
    /// Create a chunk store under `uploads_root`, creating the sessions
    /// directory if needed.
    pub async fn new(uploads_root: impl AsRef<Path>) -> AppResult<Self> {
        let root = uploads_root.as_ref().join(SESSIONS_DIR);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create chunk root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Directory holding every session directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one session.
    pub fn session_dir(&self, session_id: UploadSessionId) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    /// Final path of one chunk.
    pub fn chunk_path(&self, session_id: UploadSessionId, index: i32) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("{CHUNK_PREFIX}{index}{CHUNK_SUFFIX}"))
    }

    /// Create the session directory.
    pub async fn create_session_dir(&self, session_id: UploadSessionId) -> AppResult<()> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create session directory: {}", dir.display()),
                e,
            )
        })
    }

    /// Write a chunk, replacing any previous payload for the same index.
    ///
    /// The bytes go to a uniquely named temp file that is then renamed over
    /// the chunk path, so readers never observe a half-written chunk and
    /// concurrent writers of one index resolve as last-writer-wins.
    pub async fn write_chunk(
        &self,
        session_id: UploadSessionId,
        index: i32,
        data: Bytes,
    ) -> AppResult<u64> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create session directory: {}", dir.display()),
                e,
            )
        })?;

        let target = self.chunk_path(session_id, index);
        let temp = dir.join(format!(".{CHUNK_PREFIX}{index}.{}.tmp", Uuid::new_v4()));

        if let Err(e) = write_file(&temp, &data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write chunk {index} for session {session_id}"),
                e,
            ));
        }

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit chunk {index} for session {session_id}"),
                e,
            ));
        }

        debug!(session_id = %session_id, index, bytes = data.len(), "Wrote chunk");
        Ok(data.len() as u64)
    }

    /// Whether a chunk file exists.
    pub async fn chunk_exists(&self, session_id: UploadSessionId, index: i32) -> AppResult<bool> {
        fs::try_exists(self.chunk_path(session_id, index))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to stat chunk", e))
    }

    /// Chunk indexes present on disk, ascending.
    pub async fn list_chunk_indexes(&self, session_id: UploadSessionId) -> AppResult<Vec<i32>> {
        let mut indexes = Vec::new();
        let mut entries = match fs::read_dir(self.session_dir(session_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(indexes),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to list chunks for session {session_id}"),
                    e,
                ));
            }
        };

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read session directory", e)
        })? {
            let name = entry.file_name();
            if let Some(index) = name.to_str().and_then(parse_chunk_name) {
                indexes.push(index);
            }
        }
        indexes.sort_unstable();
        Ok(indexes)
    }

    /// Remove one chunk. A missing chunk is not an error.
    pub async fn remove_chunk(&self, session_id: UploadSessionId, index: i32) -> AppResult<()> {
        match fs::remove_file(self.chunk_path(session_id, index)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove chunk {index} for session {session_id}"),
                e,
            )),
        }
    }

    /// Remove the whole session directory. A missing directory is not an
    /// error.
    pub async fn remove_session(&self, session_id: UploadSessionId) -> AppResult<()> {
        match fs::remove_dir_all(self.session_dir(session_id)).await {
            Ok(()) => {
                debug!(session_id = %session_id, "Removed chunk directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove chunk directory for session {session_id}"),
                e,
            )),
        }
    }

    /// Ids of every session directory on disk. Entries that are not
    /// session-id directories are skipped.
    pub async fn list_session_dirs(&self) -> AppResult<Vec<UploadSessionId>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list chunk sessions", e)
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read chunk sessions", e)
        })? {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_data().await?;
    Ok(())
}

fn parse_chunk_name(name: &str) -> Option<i32> {
    name.strip_prefix(CHUNK_PREFIX)?
        .strip_suffix(CHUNK_SUFFIX)?
        .parse::<i32>()
        .ok()
        .filter(|index| *index >= 0)
}
