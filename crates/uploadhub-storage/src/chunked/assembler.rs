//! Chunk assembler: concatenates chunks into one transient file.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use uploadhub_core::error::{AppError, ErrorKind};
use uploadhub_core::result::AppResult;
use uploadhub_core::types::UploadSessionId;

use super::store::ChunkStore;

/// Prefix of the transient file built inside the session directory.
pub const ASSEMBLED_FILE_PREFIX: &str = "assembled";

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFile {
    /// Location of the concatenated bytes.
    pub path: PathBuf,
    /// Bytes written.
    pub size_bytes: u64,
}

/// Assembles uploaded chunks into a single file.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    /// Source of chunk files.
    store: ChunkStore,
}

impl ChunkAssembler {
    /// Create a new chunk assembler.
    pub fn new(store: ChunkStore) -> Self {
        Self { store }
    }

    /// Stream chunks `0..total_chunks` in ascending order into a fresh
    /// `assembled-{attempt}.upload` inside the session directory.
    ///
    /// Each call writes its own file, so overlapping completions of one
    /// session never share an output.
    ///
    /// A chunk file missing at read time fails the assembly even if the
    /// index said it was there. On any failure the partial output is
    /// removed and the chunks are left alone.
    pub async fn assemble(
        &self,
        session_id: UploadSessionId,
        total_chunks: i32,
    ) -> AppResult<AssembledFile> {
        tracing::info!(session_id = %session_id, total_chunks, "Assembling chunks");

        let path = self
            .store
            .session_dir(session_id)
            .join(format!("{ASSEMBLED_FILE_PREFIX}-{}.upload", Uuid::new_v4()));
        match self.write_all_chunks(session_id, total_chunks, &path).await {
            Ok(size_bytes) => {
                tracing::info!(session_id = %session_id, bytes = size_bytes, "Assembly complete");
                Ok(AssembledFile { path, size_bytes })
            }
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    /// Remove a transient assembled file. A missing file is not an error.
    pub async fn discard(&self, assembled: &AssembledFile) -> AppResult<()> {
        match fs::remove_file(&assembled.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove assembled file: {}", assembled.path.display()),
                e,
            )),
        }
    }

    async fn write_all_chunks(
        &self,
        session_id: UploadSessionId,
        total_chunks: i32,
        path: &Path,
    ) -> AppResult<u64> {
        let mut out = fs::File::create(path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to create assembly file", e)
        })?;

        let mut total_bytes = 0u64;
        for index in 0..total_chunks {
            let chunk_path = self.store.chunk_path(session_id, index);
            let mut chunk = fs::File::open(&chunk_path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AppError::storage(format!(
                        "Chunk {index} of session {session_id} is missing on disk"
                    ))
                } else {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to open chunk {index} of session {session_id}"),
                        e,
                    )
                }
            })?;
            total_bytes += tokio::io::copy(&mut chunk, &mut out).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to copy chunk into assembly", e)
            })?;
        }

        out.flush().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to flush assembly file", e)
        })?;
        out.sync_all().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to sync assembly file", e)
        })?;
        Ok(total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_assembles_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        let id = UploadSessionId::new();
        store.write_chunk(id, 1, Bytes::from_static(b"BBBB")).await.unwrap();
        store.write_chunk(id, 2, Bytes::from_static(b"CC")).await.unwrap();
        store.write_chunk(id, 0, Bytes::from_static(b"AAAA")).await.unwrap();

        let assembler = ChunkAssembler::new(store.clone());
        let assembled = assembler.assemble(id, 3).await.unwrap();
        let second = assembler.assemble(id, 3).await.unwrap();
        assert_ne!(assembled.path, second.path);
        assembler.discard(&second).await.unwrap();
        assert_eq!(assembled.size_bytes, 10);
        assert_eq!(tokio::fs::read(&assembled.path).await.unwrap(), b"AAAABBBBCC");
        assert_eq!(store.list_chunk_indexes(id).await.unwrap(), vec![0, 1, 2]);

        assembler.discard(&assembled).await.unwrap();
        assert!(!assembled.path.exists());
        assembler.discard(&assembled).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_chunk_fails_and_cleans_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path()).await.unwrap();
        let id = UploadSessionId::new();
        store.write_chunk(id, 0, Bytes::from_static(b"AAAA")).await.unwrap();

        let assembler = ChunkAssembler::new(store.clone());
        let err = assembler.assemble(id, 2).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        let mut entries = tokio::fs::read_dir(store.session_dir(id)).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["chunk-0.part".to_string()]);
    }
}
