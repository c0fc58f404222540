//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use uuid::Uuid;

use uploadhub_core::error::{AppError, ErrorKind};
use uploadhub_core::result::AppResult;
use uploadhub_core::traits::BlobStore;
use uploadhub_core::types::ScopeId;

use super::media::{MediaKind, SNIFF_LEN};

/// Stores validated uploads under `{root}/{scope_id}/{uuid}.{ext}`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Root directory for all stored files.
    root: PathBuf,
    /// Prefix of returned references, e.g. `/api/scopes`.
    public_prefix: String,
    /// Largest file accepted.
    max_file_size_bytes: i64,
}

impl LocalBlobStore {
    /// Create a new local blob store rooted at the given path.
    pub async fn new(
        root: impl AsRef<Path>,
        public_prefix: impl Into<String>,
        max_file_size_bytes: i64,
    ) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create blob root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
            max_file_size_bytes,
        })
    }

    fn reference_for(&self, scope_id: ScopeId, file_name: &str) -> String {
        format!("{}/{scope_id}/files/{file_name}", self.public_prefix)
    }

    /// Map a reference produced by this store back to its path.
    fn resolve_reference(&self, reference: &str) -> Option<PathBuf> {
        let rest = reference.strip_prefix(&self.public_prefix)?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let scope: ScopeId = parts.next()?.parse().ok()?;
        if parts.next()? != "files" {
            return None;
        }
        let name = parts.next()?;
        if parts.next().is_some() || name.is_empty() || name.starts_with('.') || name.contains('\\') {
            return None;
        }
        Some(self.root.join(scope.to_string()).join(name))
    }

    async fn read_header(path: &Path) -> AppResult<Vec<u8>> {
        let mut file = fs::File::open(path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to open assembled file", e)
        })?;
        let mut header = Vec::with_capacity(SNIFF_LEN);
        (&mut file)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut header)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to read assembled file", e)
            })?;
        Ok(header)
    }

    async fn move_into_place(source: &Path, target: &Path) -> AppResult<()> {
        if fs::rename(source, target).await.is_ok() {
            return Ok(());
        }
        // Different filesystem: copy, then drop the source.
        if let Err(e) = fs::copy(source, target).await {
            let _ = fs::remove_file(target).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to store file at {}", target.display()),
                e,
            ));
        }
        let _ = fs::remove_file(source).await;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn store_type(&self) -> &str {
        "local"
    }

    async fn store(
        &self,
        source: &Path,
        scope_id: ScopeId,
        content_type: &str,
        declared_size: i64,
    ) -> AppResult<String> {
        let declared = MediaKind::from_content_type(content_type).ok_or_else(|| {
            AppError::validation(
                "File type not allowed. Accepted: JPEG, PNG, WebP, HEIC, MP4, MOV",
            )
        })?;

        let metadata = fs::metadata(source).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Assembled upload file is missing", e)
        })?;
        let actual_size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
        if actual_size != declared_size {
            return Err(AppError::validation(format!(
                "Assembled file size {actual_size} does not match declared size {declared_size}"
            )));
        }
        if actual_size <= 0 {
            return Err(AppError::validation("File is empty"));
        }
        if actual_size > self.max_file_size_bytes {
            return Err(AppError::validation("File size exceeds allowed limit"));
        }

        let header = Self::read_header(source).await?;
        let detected = MediaKind::sniff(&header).ok_or_else(|| {
            AppError::validation("Assembled file content is not a supported media type")
        })?;
        if detected != declared {
            return Err(AppError::validation(
                "Assembled file content does not match declared content type",
            ));
        }

        let scope_dir = self.root.join(scope_id.to_string());
        fs::create_dir_all(&scope_dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create scope directory: {}", scope_dir.display()),
                e,
            )
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), detected.extension());
        let target = scope_dir.join(&file_name);
        Self::move_into_place(source, &target).await?;

        info!(scope_id = %scope_id, path = %target.display(), bytes = actual_size, "Stored upload");
        Ok(self.reference_for(scope_id, &file_name))
    }

    async fn discard(&self, reference: &str) -> AppResult<()> {
        let path = self
            .resolve_reference(reference)
            .ok_or_else(|| AppError::validation(format!("Unrecognised file reference: {reference}")))?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(reference, "Discarded stored file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to discard {reference}"),
                e,
            )),
        }
    }
}
