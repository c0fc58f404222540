//! Final storage for assembled uploads.

use std::path::Path;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::ScopeId;

/// Destination for a fully assembled upload.
///
/// The store owns content validation: it sniffs the bytes and rejects a
/// file whose format does not match the declared content type. The upload
/// core never re-checks this.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the store type name (e.g., "local").
    fn store_type(&self) -> &str;

    /// Take ownership of the file at `source` and return its public reference.
    ///
    /// On success the source path may no longer exist. On failure it is
    /// left untouched so the caller can clean it up.
    async fn store(
        &self,
        source: &Path,
        scope_id: ScopeId,
        content_type: &str,
        declared_size: i64,
    ) -> AppResult<String>;

    /// Remove a previously stored blob that ended up unreferenced.
    async fn discard(&self, _reference: &str) -> AppResult<()> {
        Ok(())
    }
}
