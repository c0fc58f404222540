//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use uploadhub_service::CreateUploadSession;

/// Body of `POST .../uploads/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// Declared MIME type.
    #[validate(length(min = 1, max = 255, message = "content_type is required"))]
    pub content_type: String,
    /// Declared total size.
    pub total_size_bytes: i64,
    /// Requested chunk size.
    pub chunk_size_bytes: Option<i32>,
    /// Advisory file name.
    #[validate(length(max = 1024))]
    pub original_file_name: Option<String>,
}

impl From<CreateSessionRequest> for CreateUploadSession {
    fn from(req: CreateSessionRequest) -> Self {
        Self {
            content_type: req.content_type,
            total_size_bytes: req.total_size_bytes,
            chunk_size_bytes: req.chunk_size_bytes,
            original_file_name: req.original_file_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_type_fails_validation() {
        let req: CreateSessionRequest =
            serde_json::from_str(r#"{"content_type":"","total_size_bytes":8}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_optional_fields_default_to_none() {
        let req: CreateSessionRequest =
            serde_json::from_str(r#"{"content_type":"image/png","total_size_bytes":8}"#).unwrap();
        assert!(req.validate().is_ok());
        let create = CreateUploadSession::from(req);
        assert_eq!(create.chunk_size_bytes, None);
        assert_eq!(create.original_file_name, None);
    }
}
