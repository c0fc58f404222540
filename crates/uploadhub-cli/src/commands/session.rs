//! Upload session inspection commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use uploadhub_core::error::AppError;
use uploadhub_core::types::UploadSessionId;
use uploadhub_service::UploadStack;

use crate::output::{self, OutputFormat};

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Show one session with its chunk progress
    Show {
        /// Session id
        id: Uuid,
    },
}

/// One session as printed by the CLI.
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Scope")]
    scope_id: String,
    #[tabled(rename = "Actor")]
    actor_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    content_type: String,
    #[tabled(rename = "Size")]
    total_size_bytes: i64,
    #[tabled(rename = "Chunks")]
    progress: String,
    #[tabled(rename = "Expires")]
    expires_at: String,
    #[tabled(rename = "Reference")]
    file_reference: String,
}

/// Execute session commands
pub async fn execute(args: &SessionArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    super::require_shared_store(&config)?;
    let stack = UploadStack::from_config(&config).await?;

    match &args.command {
        SessionCommand::Show { id } => {
            let id = UploadSessionId::from(*id);
            let session = stack
                .store
                .find(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Upload session {id} not found")))?;
            let uploaded = stack.store.count_chunks(id).await?;

            let row = SessionRow {
                id: session.id.to_string(),
                scope_id: session.scope_id.to_string(),
                actor_id: session.actor_id.to_string(),
                status: session.status.to_string(),
                content_type: session.content_type.clone(),
                total_size_bytes: session.total_size_bytes,
                progress: if session.status.is_terminal() {
                    format!("-/{}", session.total_chunks)
                } else {
                    format!("{uploaded}/{}", session.total_chunks)
                },
                expires_at: session.expires_at.to_rfc3339(),
                file_reference: session.file_reference.clone().unwrap_or_default(),
            };
            output::print_list(&[row], format);
        }
    }

    if let Some(pool) = &stack.pool {
        pool.close().await;
    }
    Ok(())
}
