//! One-shot expiry sweep.

use std::sync::Arc;

use clap::Args;

use uploadhub_core::error::AppError;
use uploadhub_service::UploadStack;
use uploadhub_worker::ExpiryReaper;

use crate::output::{self, OutputFormat};

/// Arguments for the sweep command
#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Maximum sessions to expire (defaults to worker.sweep_batch_limit)
    #[arg(long)]
    pub limit: Option<i64>,

    /// Skip the orphaned chunk directory scan
    #[arg(long)]
    pub no_orphans: bool,
}

/// Run one sweep against the configured store and chunk root
pub async fn execute(args: &SweepArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    super::require_shared_store(&config)?;
    let stack = UploadStack::from_config(&config).await?;

    let reaper = ExpiryReaper::new(
        Arc::clone(&stack.service),
        Arc::clone(&stack.store),
        stack.chunks.clone(),
        args.limit.unwrap_or(config.worker.sweep_batch_limit),
        config.worker.orphan_cleanup && !args.no_orphans,
    );
    let report = reaper.run().await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success("Sweep finished");
            output::print_kv("Expired", &report.expired.to_string());
            output::print_kv("Orphans removed", &report.orphans_removed.to_string());
            output::print_kv("Failed", &report.failed.to_string());
        }
    }

    if let Some(pool) = &stack.pool {
        pool.close().await;
    }
    Ok(())
}
