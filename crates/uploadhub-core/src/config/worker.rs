//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for the expiry sweep.
    #[serde(default = "default_expiry_sweep_cron")]
    pub expiry_sweep_cron: String,
    /// Maximum sessions expired per sweep.
    #[serde(default = "default_sweep_batch_limit")]
    pub sweep_batch_limit: i64,
    /// Also remove chunk directories that no active session owns.
    #[serde(default = "default_true")]
    pub orphan_cleanup: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            expiry_sweep_cron: default_expiry_sweep_cron(),
            sweep_batch_limit: default_sweep_batch_limit(),
            orphan_cleanup: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_expiry_sweep_cron() -> String {
    "0 */15 * * * *".to_string()
}

fn default_sweep_batch_limit() -> i64 {
    500
}
