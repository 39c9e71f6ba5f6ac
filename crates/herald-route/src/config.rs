//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Sentinel used when a payload does not name its service.
pub const UNKNOWN_SERVICE: &str = "未知服务";

/// Configuration for the parser engine and the built-in parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Titles derived from free text are cut to this many characters.
    pub max_title_chars: usize,
    /// Value stored in `service` when the payload does not name one.
    pub unknown_service: String,
    /// Batches larger than this are parsed on scoped worker threads.
    pub parallel_batch_threshold: usize,
    /// Upper bound on worker threads for a parallel batch.
    pub max_batch_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_title_chars: 50,
            unknown_service: UNKNOWN_SERVICE.to_string(),
            parallel_batch_threshold: 64,
            max_batch_workers: 4,
        }
    }
}
