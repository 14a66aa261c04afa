//! The process-wide metadata record: corpus length statistics and the
//! barrel allocation cursor.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// `{total_doc_length, forward_index_length, last_barrel}`.
///
/// Persisted as a small JSON file so operators can inspect it directly;
/// writers use the same temp-then-rename discipline as the binary
/// containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetadata {
    /// Sum of forward-index document lengths (title + abstract tokens).
    pub total_doc_length: u64,
    /// Number of documents in the forward index.
    pub forward_index_length: u64,
    /// Highest allocated barrel ID.
    pub last_barrel: u32,
}

impl EngineMetadata {
    /// Average document length, the BM25 normalization denominator.
    ///
    /// An empty index reports 1.0 so the ranker never divides by zero.
    pub fn avg_doc_length(&self) -> f64 {
        if self.forward_index_length == 0 {
            1.0
        } else {
            self.total_doc_length as f64 / self.forward_index_length as f64
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize metadata")?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write temp metadata {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move metadata into place at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Persisted metadata");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read metadata {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse metadata {}", path.display()))
    }
}
