//! Postcard container persistence shared by the index structures.
//!
//! Writers serialize to a sibling temp file and atomically rename it into
//! place, so readers only ever observe a complete container. A container
//! that fails to parse surfaces `CorruptContainer` and is never partially
//! ingested.

use crate::error::{EngineError, IndexError, Result};
use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::path::Path;

/// Serialize `value` with postcard and atomically replace `path` with it.
pub(crate) fn save_container<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = postcard::to_allocvec(value)
        .with_context(|| format!("failed to serialize container for {}", path.display()))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)
        .with_context(|| format!("failed to write temp container {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move container into place at {}", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved container");
    Ok(())
}

/// Load a postcard container from `path`.
pub(crate) fn load_container<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read container {}", path.display()))?;
    postcard::from_bytes(&bytes).map_err(|e| {
        EngineError::from(IndexError::CorruptContainer {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
        .into()
    })
}
