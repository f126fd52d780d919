// Writes rendered artifacts to disk
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::Artifact;
use crate::config::OverwritePolicy;
use crate::error::GenerationError;

/// What happened to one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Target already held the same bytes
    Unchanged,
    /// Target exists and its category may not be overwritten
    Skipped,
}

/// Applies the overwrite policy and writes artifacts, creating directories as needed
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactWriter;

impl ArtifactWriter {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate artifacts ignore `policy` and are always brought up to date
    pub fn write(
        &self,
        artifact: &Artifact,
        policy: &OverwritePolicy,
    ) -> Result<WriteOutcome, GenerationError> {
        let path = artifact.path.as_path();
        let io_error = |source: std::io::Error| GenerationError::Io {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() {
            if !artifact.aggregate && !policy.allows(artifact.category) {
                warn!(path = %path.display(), category = %artifact.category, "Target exists and overwrite is disabled, skipping");
                return Ok(WriteOutcome::Skipped);
            }
            let existing = fs::read(path).map_err(io_error)?;
            if existing == artifact.contents.as_bytes() {
                debug!(path = %path.display(), "Artifact unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        ensure_parent(path).map_err(io_error)?;
        fs::write(path, &artifact.contents).map_err(io_error)?;
        debug!(path = %path.display(), category = %artifact.category, "Wrote artifact");
        Ok(WriteOutcome::Written)
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
