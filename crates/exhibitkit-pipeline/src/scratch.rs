// SPDX-License-Identifier: MIT
//
// Run-scoped scratch storage.
//
// Each pipeline invocation owns one scratch area exclusively for its
// lifetime. Dropping the handle removes the directory on every exit path,
// including unwinds, so concurrent runs never share intermediate files.

use std::path::{Path, PathBuf};

use exhibitkit_core::error::{ExhibitError, Result};
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

/// Transient working area for one pipeline run.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        let dir = TempDir::with_prefix("exhibitkit-")
            .map_err(|err| ExhibitError::Storage(format!("cannot create scratch area: {err}")))?;
        debug!(path = %dir.path().display(), "scratch area created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A collision-free path for an intermediate file.
    pub fn unique_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{stem}_{}.{extension}", Uuid::new_v4().simple()))
    }
}
