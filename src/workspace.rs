//! # Scratch Workspace Management
//!
//! Every prediction request gets its own isolated directory tree:
//!
//! ```text
//! {scratch_root}/predict-{request_id}-XXXX/
//!     {uploaded filename}
//!     output/
//! ```
//!
//! Uniqueness is what makes concurrent requests safe without locks - no
//! two requests ever share a path, so there is no shared mutable state to
//! protect. The directory is removed exactly once on every exit path:
//! explicitly via [`Workspace::release`] on the happy path, or by the
//! `TempDir` drop guard when an error unwinds the request. The
//! file-streaming response variant instead moves the workspace into the
//! response body, deferring removal until the transfer completes or is
//! aborted.

use crate::error::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Name of the sub-directory the engine writes its artifacts into.
const OUTPUT_DIR_NAME: &str = "output";

/// An exclusively-owned per-request scratch directory.
pub struct Workspace {
    dir: TempDir,
    output_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely-named workspace under `scratch_root`,
    /// with its `output/` sub-directory already in place.
    ///
    /// Creation failure (disk, permissions) is fatal to the request and
    /// is not retried.
    pub fn acquire(scratch_root: &Path, request_id: &Uuid) -> AppResult<Self> {
        fs::create_dir_all(scratch_root).map_err(|e| {
            AppError::Internal(format!(
                "Failed to create scratch root '{}': {}",
                scratch_root.display(),
                e
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("predict-{}-", request_id.simple()))
            .tempdir_in(scratch_root)
            .map_err(|e| AppError::Internal(format!("Failed to create workspace: {}", e)))?;

        let output_dir = dir.path().join(OUTPUT_DIR_NAME);
        fs::create_dir(&output_dir).map_err(|e| {
            AppError::Internal(format!("Failed to create output directory: {}", e))
        })?;

        tracing::debug!(workspace = %dir.path().display(), "Workspace acquired");

        Ok(Self { dir, output_dir })
    }

    /// Persist the uploaded bytes at `{workspace}/{filename}` and return
    /// the full input path. Only the final path component of the declared
    /// filename is used, so the file always lands inside the workspace.
    pub fn write_input(&self, filename: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| AppError::InvalidInput("No filename provided".to_string()))?;

        let input_path = self.dir.path().join(name);
        fs::write(&input_path, bytes).map_err(|e| {
            AppError::Internal(format!("Failed to write uploaded audio: {}", e))
        })?;

        Ok(input_path)
    }

    /// Root of this workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory the engine writes artifacts into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Remove the workspace tree, surfacing removal failures instead of
    /// swallowing them. Dropping a workspace also removes it, but only
    /// best-effort; the inline response path calls this before replying.
    pub fn release(self) -> AppResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| {
                AppError::Internal(format!(
                    "Failed to remove workspace '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::debug!(workspace = %path.display(), "Workspace released");
        Ok(())
    }
}
