//! # MIDI Artifact Resolution
//!
//! Locates the MIDI file the engine produced and packages it for the
//! response. Exactly one artifact is expected; zero is an output-contract
//! fault. When more than one `.mid` file exists, the lexicographically
//! smallest path is selected so identical directory contents always
//! resolve to the same artifact.

use crate::error::{AppError, AppResult};
use crate::workspace::Workspace;
use actix_web::web::Bytes;
use futures_util::Stream;
use std::fs;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

/// The MIDI file produced by the engine for one request.
#[derive(Debug)]
pub struct MidiArtifact {
    /// Where the engine wrote the file, inside the workspace's output
    /// directory
    pub path: PathBuf,
    /// Download filename derived from the upload: input stem + ".mid"
    pub filename: String,
}

/// Derive the client-facing filename from the uploaded one.
pub fn derived_filename(input_filename: &str) -> String {
    let stem = Path::new(input_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{}.mid", stem)
}

/// Find the engine's MIDI output in `output_dir`.
///
/// Fails with `NoArtifactProduced` when the engine completed without
/// writing any `.mid` file.
pub fn resolve_artifact(output_dir: &Path, input_filename: &str) -> AppResult<MidiArtifact> {
    let entries = fs::read_dir(output_dir).map_err(|e| {
        AppError::Internal(format!(
            "Failed to read output directory '{}': {}",
            output_dir.display(),
            e
        ))
    })?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::Internal(format!("Failed to read output directory entry: {}", e))
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("mid") {
            candidates.push(path);
        }
    }

    // Deterministic pick when the engine produced more than one file.
    candidates.sort();

    let path = candidates
        .into_iter()
        .next()
        .ok_or(AppError::NoArtifactProduced)?;

    Ok(MidiArtifact {
        path,
        filename: derived_filename(input_filename),
    })
}

/// Response body that streams the artifact while keeping the workspace
/// alive.
///
/// The file-transfer response cannot release the workspace before the
/// bytes are sent, so ownership moves in here; dropping the body - after
/// the transfer completes or the client aborts - removes the scratch
/// directory.
pub struct ArtifactBody {
    inner: ReaderStream<tokio::fs::File>,
    _workspace: Workspace,
}

impl ArtifactBody {
    pub fn new(file: tokio::fs::File, workspace: Workspace) -> Self {
        Self {
            inner: ReaderStream::new(file),
            _workspace: workspace,
        }
    }
}

impl Stream for ArtifactBody {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}
