//! # Transcription Module
//!
//! Audio-to-MIDI conversion behind an opaque engine boundary.
//!
//! ## Key Components:
//! - **Engine trait**: the external capability (paths in, MIDI files out,
//!   failure possible) plus the Basic Pitch production implementation
//! - **Detection parameters**: tunable thresholds passed through to the
//!   engine unmodified
//! - **Model selection**: weights resolved once at startup, shared
//!   read-only across requests
//! - **Invoker**: failure containment - whatever the engine raises is
//!   re-raised uniformly as `PredictionFailed`

pub mod engine;
pub mod model;
pub mod params;

pub use engine::{BasicPitchEngine, SaveOptions, TranscriptionEngine};
pub use params::DetectionParams;

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Invoke the engine for one request, MIDI output only.
///
/// The engine's internal failure modes are not interpreted or classified
/// here; they are contained so they cannot escape as unhandled faults. The
/// call blocks for the duration of model inference.
pub fn invoke(
    engine: &dyn TranscriptionEngine,
    inputs: &[PathBuf],
    output_dir: &Path,
    params: &DetectionParams,
) -> AppResult<()> {
    engine
        .transcribe(inputs, output_dir, &SaveOptions::midi_only(), params)
        .map_err(|err| AppError::PredictionFailed(format!("{:#}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::engine::fake::{FailingEngine, FixedArtifactEngine};

    #[test]
    fn test_invoke_contains_engine_failures() {
        let dir = tempfile::tempdir().unwrap();
        let result = invoke(
            &FailingEngine,
            &[PathBuf::from("clip.mp3")],
            dir.path(),
            &DetectionParams::default(),
        );
        match result {
            Err(AppError::PredictionFailed(msg)) => {
                assert!(msg.contains("synthetic engine failure"));
            }
            other => panic!("expected PredictionFailed, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_invoke_writes_artifact_through_fake() {
        let dir = tempfile::tempdir().unwrap();
        invoke(
            &FixedArtifactEngine,
            &[PathBuf::from("song.wav")],
            dir.path(),
            &DetectionParams::default(),
        )
        .unwrap();

        let produced: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(produced.len(), 1);
    }
}
