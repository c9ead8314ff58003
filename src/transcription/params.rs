//! Note-detection parameters passed through to the engine unmodified.

use crate::error::{AppError, AppResult};
use serde::Deserialize;

fn default_onset_threshold() -> f64 {
    0.5
}

fn default_frame_threshold() -> f64 {
    0.3
}

fn default_minimum_note_length() -> f64 {
    58.0
}

/// Tunable detection parameters for one prediction request.
///
/// Deserialized straight from the query string; every field falls back to
/// the engine's recommended default when absent. The thresholds gate note
/// onsets/continuations in the model's output; the frequency bounds
/// restrict which pitches are considered at all.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionParams {
    /// Onset threshold, 0.0 to 1.0
    #[serde(default = "default_onset_threshold")]
    pub onset_threshold: f64,

    /// Frame threshold, 0.0 to 1.0
    #[serde(default = "default_frame_threshold")]
    pub frame_threshold: f64,

    /// Minimum note length in milliseconds
    #[serde(default = "default_minimum_note_length")]
    pub minimum_note_length: f64,

    /// Minimum frequency in Hz (no bound when absent)
    #[serde(default)]
    pub minimum_frequency: Option<f64>,

    /// Maximum frequency in Hz (no bound when absent)
    #[serde(default)]
    pub maximum_frequency: Option<f64>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            onset_threshold: default_onset_threshold(),
            frame_threshold: default_frame_threshold(),
            minimum_note_length: default_minimum_note_length(),
            minimum_frequency: None,
            maximum_frequency: None,
        }
    }
}

impl DetectionParams {
    /// Reject out-of-range values at the boundary, before any workspace is
    /// created or the engine is invoked. The frequency bounds are
    /// pass-through and carry no range constraint.
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.onset_threshold) {
            return Err(AppError::InvalidInput(format!(
                "onset_threshold must be between 0.0 and 1.0, got {}",
                self.onset_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.frame_threshold) {
            return Err(AppError::InvalidInput(format!(
                "frame_threshold must be between 0.0 and 1.0, got {}",
                self.frame_threshold
            )));
        }

        if self.minimum_note_length < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "minimum_note_length must be non-negative, got {}",
                self.minimum_note_length
            )));
        }

        Ok(())
    }
}
