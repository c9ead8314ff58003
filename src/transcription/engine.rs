//! # Transcription Engine
//!
//! The engine boundary for audio-to-MIDI conversion. The pipeline only
//! depends on the [`TranscriptionEngine`] trait: paths in, files out,
//! failure possible. That keeps the request pipeline testable against fake
//! engines that deterministically write an artifact, write nothing, or
//! fail on demand, without touching real model inference.
//!
//! ## Key Responsibilities:
//! - **Invocation contract**: input paths + output directory + save flags
//!   + detection parameters, MIDI files written as a side effect
//! - **Failure containment**: every engine-internal failure surfaces as a
//!   single opaque error for the caller to classify
//! - **Version reporting**: a version string for the health probe, probed
//!   once at startup so health checks never block on the engine

use crate::config::EngineConfig;
use crate::transcription::model::ModelSelection;
use crate::transcription::params::DetectionParams;
use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Which output files the engine should produce.
///
/// The pipeline always asks for MIDI only; the remaining flags exist
/// because the engine's invocation contract carries them.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub save_midi: bool,
    pub sonify_midi: bool,
    pub save_model_outputs: bool,
    pub save_notes: bool,
}

impl SaveOptions {
    /// Save the MIDI artifact and nothing else: no sonified audio, no raw
    /// model-output dumps, no separate note-event dump.
    pub fn midi_only() -> Self {
        Self {
            save_midi: true,
            sonify_midi: false,
            save_model_outputs: false,
            save_notes: false,
        }
    }
}

/// The external transcription capability.
///
/// Implementations accept a list of input audio paths and write zero or
/// more output files into `output_dir`. The call is synchronous and
/// blocking; it dominates request latency, so callers run it on the
/// blocking thread pool.
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe the given audio files into `output_dir`.
    fn transcribe(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &SaveOptions,
        params: &DetectionParams,
    ) -> Result<()>;

    /// Engine version string, reported by the health probe.
    fn version(&self) -> &str;
}

/// Production engine backed by the Basic Pitch command-line front end.
///
/// The program writes its MIDI output into the positional output
/// directory; threshold parameters and optional extra outputs map onto
/// command-line flags. Model weights are selected once at construction and
/// never change afterwards.
pub struct BasicPitchEngine {
    program: PathBuf,
    model: ModelSelection,
    version: String,
}

impl BasicPitchEngine {
    /// Build the engine from configuration, probing the binary for its
    /// version string. Probe failure falls back to the configured version
    /// so `/health` always has something to report.
    pub fn from_config(config: &EngineConfig) -> Self {
        let program = PathBuf::from(&config.program);
        let model = ModelSelection::from_config(&config.model);
        let version = probe_version(&program).unwrap_or_else(|| config.version.clone());

        tracing::info!(
            program = %program.display(),
            model = %model.describe(),
            version = %version,
            "Transcription engine configured"
        );

        Self {
            program,
            model,
            version,
        }
    }

    fn build_args(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &SaveOptions,
        params: &DetectionParams,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        args.push(OsString::from(output_dir));
        for input in inputs {
            args.push(OsString::from(input));
        }

        // MIDI output is the front end's default; the other outputs are
        // opt-in flags.
        if options.sonify_midi {
            args.push("--sonify-midi".into());
        }
        if options.save_model_outputs {
            args.push("--save-model-outputs".into());
        }
        if options.save_notes {
            args.push("--save-note-events".into());
        }

        args.push("--onset-threshold".into());
        args.push(params.onset_threshold.to_string().into());
        args.push("--frame-threshold".into());
        args.push(params.frame_threshold.to_string().into());
        args.push("--minimum-note-length".into());
        args.push(params.minimum_note_length.to_string().into());

        if let Some(freq) = params.minimum_frequency {
            args.push("--minimum-frequency".into());
            args.push(freq.to_string().into());
        }
        if let Some(freq) = params.maximum_frequency {
            args.push("--maximum-frequency".into());
            args.push(freq.to_string().into());
        }

        if let Some(path) = self.model.path() {
            args.push("--model-path".into());
            args.push(OsString::from(path));
        }

        args
    }
}

impl TranscriptionEngine for BasicPitchEngine {
    fn transcribe(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &SaveOptions,
        params: &DetectionParams,
    ) -> Result<()> {
        if inputs.is_empty() {
            bail!("No input audio files given to the engine");
        }
        if !options.save_midi {
            // The front end cannot suppress its MIDI output.
            bail!("The basic-pitch front end always writes MIDI output");
        }

        let args = self.build_args(inputs, output_dir, options, params);

        tracing::debug!(
            program = %self.program.display(),
            input_count = inputs.len(),
            output_dir = %output_dir.display(),
            "Invoking transcription engine"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| {
                format!(
                    "Failed to launch transcription engine '{}'",
                    self.program.display()
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Engine exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        Ok(())
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Ask the engine binary for its version. Returns None when the binary is
/// missing, fails, or prints nothing usable.
fn probe_version(program: &Path) -> Option<String> {
    let output = Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Deterministic engines for exercising the pipeline without model
/// inference.
#[cfg(test)]
pub mod fake {
    use super::*;

    /// A complete single-track Standard MIDI File: header chunk plus one
    /// track containing only end-of-track.
    pub const FAKE_MIDI: &[u8] =
        b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x00\x60MTrk\x00\x00\x00\x04\x00\xff\x2f\x00";

    /// Writes one fixed MIDI artifact named after the input's stem, the
    /// way the real front end does.
    pub struct FixedArtifactEngine;

    impl TranscriptionEngine for FixedArtifactEngine {
        fn transcribe(
            &self,
            inputs: &[PathBuf],
            output_dir: &Path,
            options: &SaveOptions,
            _params: &DetectionParams,
        ) -> Result<()> {
            if !options.save_midi {
                return Ok(());
            }
            let stem = inputs
                .first()
                .and_then(|p| p.file_stem())
                .and_then(|s| s.to_str())
                .unwrap_or("input");
            let path = output_dir.join(format!("{}_basic_pitch.mid", stem));
            std::fs::write(path, FAKE_MIDI)?;
            Ok(())
        }

        fn version(&self) -> &str {
            "fake-engine 0.0.1"
        }
    }

    /// Always fails, standing in for malformed audio or an internal
    /// engine error.
    pub struct FailingEngine;

    impl TranscriptionEngine for FailingEngine {
        fn transcribe(
            &self,
            _inputs: &[PathBuf],
            _output_dir: &Path,
            _options: &SaveOptions,
            _params: &DetectionParams,
        ) -> Result<()> {
            bail!("synthetic engine failure")
        }

        fn version(&self) -> &str {
            "fake-engine 0.0.1"
        }
    }

    /// Completes without error but writes nothing, violating the output
    /// contract.
    pub struct SilentEngine;

    impl TranscriptionEngine for SilentEngine {
        fn transcribe(
            &self,
            _inputs: &[PathBuf],
            _output_dir: &Path,
            _options: &SaveOptions,
            _params: &DetectionParams,
        ) -> Result<()> {
            Ok(())
        }

        fn version(&self) -> &str {
            "fake-engine 0.0.1"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_engine(model: &str) -> BasicPitchEngine {
        BasicPitchEngine {
            program: PathBuf::from("basic-pitch"),
            model: ModelSelection::from_config(model),
            version: "test".to_string(),
        }
    }

    fn args_as_strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_output_dir_and_inputs_are_positional() {
        let engine = test_engine("");
        let args = engine.build_args(
            &[PathBuf::from("/work/in.wav")],
            Path::new("/work/output"),
            &SaveOptions::midi_only(),
            &DetectionParams::default(),
        );
        let args = args_as_strings(&args);
        assert_eq!(args[0], "/work/output");
        assert_eq!(args[1], "/work/in.wav");
    }

    #[test]
    fn test_midi_only_passes_no_extra_output_flags() {
        let engine = test_engine("");
        let args = engine.build_args(
            &[PathBuf::from("in.wav")],
            Path::new("out"),
            &SaveOptions::midi_only(),
            &DetectionParams::default(),
        );
        let args = args_as_strings(&args);
        assert!(!args.contains(&"--sonify-midi".to_string()));
        assert!(!args.contains(&"--save-model-outputs".to_string()));
        assert!(!args.contains(&"--save-note-events".to_string()));
        assert!(!args.contains(&"--model-path".to_string()));
    }

    #[test]
    fn test_thresholds_are_forwarded() {
        let engine = test_engine("");
        let params = DetectionParams {
            onset_threshold: 0.7,
            frame_threshold: 0.2,
            minimum_note_length: 100.0,
            minimum_frequency: Some(55.0),
            maximum_frequency: Some(880.0),
        };
        let args = engine.build_args(
            &[PathBuf::from("in.wav")],
            Path::new("out"),
            &SaveOptions::midi_only(),
            &params,
        );
        let args = args_as_strings(&args);
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--onset-threshold") + 1], "0.7");
        assert_eq!(args[pos("--frame-threshold") + 1], "0.2");
        assert_eq!(args[pos("--minimum-note-length") + 1], "100");
        assert_eq!(args[pos("--minimum-frequency") + 1], "55");
        assert_eq!(args[pos("--maximum-frequency") + 1], "880");
    }

    #[test]
    fn test_configured_model_path_is_forwarded() {
        let engine = test_engine("/opt/models/nmp.onnx");
        let args = engine.build_args(
            &[PathBuf::from("in.wav")],
            Path::new("out"),
            &SaveOptions::midi_only(),
            &DetectionParams::default(),
        );
        let args = args_as_strings(&args);
        let pos = args.iter().position(|a| a == "--model-path").unwrap();
        assert_eq!(args[pos + 1], "/opt/models/nmp.onnx");
    }

    #[test]
    fn test_fake_engine_writes_valid_midi_header() {
        assert!(fake::FAKE_MIDI.starts_with(b"MThd"));
    }
}
