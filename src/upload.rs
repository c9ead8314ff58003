//! # Upload Handling
//!
//! Reads the audio file out of the multipart request body and validates
//! its declared filename against the extension allow-list.
//!
//! Validation is filename-based only - no content sniffing of the audio
//! bytes. A mis-extensioned file is accepted here and left for the engine
//! to reject. The check is pure and runs before any workspace I/O, so a
//! rejected upload leaves no side effects behind.

use crate::error::{AppError, AppResult};
use actix_multipart::{Field, Multipart};
use futures_util::stream::StreamExt;
use std::path::Path;

/// Audio formats the service accepts, matched case-insensitively against
/// the filename's extension.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "flac", "m4a"];

/// One uploaded audio file: the declared filename plus the raw bytes.
/// Transient - dropped as soon as the bytes are written into a workspace.
#[derive(Debug)]
pub struct UploadedAudio {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedAudio {
    /// Check the declared filename: present, non-empty, and carrying an
    /// allow-listed extension.
    pub fn validate(&self) -> AppResult<()> {
        validate_filename(&self.filename)
    }
}

/// Validate a declared filename against the allow-list.
pub fn validate_filename(filename: &str) -> AppResult<()> {
    if filename.is_empty() {
        return Err(AppError::InvalidInput("No filename provided".to_string()));
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::InvalidInput(format!(
            "Unsupported file format. Allowed: {}",
            ALLOWED_EXTENSIONS
                .map(|ext| format!(".{}", ext))
                .join(", ")
        ))),
    }
}

/// Read the `file` field out of a multipart upload.
///
/// Collects the field's chunks into memory, enforcing the configured size
/// cap as they arrive. A request without a `file` field, or one exceeding
/// the cap, is rejected as invalid input. The filename is taken verbatim
/// from the content disposition; an absent filename becomes the empty
/// string so validation can report it.
pub async fn read_audio_field(
    mut payload: Multipart,
    max_bytes: usize,
) -> AppResult<UploadedAudio> {
    let mut audio: Option<UploadedAudio> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let (field_name, filename) = {
            let content_disposition = field.content_disposition().ok_or_else(|| {
                AppError::InvalidInput("Missing content disposition".to_string())
            })?;

            let name = content_disposition
                .get_name()
                .ok_or_else(|| AppError::InvalidInput("Missing field name".to_string()))?
                .to_string();

            let filename = content_disposition
                .get_filename()
                .unwrap_or_default()
                .to_string();

            (name, filename)
        };

        if field_name != "file" {
            // Drain unrelated fields so the next one can be read.
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| AppError::InvalidInput(format!("Chunk error: {}", e)))?;
            }
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::InvalidInput(format!("Chunk error: {}", e)))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::InvalidInput(format!(
                    "File too large (max: {} bytes)",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        audio = Some(UploadedAudio { filename, bytes });
    }

    audio.ok_or_else(|| AppError::InvalidInput("No audio file provided".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_listed_extensions_pass() {
        for name in ["song.wav", "song.mp3", "song.ogg", "song.flac", "song.m4a"] {
            assert!(validate_filename(name).is_ok(), "{} should pass", name);
        }
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        for name in ["SONG.WAV", "Track.Mp3", "clip.FLAC"] {
            assert!(validate_filename(name).is_ok(), "{} should pass", name);
        }
    }

    #[test]
    fn test_disallowed_extensions_fail() {
        for name in ["track.xyz", "notes.txt", "song.aiff", "archive.tar.gz"] {
            assert!(validate_filename(name).is_err(), "{} should fail", name);
        }
    }

    #[test]
    fn test_missing_filename_fails() {
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn test_missing_extension_fails() {
        assert!(validate_filename("song").is_err());
        assert!(validate_filename("song.").is_err());
    }

    #[test]
    fn test_validation_is_pure() {
        // Rejection must not have created anything on disk; the check
        // never touches the filesystem in the first place.
        let upload = UploadedAudio {
            filename: "track.xyz".to_string(),
            bytes: vec![0u8; 16],
        };
        assert!(upload.validate().is_err());
    }
}
