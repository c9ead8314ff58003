//! # Prediction Endpoints
//!
//! The two audio-to-MIDI endpoints share one pipeline:
//!
//! 1. validate detection parameters and the declared filename
//! 2. acquire an isolated workspace and persist the upload into it
//! 3. invoke the engine on the blocking thread pool
//! 4. resolve the MIDI artifact the engine produced
//! 5. package the response
//!
//! They differ only in packaging: `/predict` embeds the artifact as base64
//! and releases the workspace before responding; `/predict/file` streams
//! the artifact directly and hands workspace ownership to the response
//! body, which removes it when the transfer finishes or aborts. On every
//! error path the workspace guard takes the tree down with it.

use crate::artifact::{resolve_artifact, ArtifactBody, MidiArtifact};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::transcription::{self, DetectionParams};
use crate::upload::{read_audio_field, UploadedAudio};
use crate::workspace::Workspace;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Success body for the inline `/predict` variant.
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub midi_base64: String,
    pub filename: String,
}

/// Run the request-to-artifact pipeline.
///
/// Validation happens before the workspace exists, so rejected requests
/// leave no directory behind. On success the caller receives the live
/// workspace together with the resolved artifact and decides how release
/// happens; on failure the workspace drops here and cleans itself up.
async fn run_prediction(
    state: &AppState,
    upload: UploadedAudio,
    params: DetectionParams,
) -> AppResult<(Workspace, MidiArtifact)> {
    params.validate()?;
    upload.validate()?;

    let request_id = Uuid::new_v4();
    let config = state.get_config();

    let workspace = Workspace::acquire(Path::new(&config.storage.scratch_dir), &request_id)?;
    let input_path = workspace.write_input(&upload.filename, &upload.bytes)?;

    let engine = Arc::clone(&state.engine);
    let output_dir = workspace.output_dir().to_path_buf();
    let inputs: Vec<PathBuf> = vec![input_path];

    // Model inference dominates request latency; run it on the blocking
    // pool so async workers keep serving other requests.
    state.increment_active_predictions();
    let outcome = web::block(move || {
        transcription::invoke(engine.as_ref(), &inputs, &output_dir, &params)
    })
    .await;
    state.decrement_active_predictions();
    outcome??;

    let artifact = resolve_artifact(workspace.output_dir(), &upload.filename)?;
    Ok((workspace, artifact))
}

/// Convert an uploaded audio file to MIDI, returned as base64.
///
/// ## Endpoint: `POST /predict`
///
/// Multipart field `file` plus optional query parameters
/// (`onset_threshold`, `frame_threshold`, `minimum_note_length`,
/// `minimum_frequency`, `maximum_frequency`).
///
/// ## Response:
/// ```json
/// { "midi_base64": "TVRoZC4uLg==", "filename": "song.mid" }
/// ```
pub async fn predict(
    state: web::Data<AppState>,
    payload: Multipart,
    query: web::Query<DetectionParams>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let upload = read_audio_field(payload, config.storage.max_upload_bytes).await?;

    let (workspace, artifact) = run_prediction(&state, upload, query.into_inner()).await?;

    let midi_bytes = std::fs::read(&artifact.path)
        .map_err(|e| AppError::Internal(format!("Failed to read MIDI artifact: {}", e)))?;

    // Inline variant: the workspace is gone before the response exists.
    workspace.release()?;

    Ok(HttpResponse::Ok().json(PredictionResponse {
        midi_base64: BASE64.encode(&midi_bytes),
        filename: artifact.filename,
    }))
}

/// Convert an uploaded audio file to MIDI, returned as the raw file.
///
/// ## Endpoint: `POST /predict/file`
///
/// Same inputs as `/predict`; the response body is the MIDI file itself
/// with `Content-Type: audio/midi` and an attachment filename hint.
/// Workspace removal rides on the response body's lifetime.
pub async fn predict_file(
    state: web::Data<AppState>,
    payload: Multipart,
    query: web::Query<DetectionParams>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let upload = read_audio_field(payload, config.storage.max_upload_bytes).await?;

    let (workspace, artifact) = run_prediction(&state, upload, query.into_inner()).await?;

    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to open MIDI artifact: {}", e)))?;

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(artifact.filename.clone())],
    };

    Ok(HttpResponse::Ok()
        .content_type("audio/midi")
        .insert_header(disposition)
        .streaming(ArtifactBody::new(file, workspace)))
}
