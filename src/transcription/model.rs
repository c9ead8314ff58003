//! Model weights selection for the transcription engine.
//!
//! The model is resolved once at process start and shared read-only across
//! requests; nothing mutates it afterwards. The engine ships with the
//! ICASSP 2022 weights built in, so most deployments never configure an
//! explicit path.

use std::path::{Path, PathBuf};

/// Name of the weights the engine uses when no path is configured.
pub const DEFAULT_MODEL_NAME: &str = "icassp-2022";

/// Which model weights the engine should load.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    path: Option<PathBuf>,
}

impl ModelSelection {
    /// Resolve the selection from configuration. An empty string selects
    /// the engine's built-in default weights.
    pub fn from_config(model: &str) -> Self {
        let trimmed = model.trim();
        Self {
            path: if trimmed.is_empty() {
                None
            } else {
                Some(PathBuf::from(trimmed))
            },
        }
    }

    /// Explicit weights path, if one was configured.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human-readable identity for logs and diagnostics.
    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("{} (built-in)", DEFAULT_MODEL_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_selects_builtin_weights() {
        let selection = ModelSelection::from_config("");
        assert!(selection.path().is_none());
        assert!(selection.describe().contains(DEFAULT_MODEL_NAME));
    }

    #[test]
    fn test_configured_path_is_used() {
        let selection = ModelSelection::from_config("/opt/models/nmp.onnx");
        assert_eq!(selection.path(), Some(Path::new("/opt/models/nmp.onnx")));
    }

    #[test]
    fn test_whitespace_only_config_is_builtin() {
        let selection = ModelSelection::from_config("   ");
        assert!(selection.path().is_none());
    }
}
