//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler simultaneously.
//! All mutable data sits behind `Arc<RwLock<T>>`: many handlers can read
//! at once, only one can write, and the borrow checker keeps the pattern
//! honest.
//!
//! The engine handle is deliberately *not* behind a lock - it is resolved
//! once at startup and shared read-only for the life of the process, so an
//! `Arc<dyn TranscriptionEngine>` is all the protection it needs.

use crate::config::AppConfig;
use crate::transcription::TranscriptionEngine;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Shared application state, cloned into every worker.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,

    /// Request counters, updated by the observer middleware
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// The transcription engine, immutable after startup
    pub engine: Arc<dyn TranscriptionEngine>,

    /// When the server started
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Predictions currently blocked on engine inference
    pub active_predictions: u32,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Statistics for one API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<dyn TranscriptionEngine>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            engine,
            start_time: Instant::now(),
        }
    }

    /// Copy of the current configuration; cloning releases the read lock
    /// immediately so other handlers are never blocked on it.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record one finished request against its endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// A prediction entered the engine call.
    pub fn increment_active_predictions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_predictions += 1;
    }

    /// A prediction left the engine call (success or failure).
    pub fn decrement_active_predictions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_predictions > 0 {
            metrics.active_predictions -= 1;
        }
    }

    /// Consistent copy of the counters for the /metrics endpoint.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_predictions: metrics.active_predictions,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::engine::fake::FixedArtifactEngine;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default(), Arc::new(FixedArtifactEngine))
    }

    #[test]
    fn test_request_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn test_active_predictions_never_underflow() {
        let state = test_state();
        state.decrement_active_predictions();
        assert_eq!(state.get_metrics_snapshot().active_predictions, 0);

        state.increment_active_predictions();
        state.decrement_active_predictions();
        assert_eq!(state.get_metrics_snapshot().active_predictions, 0);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = test_state();
        state.record_endpoint_request("POST /predict", 100, false);
        state.record_endpoint_request("POST /predict", 300, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /predict"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 200.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_engine_is_shared_read_only() {
        let state = test_state();
        assert_eq!(state.engine.version(), "fake-engine 0.0.1");
    }
}
