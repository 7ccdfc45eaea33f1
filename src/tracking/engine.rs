// Tracking engine seam. A real computer-vision pipeline implements this trait;
// the controller only calls it after a command has passed its state guard.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::channels::EventChannels;
use crate::tracking::types::{CalibrationPoint, EngineSettings};

#[async_trait]
pub trait TrackingEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Hands the engine the channels it publishes gaze, eye state, head pose
    /// and face detection events on.
    fn attach(&self, _channels: Arc<EventChannels>) {}

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self, _settings: &EngineSettings) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        Ok(())
    }

    async fn configure(&self, _settings: &EngineSettings) -> Result<()> {
        Ok(())
    }

    async fn begin_calibration(&self, _targets: &[CalibrationPoint]) -> Result<()> {
        Ok(())
    }

    /// Returns the normalized residual for the sample, if the engine measured one.
    async fn calibration_sample(&self, _point: &CalibrationPoint) -> Result<Option<f64>> {
        Ok(None)
    }

    async fn finish_calibration(&self) -> Result<()> {
        Ok(())
    }

    async fn clear_calibration(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Engine used when no tracker is plugged in: accepts every call, publishes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl TrackingEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }
}
