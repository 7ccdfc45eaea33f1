// src/tracking/session.rs
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::settings::TrackerConfig;
use crate::tracking::calibration::CalibrationAccumulator;
use crate::tracking::types::{AccuracyMode, EngineSettings, TrackingState};

/// Tracking status and configuration for one controller.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub created_at: String,
    pub state: TrackingState,
    pub initialized: bool,
    pub has_camera_permission: bool,
    pub tracking_frequency_hz: u32,
    pub accuracy_mode: AccuracyMode,
    pub background_tracking_enabled: bool,
    #[serde(skip)]
    pub calibration: CalibrationAccumulator,
}

impl Session {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339(),
            state: TrackingState::Uninitialized,
            initialized: false,
            has_camera_permission: false,
            tracking_frequency_hz: config.default_tracking_frequency,
            accuracy_mode: config.default_accuracy_mode,
            background_tracking_enabled: config.background_tracking,
            calibration: CalibrationAccumulator::new(),
        }
    }

    pub fn calibration_active(&self) -> bool {
        self.calibration.is_active()
    }

    pub fn calibration_accuracy(&self) -> f64 {
        self.calibration.accuracy()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tracking_frequency_hz: self.tracking_frequency_hz,
            accuracy_mode: self.accuracy_mode,
            background_tracking: self.background_tracking_enabled,
        }
    }

    /// Back to `Uninitialized`. Requested configuration is kept.
    pub fn reset(&mut self) {
        self.state = TrackingState::Uninitialized;
        self.initialized = false;
        self.calibration.clear();
    }

    pub fn invariants_hold(&self) -> bool {
        match self.state {
            TrackingState::Tracking | TrackingState::Paused => self.initialized && self.has_camera_permission,
            TrackingState::Calibrating => self.initialized && self.calibration.is_active(),
            TrackingState::Uninitialized => !self.initialized,
            _ => true,
        }
    }
}
