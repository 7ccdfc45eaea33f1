// src/tracking/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::platform::PlatformInfo;
use crate::tracking::error::TrackingError;

/// Upper frame rate advertised to hosts in the capability descriptor.
pub const MAX_TRACKING_FREQUENCY: u32 = 60;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Uninitialized,
    Ready,
    Tracking,
    Paused,
    Calibrating,
    Error,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Tracking => "tracking",
            Self::Paused => "paused",
            Self::Calibrating => "calibrating",
            Self::Error => "error",
        }
    }

    /// Tracking or paused: the engine holds the camera.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Tracking | Self::Paused)
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AccuracyMode {
    Low,    // cheapest pipeline, coarse gaze
    Medium,
    High,   // full landmark refinement
}

impl AccuracyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Default for AccuracyMode {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for AccuracyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyMode {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TrackingError::InvalidAccuracyMode(s.to_string())),
        }
    }
}

// Settings files accept the same tokens as the method channel.
impl TryFrom<String> for AccuracyMode {
    type Error = TrackingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A calibration target or sample in normalized screen coordinates.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationPoint {
    pub x: f64,
    pub y: f64,
}

impl CalibrationPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub has_camera: bool,
    pub has_front_camera: bool,
    pub supports_eye_tracking: bool,
    pub supports_head_pose: bool,
    pub supports_face_detection: bool,
    pub supports_calibration: bool,
    pub max_tracking_frequency: u32,
    pub platform: String,
}

impl Capabilities {
    pub fn for_platform(info: &PlatformInfo, max_tracking_frequency: u32) -> Self {
        Self {
            has_camera: true,
            has_front_camera: info.has_front_camera,
            supports_eye_tracking: true,
            supports_head_pose: true,
            supports_face_detection: true,
            supports_calibration: true,
            max_tracking_frequency,
            platform: info.platform.tag().to_string(),
        }
    }
}

/// Values the engine needs when (re)configuring its capture pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    pub tracking_frequency_hz: u32,
    pub accuracy_mode: AccuracyMode,
    pub background_tracking: bool,
}
