// Event payloads delivered on the streaming channels
use chrono::Utc;
use serde::{Deserialize, Serialize};

fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GazeEvent {
    pub x: f64,
    pub y: f64,
    pub confidence: f32,
    pub timestamp: u64,
}

impl GazeEvent {
    pub fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self { x, y, confidence, timestamp: now_millis() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EyeStateEvent {
    pub left_eye_openness: f32,
    pub right_eye_openness: f32,
    pub is_blinking: bool,
    pub timestamp: u64,
}

impl EyeStateEvent {
    pub fn new(left_eye_openness: f32, right_eye_openness: f32, is_blinking: bool) -> Self {
        Self {
            left_eye_openness,
            right_eye_openness,
            is_blinking,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeadPoseEvent {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub timestamp: u64,
}

impl HeadPoseEvent {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll, timestamp: now_millis() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaceBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetectionEvent {
    pub face_detected: bool,
    pub confidence: f32,
    pub bounds: Option<FaceBounds>,
    pub timestamp: u64,
}

impl FaceDetectionEvent {
    pub fn detected(bounds: FaceBounds, confidence: f32) -> Self {
        Self {
            face_detected: true,
            confidence,
            bounds: Some(bounds),
            timestamp: now_millis(),
        }
    }

    pub fn lost() -> Self {
        Self {
            face_detected: false,
            confidence: 0.0,
            bounds: None,
            timestamp: now_millis(),
        }
    }
}
