// src/bridge/method_call.rs
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tracking::types::CalibrationPoint;

/// One call arriving over the host's method channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self { method: method.into(), arguments }
    }

    pub fn without_arguments(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success { result: result.into() }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error { code: code.into(), message: message.into() }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result } => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetPlatformVersion,
    Initialize,
    RequestCameraPermission,
    HasCameraPermission,
    GetState,
    StartTracking,
    StopTracking,
    PauseTracking,
    ResumeTracking,
    StartCalibration { points: Option<Vec<CalibrationPoint>> },
    AddCalibrationPoint { point: CalibrationPoint },
    FinishCalibration,
    ClearCalibration,
    GetCalibrationAccuracy,
    SetTrackingFrequency { fps: u32 },
    SetAccuracyMode { mode: String },
    EnableBackgroundTracking { enable: bool },
    GetCapabilities,
    Dispose,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandParseError {
    #[error("method not implemented: {0}")]
    UnknownMethod(String),

    #[error("invalid argument '{argument}' for {method}: {reason}")]
    InvalidArgument {
        method: &'static str,
        argument: &'static str,
        reason: String,
    },
}

fn argument<T: DeserializeOwned>(
    arguments: &Value,
    method: &'static str,
    key: &'static str,
) -> Result<Option<T>, CommandParseError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| CommandParseError::InvalidArgument {
                method,
                argument: key,
                reason: e.to_string(),
            }),
    }
}

fn required<T: DeserializeOwned>(
    arguments: &Value,
    method: &'static str,
    key: &'static str,
) -> Result<T, CommandParseError> {
    argument(arguments, method, key)?.ok_or_else(|| CommandParseError::InvalidArgument {
        method,
        argument: key,
        reason: "missing".to_string(),
    })
}

impl Command {
    pub fn parse(call: &MethodCall) -> Result<Self, CommandParseError> {
        let args = &call.arguments;
        let command = match call.method.as_str() {
            "getPlatformVersion" => Command::GetPlatformVersion,
            "initialize" => Command::Initialize,
            "requestCameraPermission" => Command::RequestCameraPermission,
            "hasCameraPermission" => Command::HasCameraPermission,
            "getState" => Command::GetState,
            "startTracking" => Command::StartTracking,
            "stopTracking" => Command::StopTracking,
            "pauseTracking" => Command::PauseTracking,
            "resumeTracking" => Command::ResumeTracking,
            "startCalibration" => Command::StartCalibration {
                points: argument(args, "startCalibration", "points")?,
            },
            "addCalibrationPoint" => Command::AddCalibrationPoint {
                point: required(args, "addCalibrationPoint", "point")?,
            },
            "finishCalibration" => Command::FinishCalibration,
            "clearCalibration" => Command::ClearCalibration,
            "getCalibrationAccuracy" => Command::GetCalibrationAccuracy,
            "setTrackingFrequency" => Command::SetTrackingFrequency {
                fps: required(args, "setTrackingFrequency", "fps")?,
            },
            "setAccuracyMode" => Command::SetAccuracyMode {
                mode: required(args, "setAccuracyMode", "mode")?,
            },
            "enableBackgroundTracking" => Command::EnableBackgroundTracking {
                enable: required(args, "enableBackgroundTracking", "enable")?,
            },
            "getCapabilities" => Command::GetCapabilities,
            "dispose" => Command::Dispose,
            other => return Err(CommandParseError::UnknownMethod(other.to_string())),
        };
        Ok(command)
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Command::GetPlatformVersion => "getPlatformVersion",
            Command::Initialize => "initialize",
            Command::RequestCameraPermission => "requestCameraPermission",
            Command::HasCameraPermission => "hasCameraPermission",
            Command::GetState => "getState",
            Command::StartTracking => "startTracking",
            Command::StopTracking => "stopTracking",
            Command::PauseTracking => "pauseTracking",
            Command::ResumeTracking => "resumeTracking",
            Command::StartCalibration { .. } => "startCalibration",
            Command::AddCalibrationPoint { .. } => "addCalibrationPoint",
            Command::FinishCalibration => "finishCalibration",
            Command::ClearCalibration => "clearCalibration",
            Command::GetCalibrationAccuracy => "getCalibrationAccuracy",
            Command::SetTrackingFrequency { .. } => "setTrackingFrequency",
            Command::SetAccuracyMode { .. } => "setAccuracyMode",
            Command::EnableBackgroundTracking { .. } => "enableBackgroundTracking",
            Command::GetCapabilities => "getCapabilities",
            Command::Dispose => "dispose",
        }
    }

    /// What the host receives when a call fails: `0.0` for the accuracy query,
    /// `false` for everything else.
    pub fn failure_value(method: &str) -> Value {
        match method {
            "getCalibrationAccuracy" => Value::from(0.0),
            _ => Value::Bool(false),
        }
    }
}
