// The single command-dispatch interface every host adapter calls into
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::bridge::method_call::Command;
use crate::tracking::controller::TrackingController;
use crate::tracking::error::TrackingResult;

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> TrackingResult<Value>;
}

#[async_trait]
impl CommandHandler for TrackingController {
    async fn handle(&self, command: Command) -> TrackingResult<Value> {
        let value = match command {
            Command::GetPlatformVersion => json!(self.platform_version()),
            Command::Initialize => {
                self.initialize().await?;
                json!(true)
            }
            Command::RequestCameraPermission => json!(self.request_camera_permission().await?),
            Command::HasCameraPermission => json!(self.has_camera_permission().await),
            Command::GetState => json!(self.state().await),
            Command::StartTracking => {
                self.start_tracking().await?;
                json!(true)
            }
            Command::StopTracking => {
                self.stop_tracking().await?;
                json!(true)
            }
            Command::PauseTracking => {
                self.pause_tracking().await?;
                json!(true)
            }
            Command::ResumeTracking => {
                self.resume_tracking().await?;
                json!(true)
            }
            Command::StartCalibration { points } => {
                self.start_calibration(points).await?;
                json!(true)
            }
            Command::AddCalibrationPoint { point } => {
                self.add_calibration_point(point).await?;
                json!(true)
            }
            Command::FinishCalibration => {
                self.finish_calibration().await?;
                json!(true)
            }
            Command::ClearCalibration => {
                self.clear_calibration().await?;
                json!(true)
            }
            Command::GetCalibrationAccuracy => json!(self.calibration_accuracy().await),
            Command::SetTrackingFrequency { fps } => {
                self.set_tracking_frequency(fps).await?;
                json!(true)
            }
            Command::SetAccuracyMode { mode } => {
                self.set_accuracy_mode(&mode).await?;
                json!(true)
            }
            Command::EnableBackgroundTracking { enable } => {
                self.enable_background_tracking(enable).await?;
                json!(true)
            }
            Command::GetCapabilities => json!(self.capabilities()),
            Command::Dispose => {
                self.dispose().await?;
                json!(true)
            }
        };
        Ok(value)
    }
}
