// Tracking session controller: state machine, calibration bookkeeping and the engine seam
pub mod calibration;
pub mod controller;
pub mod engine;
pub mod error;
pub mod session;
pub mod types;

pub use calibration::{CalibrationAccumulator, BASELINE_CALIBRATION_ACCURACY};
pub use controller::TrackingController;
pub use engine::{NullEngine, TrackingEngine};
pub use error::{TrackingError, TrackingResult};
pub use session::Session;
pub use types::{AccuracyMode, CalibrationPoint, Capabilities, EngineSettings, TrackingState, MAX_TRACKING_FREQUENCY};
