// Eye tracking session controller and host bridges.
//
// The controller gates host commands on session state; a tracking engine
// plugs in behind `TrackingEngine` and publishes on the event channels.
pub mod bridge;
pub mod channels;
pub mod permission;
pub mod platform;
pub mod settings;
pub mod tracking;

pub use bridge::{Command, CommandHandler, MethodCall, MethodChannel, MethodResponse};
pub use channels::{ChannelKind, EventChannels};
pub use permission::{HostPermissionProvider, PermissionProvider, PermissionStatus, StaticPermissionProvider};
pub use platform::{Platform, PlatformInfo};
pub use settings::TrackerConfig;
pub use tracking::{
    AccuracyMode, CalibrationPoint, Capabilities, TrackingController, TrackingEngine, TrackingError,
    TrackingResult, TrackingState,
};

#[cfg(feature = "tauri")]
pub use bridge::tauri_plugin::init;
