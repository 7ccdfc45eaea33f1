// Host bridges: every host call convention funnels into `CommandHandler`
pub mod channel;
pub mod dispatch;
pub mod ffi;
pub mod method_call;

#[cfg(feature = "tauri")]
pub mod tauri_plugin;

pub use channel::MethodChannel;
pub use dispatch::CommandHandler;
pub use method_call::{Command, CommandParseError, MethodCall, MethodResponse};
