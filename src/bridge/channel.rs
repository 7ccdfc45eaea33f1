// src/bridge/channel.rs
use std::sync::Arc;

use crate::bridge::dispatch::CommandHandler;
use crate::bridge::method_call::{Command, CommandParseError, MethodCall, MethodResponse};

/// Host-facing adapter over a `CommandHandler`.
///
/// Failures never cross this boundary as errors: a rejected or malformed call
/// answers `false` (`0.0` for the accuracy query), an unknown method answers
/// `NotImplemented`.
#[derive(Clone)]
pub struct MethodChannel {
    handler: Arc<dyn CommandHandler>,
}

impl MethodChannel {
    pub const NAME: &'static str = "eye_tracking";

    pub fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self { handler }
    }

    pub async fn invoke(&self, call: MethodCall) -> MethodResponse {
        let command = match Command::parse(&call) {
            Ok(command) => command,
            Err(CommandParseError::UnknownMethod(method)) => {
                log::warn!("{}: method not implemented: {}", Self::NAME, method);
                return MethodResponse::NotImplemented;
            }
            Err(e) => {
                log::warn!("{}: {}", Self::NAME, e);
                return MethodResponse::success(Command::failure_value(&call.method));
            }
        };

        let method = command.method_name();
        match self.handler.handle(command).await {
            Ok(result) => MethodResponse::Success { result },
            Err(e) => {
                log::debug!("{}: {} failed: {}", Self::NAME, method, e);
                MethodResponse::success(Command::failure_value(method))
            }
        }
    }

    /// JSON in, JSON out. Used by hosts that can only pass strings.
    pub async fn invoke_json(&self, call_json: &str) -> String {
        let response = match serde_json::from_str::<MethodCall>(call_json) {
            Ok(call) => self.invoke(call).await,
            Err(e) => MethodResponse::error("invalid_call", format!("Failed to parse method call: {}", e)),
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","code":"serialization","message":"{}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
