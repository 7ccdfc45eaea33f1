// src/bridge/tauri_plugin.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Manager, Runtime, State,
};
use tokio::task::JoinHandle;

use crate::bridge::channel::MethodChannel;
use crate::bridge::method_call::{MethodCall, MethodResponse};
use crate::channels::ChannelKind;
use crate::tracking::controller::TrackingController;

pub struct EyeTrackingState {
    pub controller: Arc<TrackingController>,
    channel: MethodChannel,
    listeners: Mutex<HashMap<ChannelKind, JoinHandle<()>>>,
}

impl EyeTrackingState {
    pub fn new(controller: Arc<TrackingController>) -> Self {
        Self {
            channel: MethodChannel::new(controller.clone()),
            controller,
            listeners: Mutex::new(HashMap::new()),
        }
    }
}

#[tauri::command]
async fn invoke_method(
    call: MethodCall,
    state: State<'_, EyeTrackingState>,
) -> Result<MethodResponse, String> {
    Ok(state.channel.invoke(call).await)
}

// Events are emitted under the channel's full name, e.g. "eye_tracking/gaze"
#[tauri::command]
async fn listen<R: Runtime>(
    channel: String,
    app_handle: AppHandle<R>,
    state: State<'_, EyeTrackingState>,
) -> Result<(), String> {
    let kind: ChannelKind = channel.parse()?;
    let event_name = kind.channel_name();

    let task = state.controller.channels().forward(kind, move |payload| {
        if let Err(e) = app_handle.emit(event_name, payload) {
            log::warn!("Failed to emit {}: {}", event_name, e);
        }
    });

    let previous = state
        .listeners
        .lock()
        .map_err(|e| format!("Listener registry poisoned: {}", e))?
        .insert(kind, task);
    if let Some(previous) = previous {
        previous.abort();
    }
    Ok(())
}

#[tauri::command]
async fn cancel(channel: String, state: State<'_, EyeTrackingState>) -> Result<bool, String> {
    let kind: ChannelKind = channel.parse()?;
    state
        .listeners
        .lock()
        .map_err(|e| format!("Listener registry poisoned: {}", e))?
        .remove(&kind);
    Ok(state.controller.channels().cancel(kind))
}

/// Initializes the plugin around an existing controller.
pub fn init<R: Runtime>(controller: Arc<TrackingController>) -> TauriPlugin<R> {
    Builder::new("eye-tracking")
        .invoke_handler(tauri::generate_handler![invoke_method, listen, cancel])
        .setup(move |app, _api| {
            app.manage(EyeTrackingState::new(controller));
            Ok(())
        })
        .build()
}
