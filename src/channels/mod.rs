// src/channels/mod.rs
//
// Streaming outputs. Each channel holds at most one subscriber: listening
// replaces (and closes) the previous stream, cancelling stops delivery.
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod events;

pub use events::{EyeStateEvent, FaceBounds, FaceDetectionEvent, GazeEvent, HeadPoseEvent};

pub type EventStream<T> = mpsc::UnboundedReceiver<T>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Gaze,
    EyeState,
    HeadPose,
    FaceDetection,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Gaze,
        ChannelKind::EyeState,
        ChannelKind::HeadPose,
        ChannelKind::FaceDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gaze => "gaze",
            Self::EyeState => "eye_state",
            Self::HeadPose => "head_pose",
            Self::FaceDetection => "face_detection",
        }
    }

    /// Fully qualified name the host registers the event channel under.
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::Gaze => "eye_tracking/gaze",
            Self::EyeState => "eye_tracking/eye_state",
            Self::HeadPose => "eye_tracking/head_pose",
            Self::FaceDetection => "eye_tracking/face_detection",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("eye_tracking/").unwrap_or(s);
        ChannelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| format!("Unknown event channel: {}", s))
    }
}

pub struct EventChannel<T> {
    kind: ChannelKind,
    sink: Mutex<Option<mpsc::UnboundedSender<T>>>,
}

impl<T: Send + 'static> EventChannel<T> {
    fn new(kind: ChannelKind) -> Self {
        Self { kind, sink: Mutex::new(None) }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn listen(&self) -> EventStream<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let previous = self.sink.lock().unwrap_or_else(|e| e.into_inner()).replace(sender);
        if previous.is_some() {
            log::debug!("Replacing {} subscriber", self.kind.channel_name());
        }
        receiver
    }

    /// Returns true when a subscriber was removed.
    pub fn cancel(&self) -> bool {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take().is_some()
    }

    pub fn has_listener(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |s| !s.is_closed())
    }

    /// Returns true when the event reached a subscriber.
    pub fn publish(&self, event: T) -> bool {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match sink.as_ref() {
            Some(sender) => {
                if sender.send(event).is_ok() {
                    true
                } else {
                    // receiver dropped without cancelling
                    *sink = None;
                    false
                }
            }
            None => false,
        }
    }
}

impl<T: Serialize + Send + 'static> EventChannel<T> {
    fn forward<F>(&self, sink: F) -> JoinHandle<()>
    where
        F: Fn(serde_json::Value) + Send + 'static,
    {
        let mut stream = self.listen();
        let kind = self.kind;
        tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                match serde_json::to_value(&event) {
                    Ok(payload) => sink(payload),
                    Err(e) => log::error!("Failed to serialize {} event: {}", kind, e),
                }
            }
        })
    }
}

/// The four streaming channels of one controller.
pub struct EventChannels {
    pub gaze: EventChannel<GazeEvent>,
    pub eye_state: EventChannel<EyeStateEvent>,
    pub head_pose: EventChannel<HeadPoseEvent>,
    pub face_detection: EventChannel<FaceDetectionEvent>,
}

impl EventChannels {
    pub fn new() -> Self {
        Self {
            gaze: EventChannel::new(ChannelKind::Gaze),
            eye_state: EventChannel::new(ChannelKind::EyeState),
            head_pose: EventChannel::new(ChannelKind::HeadPose),
            face_detection: EventChannel::new(ChannelKind::FaceDetection),
        }
    }

    /// Subscribes to `kind` and hands every event to `sink` as JSON.
    /// Must be called from within a tokio runtime.
    pub fn forward<F>(&self, kind: ChannelKind, sink: F) -> JoinHandle<()>
    where
        F: Fn(serde_json::Value) + Send + 'static,
    {
        match kind {
            ChannelKind::Gaze => self.gaze.forward(sink),
            ChannelKind::EyeState => self.eye_state.forward(sink),
            ChannelKind::HeadPose => self.head_pose.forward(sink),
            ChannelKind::FaceDetection => self.face_detection.forward(sink),
        }
    }

    pub fn cancel(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Gaze => self.gaze.cancel(),
            ChannelKind::EyeState => self.eye_state.cancel(),
            ChannelKind::HeadPose => self.head_pose.cancel(),
            ChannelKind::FaceDetection => self.face_detection.cancel(),
        }
    }

    pub fn cancel_all(&self) {
        for kind in ChannelKind::ALL {
            self.cancel(kind);
        }
    }
}

impl Default for EventChannels {
    fn default() -> Self {
        Self::new()
    }
}
