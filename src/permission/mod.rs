// Camera permission providers
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tracking::error::TrackingResult;

pub mod host;

pub use host::{HostPermissionProvider, CAMERA_PERMISSION_REQUEST_CODE};

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    NotDetermined,
    Granted,
    Denied,
    Restricted,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Integer codes used across the C ABI.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Granted,
            2 => Self::Denied,
            3 => Self::Restricted,
            _ => Self::NotDetermined,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NotDetermined => 0,
            Self::Granted => 1,
            Self::Denied => 2,
            Self::Restricted => 3,
        }
    }
}

// Platform-agnostic interface to the OS permission subsystem
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current OS grant status, without prompting.
    async fn status(&self) -> PermissionStatus;

    /// Prompts the user and resolves with the outcome of the prompt.
    async fn request(&self) -> TrackingResult<PermissionStatus>;
}

/// Provider with a fixed status and a scripted prompt outcome.
///
/// Used on desktop hosts, where camera access is not gated per app, and in tests.
#[derive(Debug)]
pub struct StaticPermissionProvider {
    status: Mutex<PermissionStatus>,
    prompt_outcome: Mutex<PermissionStatus>,
    prompts: AtomicUsize,
}

impl StaticPermissionProvider {
    pub fn new(status: PermissionStatus, prompt_outcome: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            prompt_outcome: Mutex::new(prompt_outcome),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, PermissionStatus::Denied)
    }

    /// Not yet asked; the prompt will resolve with `outcome`.
    pub fn undetermined(outcome: PermissionStatus) -> Self {
        Self::new(PermissionStatus::NotDetermined, outcome)
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn set_prompt_outcome(&self, outcome: PermissionStatus) {
        *self.prompt_outcome.lock().unwrap_or_else(|e| e.into_inner()) = outcome;
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissionProvider {
    async fn status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request(&self) -> TrackingResult<PermissionStatus> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let outcome = *self.prompt_outcome.lock().unwrap_or_else(|e| e.into_inner());
        self.set_status(outcome);
        Ok(outcome)
    }
}

// Factory for hosts that have no prompt to wire up
pub fn default_permission_provider() -> Arc<dyn PermissionProvider> {
    #[cfg(any(target_os = "android", target_os = "ios"))]
    {
        // Mobile hosts must route the OS prompt through HostPermissionProvider.
        Arc::new(StaticPermissionProvider::undetermined(PermissionStatus::Denied))
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    {
        Arc::new(StaticPermissionProvider::granted())
    }
}
