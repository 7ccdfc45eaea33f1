// src/permission/host.rs
//
// Permission provider backed by host callbacks. The host shows the OS dialog
// when `prompt` is invoked and later reports the outcome through
// `handle_result`, which completes every request waiting on that code.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::permission::{PermissionProvider, PermissionStatus};
use crate::tracking::error::{TrackingError, TrackingResult};

/// Request code the Android host uses for the camera permission dialog.
pub const CAMERA_PERMISSION_REQUEST_CODE: i32 = 100;

/// Shows the OS dialog for a request code. Returns false when no foreground
/// UI is available to host it.
pub type PromptHook = Arc<dyn Fn(i32) -> bool + Send + Sync>;
pub type StatusHook = Arc<dyn Fn() -> PermissionStatus + Send + Sync>;

struct PendingRequest {
    request_code: i32,
    response_sender: oneshot::Sender<PermissionStatus>,
}

pub struct HostPermissionProvider {
    prompt: PromptHook,
    status: StatusHook,
    timeout: Duration,
    next_ticket: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl HostPermissionProvider {
    pub fn new(prompt: PromptHook, status: StatusHook, timeout: Duration) -> Self {
        Self {
            prompt,
            status,
            timeout,
            next_ticket: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Delivers the dialog outcome. Returns false for request codes this
    /// provider does not own.
    pub fn handle_result(&self, request_code: i32, granted: bool) -> bool {
        if request_code != CAMERA_PERMISSION_REQUEST_CODE {
            return false;
        }

        let status = if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };

        let waiters: Vec<PendingRequest> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            let tickets: Vec<u64> = pending
                .iter()
                .filter(|(_, p)| p.request_code == request_code)
                .map(|(ticket, _)| *ticket)
                .collect();
            tickets.into_iter().filter_map(|t| pending.remove(&t)).collect()
        };

        log::info!(
            "📷 Camera permission result: {} ({} waiting)",
            if granted { "granted" } else { "denied" },
            waiters.len()
        );

        for waiter in waiters {
            let _ = waiter.response_sender.send(status);
        }
        true
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn forget(&self, ticket: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(&ticket);
    }
}

// Unregisters a waiting request however its future ends, including when the
// caller drops it before the host answers.
struct TicketGuard<'a> {
    provider: &'a HostPermissionProvider,
    ticket: u64,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.provider.forget(self.ticket);
    }
}

#[async_trait]
impl PermissionProvider for HostPermissionProvider {
    async fn status(&self) -> PermissionStatus {
        (self.status)()
    }

    async fn request(&self) -> TrackingResult<PermissionStatus> {
        let current = (self.status)();
        if current.is_granted() {
            return Ok(current);
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let (response_sender, response_receiver) = oneshot::channel();

        // Register before prompting: the host may answer synchronously.
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.insert(ticket, PendingRequest {
                request_code: CAMERA_PERMISSION_REQUEST_CODE,
                response_sender,
            });
        }
        let _guard = TicketGuard { provider: self, ticket };

        if !(self.prompt)(CAMERA_PERMISSION_REQUEST_CODE) {
            return Err(TrackingError::PermissionUnavailable(
                "no foreground activity to host the dialog".to_string(),
            ));
        }

        match tokio::time::timeout(self.timeout, response_receiver).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(_)) => Err(TrackingError::PermissionUnavailable(
                "permission request was abandoned".to_string(),
            )),
            Err(_) => {
                log::warn!("Camera permission request timed out");
                Err(TrackingError::PermissionTimeout(self.timeout.as_secs()))
            }
        }
    }
}
