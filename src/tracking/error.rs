use thiserror::Error;

use crate::tracking::types::TrackingState;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackingError {
    #[error("eye tracking has not been initialized")]
    NotInitialized,

    #[error("camera permission has not been granted")]
    PermissionDenied,

    #[error("cannot {command} while {from}")]
    InvalidStateTransition {
        command: &'static str,
        from: TrackingState,
    },

    #[error("unknown accuracy mode '{0}'")]
    InvalidAccuracyMode(String),

    #[error("camera permission cannot be requested: {0}")]
    PermissionUnavailable(String),

    #[error("camera permission request timed out after {0}s")]
    PermissionTimeout(u64),

    #[error("tracking engine failure: {0}")]
    Engine(String),
}

impl TrackingError {
    pub(crate) fn engine(err: anyhow::Error) -> Self {
        Self::Engine(format!("{:#}", err))
    }
}

pub type TrackingResult<T> = std::result::Result<T, TrackingError>;
