// src/tracking/controller.rs
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::channels::EventChannels;
use crate::permission::{default_permission_provider, PermissionProvider};
use crate::platform::PlatformInfo;
use crate::settings::{self, TrackerConfig};
use crate::tracking::engine::{NullEngine, TrackingEngine};
use crate::tracking::error::{TrackingError, TrackingResult};
use crate::tracking::session::Session;
use crate::tracking::types::{AccuracyMode, CalibrationPoint, Capabilities, TrackingState};

/// Accepts tracking commands, checks them against the current `Session` and
/// transitions it.
///
/// The session lock is never held while the host permission dialog is open.
pub struct TrackingController {
    pub id: String,
    config: TrackerConfig,
    platform: PlatformInfo,
    session: Mutex<Session>,
    permissions: Arc<dyn PermissionProvider>,
    engine: Arc<dyn TrackingEngine>,
    channels: Arc<EventChannels>,
}

impl TrackingController {
    pub fn new(config: TrackerConfig, permissions: Arc<dyn PermissionProvider>) -> Self {
        let session = Session::new(&config);
        let channels = Arc::new(EventChannels::new());

        log::info!("🚀 Creating eye tracking session: {}", session.id);

        Self {
            id: session.id.clone(),
            config,
            platform: PlatformInfo::current(),
            session: Mutex::new(session),
            permissions,
            engine: Arc::new(NullEngine),
            channels,
        }
    }

    /// Saved tracker settings and the platform's default permission provider.
    pub fn for_current_platform() -> Self {
        Self::new(settings::load_or_default(), default_permission_provider())
    }

    pub fn with_engine(mut self, engine: Arc<dyn TrackingEngine>) -> Self {
        engine.attach(self.channels.clone());
        self.engine = engine;
        self
    }

    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn channels(&self) -> &Arc<EventChannels> {
        &self.channels
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn log(&self, message: &str) {
        if self.config.enable_logging {
            log::info!("EyeTracking[{}]: {}", self.id, message);
        }
    }

    fn reject(&self, err: TrackingError) -> TrackingError {
        if self.config.enable_logging {
            log::warn!("EyeTracking[{}]: rejected: {}", self.id, err);
        }
        err
    }

    pub async fn state(&self) -> TrackingState {
        self.session.lock().await.state
    }

    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub fn platform_version(&self) -> String {
        self.platform.version_string()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_platform(&self.platform, self.config.max_tracking_frequency)
    }

    pub async fn initialize(&self) -> TrackingResult<()> {
        let granted = self.permissions.status().await.is_granted();
        let mut session = self.session.lock().await;
        self.refresh_permission(&mut session, granted).await;

        if session.initialized && session.state != TrackingState::Error {
            log::debug!("EyeTracking[{}]: already initialized", self.id);
            return Ok(());
        }

        match self.engine.initialize().await {
            Ok(()) => {
                session.initialized = true;
                session.state = TrackingState::Ready;
                self.log(&format!("initialized with {} engine", self.engine.name()));
                Ok(())
            }
            Err(e) => {
                session.initialized = false;
                session.state = TrackingState::Error;
                log::error!("EyeTracking[{}]: initialization failed: {:#}", self.id, e);
                Err(TrackingError::engine(e))
            }
        }
    }

    /// Asks the host for camera access and resolves with the dialog outcome.
    pub async fn request_camera_permission(&self) -> TrackingResult<bool> {
        let current = self.permissions.status().await;
        let outcome = if current.is_granted() {
            current
        } else {
            self.log("requesting camera permission");
            self.permissions.request().await.map_err(|e| self.reject(e))?
        };

        let granted = outcome.is_granted();
        let mut session = self.session.lock().await;
        self.refresh_permission(&mut session, granted).await;
        drop(session);
        self.log(&format!("camera permission {:?}", outcome));
        Ok(granted)
    }

    pub async fn has_camera_permission(&self) -> bool {
        let granted = self.permissions.status().await.is_granted();
        let mut session = self.session.lock().await;
        self.refresh_permission(&mut session, granted).await;
        granted
    }

    // A revoked grant ends any running stream: `Tracking` and `Paused` never
    // outlive the permission they were started with.
    async fn refresh_permission(&self, session: &mut Session, granted: bool) {
        session.has_camera_permission = granted;
        if granted || !session.state.is_streaming() {
            return;
        }

        if let Err(e) = self.engine.stop().await {
            log::warn!("EyeTracking[{}]: engine stop failed after revocation: {:#}", self.id, e);
        }
        session.state = TrackingState::Ready;
        log::warn!("EyeTracking[{}]: camera permission revoked, tracking stopped", self.id);
    }

    pub async fn start_tracking(&self) -> TrackingResult<()> {
        let granted = self.permissions.status().await.is_granted();
        let mut session = self.session.lock().await;
        self.refresh_permission(&mut session, granted).await;

        if !session.initialized {
            return Err(self.reject(TrackingError::NotInitialized));
        }
        if !granted {
            return Err(self.reject(TrackingError::PermissionDenied));
        }
        if session.state == TrackingState::Tracking {
            return Ok(());
        }

        let settings = session.engine_settings();
        let started = self.engine.start(&settings).await;
        if session.calibration_active() {
            session.calibration.cancel();
        }
        if let Err(e) = started {
            session.state = TrackingState::Error;
            return Err(self.reject(TrackingError::engine(e)));
        }
        session.state = TrackingState::Tracking;
        self.log(&format!("tracking at {} Hz ({})", settings.tracking_frequency_hz, settings.accuracy_mode));
        Ok(())
    }

    pub async fn stop_tracking(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;

        if session.state.is_streaming() {
            self.engine
                .stop()
                .await
                .map_err(|e| self.reject(TrackingError::engine(e)))?;
        }
        if session.calibration_active() {
            session.calibration.cancel();
        }
        if session.initialized {
            session.state = TrackingState::Ready;
        }
        self.log("tracking stopped");
        Ok(())
    }

    pub async fn pause_tracking(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        if session.state != TrackingState::Tracking {
            return Err(self.reject(TrackingError::InvalidStateTransition {
                command: "pauseTracking",
                from: session.state,
            }));
        }

        self.engine
            .pause()
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;
        session.state = TrackingState::Paused;
        self.log("tracking paused");
        Ok(())
    }

    pub async fn resume_tracking(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        if session.state != TrackingState::Paused {
            return Err(self.reject(TrackingError::InvalidStateTransition {
                command: "resumeTracking",
                from: session.state,
            }));
        }

        self.engine
            .resume()
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;
        session.state = TrackingState::Tracking;
        self.log("tracking resumed");
        Ok(())
    }

    pub async fn start_calibration(&self, points: Option<Vec<CalibrationPoint>>) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        if !session.initialized {
            return Err(self.reject(TrackingError::NotInitialized));
        }

        let targets = points.unwrap_or_default();
        self.engine
            .begin_calibration(&targets)
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;

        let count = targets.len();
        session.calibration.begin(Some(targets));
        session.state = TrackingState::Calibrating;
        self.log(&format!("calibration started with {} targets", count));
        Ok(())
    }

    pub async fn add_calibration_point(&self, point: CalibrationPoint) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        if session.state != TrackingState::Calibrating {
            return Err(self.reject(TrackingError::InvalidStateTransition {
                command: "addCalibrationPoint",
                from: session.state,
            }));
        }

        let residual = self
            .engine
            .calibration_sample(&point)
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;
        session.calibration.record(point, residual);
        log::debug!("EyeTracking[{}]: calibration point ({:.3}, {:.3})", self.id, point.x, point.y);
        Ok(())
    }

    pub async fn finish_calibration(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        if session.state != TrackingState::Calibrating {
            return Err(self.reject(TrackingError::InvalidStateTransition {
                command: "finishCalibration",
                from: session.state,
            }));
        }

        self.engine
            .finish_calibration()
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;
        session.calibration.finish();
        session.state = TrackingState::Ready;
        self.log(&format!(
            "calibration finished: {} samples, accuracy {:.2}",
            session.calibration.samples().len(),
            session.calibration_accuracy()
        ));
        Ok(())
    }

    pub async fn clear_calibration(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;

        self.engine
            .clear_calibration()
            .await
            .map_err(|e| self.reject(TrackingError::engine(e)))?;
        if session.state == TrackingState::Calibrating {
            session.state = TrackingState::Ready;
        }
        session.calibration.clear();
        self.log("calibration cleared");
        Ok(())
    }

    pub async fn calibration_accuracy(&self) -> f64 {
        self.session.lock().await.calibration_accuracy()
    }

    pub async fn set_tracking_frequency(&self, fps: u32) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        session.tracking_frequency_hz = fps;
        self.reconfigure(&session).await;
        Ok(())
    }

    /// Accepts the host's string token; unknown modes are rejected.
    pub async fn set_accuracy_mode(&self, mode: &str) -> TrackingResult<()> {
        let mode: AccuracyMode = mode.parse().map_err(|e| self.reject(e))?;
        self.set_accuracy(mode).await
    }

    pub async fn set_accuracy(&self, mode: AccuracyMode) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        session.accuracy_mode = mode;
        self.reconfigure(&session).await;
        Ok(())
    }

    pub async fn enable_background_tracking(&self, enabled: bool) -> TrackingResult<()> {
        let mut session = self.session.lock().await;
        session.background_tracking_enabled = enabled;
        self.reconfigure(&session).await;
        Ok(())
    }

    // Configuration always sticks on the session; a running engine that
    // refuses it keeps its previous settings until the next start.
    async fn reconfigure(&self, session: &Session) {
        if !session.state.is_streaming() {
            return;
        }
        if let Err(e) = self.engine.configure(&session.engine_settings()).await {
            log::warn!("EyeTracking[{}]: engine rejected new settings: {:#}", self.id, e);
        }
    }

    pub async fn dispose(&self) -> TrackingResult<()> {
        let mut session = self.session.lock().await;

        if session.state.is_streaming() {
            if let Err(e) = self.engine.stop().await {
                log::warn!("EyeTracking[{}]: engine stop failed during dispose: {:#}", self.id, e);
            }
        }
        if session.initialized {
            if let Err(e) = self.engine.shutdown().await {
                log::warn!("EyeTracking[{}]: engine shutdown failed: {:#}", self.id, e);
            }
        }

        session.reset();
        self.channels.cancel_all();
        self.log("disposed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{PermissionStatus, StaticPermissionProvider};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn controller(provider: StaticPermissionProvider) -> (TrackingController, Arc<StaticPermissionProvider>) {
        let provider = Arc::new(provider);
        let controller = TrackingController::new(TrackerConfig::default(), provider.clone());
        (controller, provider)
    }

    struct FailingEngine;

    #[async_trait]
    impl TrackingEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            Err(anyhow!("camera busy"))
        }
    }

    struct StartFailingEngine;

    #[async_trait]
    impl TrackingEngine for StartFailingEngine {
        fn name(&self) -> &str {
            "start-failing"
        }

        async fn start(&self, _settings: &crate::tracking::types::EngineSettings) -> anyhow::Result<()> {
            Err(anyhow!("sensor unavailable"))
        }
    }

    #[derive(Default)]
    struct ResidualEngine {
        samples: AtomicUsize,
        configures: AtomicUsize,
    }

    #[async_trait]
    impl TrackingEngine for ResidualEngine {
        fn name(&self) -> &str {
            "residual"
        }

        async fn calibration_sample(&self, _point: &CalibrationPoint) -> anyhow::Result<Option<f64>> {
            self.samples.fetch_add(1, Ordering::SeqCst);
            Ok(Some(0.2))
        }

        async fn configure(&self, _settings: &crate::tracking::types::EngineSettings) -> anyhow::Result<()> {
            self.configures.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn platform_default_starts_uninitialized() {
        let controller = TrackingController::for_current_platform();
        assert_eq!(controller.state().await, TrackingState::Uninitialized);
        assert_eq!(controller.engine_name(), "null");
        assert_eq!(controller.capabilities().platform, PlatformInfo::current().platform.tag());
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        controller.initialize().await.unwrap();
        controller.start_tracking().await.unwrap();

        controller.initialize().await.unwrap();
        assert_eq!(controller.state().await, TrackingState::Tracking);
    }

    #[tokio::test]
    async fn engine_fault_moves_to_error() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        let controller = controller.with_engine(Arc::new(FailingEngine));

        let err = controller.initialize().await.unwrap_err();
        assert!(matches!(err, TrackingError::Engine(ref msg) if msg.contains("camera busy")));

        let session = controller.snapshot().await;
        assert_eq!(session.state, TrackingState::Error);
        assert!(!session.initialized);
        assert!(session.invariants_hold());
    }

    #[tokio::test]
    async fn start_tracking_reports_why_it_was_rejected() {
        let (controller, provider) = controller(StaticPermissionProvider::denied());
        assert_eq!(controller.start_tracking().await, Err(TrackingError::NotInitialized));

        controller.initialize().await.unwrap();
        assert_eq!(controller.start_tracking().await, Err(TrackingError::PermissionDenied));
        assert_eq!(controller.state().await, TrackingState::Ready);

        provider.set_status(PermissionStatus::Granted);
        controller.start_tracking().await.unwrap();
        assert!(controller.snapshot().await.invariants_hold());
    }

    #[tokio::test]
    async fn permission_request_updates_session() {
        let (controller, provider) =
            controller(StaticPermissionProvider::undetermined(PermissionStatus::Granted));
        assert!(!controller.snapshot().await.has_camera_permission);

        assert!(controller.request_camera_permission().await.unwrap());
        assert!(controller.snapshot().await.has_camera_permission);
        assert_eq!(provider.prompt_count(), 1);

        // already granted: no second dialog
        assert!(controller.request_camera_permission().await.unwrap());
        assert_eq!(provider.prompt_count(), 1);
    }

    #[tokio::test]
    async fn denied_prompt_resolves_false() {
        let (controller, _) =
            controller(StaticPermissionProvider::undetermined(PermissionStatus::Denied));
        assert!(!controller.request_camera_permission().await.unwrap());
        assert!(!controller.has_camera_permission().await);
    }

    #[tokio::test]
    async fn calibration_bracket() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        assert_eq!(
            controller.add_calibration_point(CalibrationPoint::new(0.5, 0.5)).await,
            Err(TrackingError::InvalidStateTransition {
                command: "addCalibrationPoint",
                from: TrackingState::Uninitialized,
            })
        );

        controller.initialize().await.unwrap();
        controller
            .start_calibration(Some(vec![CalibrationPoint::new(0.1, 0.1)]))
            .await
            .unwrap();
        assert_eq!(controller.state().await, TrackingState::Calibrating);
        assert!(controller.snapshot().await.calibration_active());

        controller.add_calibration_point(CalibrationPoint::new(0.1, 0.1)).await.unwrap();
        controller.finish_calibration().await.unwrap();

        let session = controller.snapshot().await;
        assert_eq!(session.state, TrackingState::Ready);
        assert!(!session.calibration_active());
        assert_eq!(controller.calibration_accuracy().await, 0.85);
        assert!(controller.finish_calibration().await.is_err());
    }

    #[tokio::test]
    async fn residuals_drive_accuracy() {
        let engine = Arc::new(ResidualEngine::default());
        let (controller, _) = controller(StaticPermissionProvider::granted());
        let controller = controller.with_engine(engine.clone());

        controller.initialize().await.unwrap();
        controller.start_calibration(None).await.unwrap();
        controller.add_calibration_point(CalibrationPoint::new(0.2, 0.8)).await.unwrap();
        controller.add_calibration_point(CalibrationPoint::new(0.8, 0.2)).await.unwrap();
        controller.finish_calibration().await.unwrap();

        assert_eq!(engine.samples.load(Ordering::SeqCst), 2);
        assert!((controller.calibration_accuracy().await - 0.8).abs() < 1e-9);

        controller.clear_calibration().await.unwrap();
        assert_eq!(controller.calibration_accuracy().await, 0.85);
    }

    #[tokio::test]
    async fn clear_calibration_only_moves_out_of_calibrating() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        controller.clear_calibration().await.unwrap();
        assert_eq!(controller.state().await, TrackingState::Uninitialized);

        controller.initialize().await.unwrap();
        controller.start_calibration(None).await.unwrap();
        controller.clear_calibration().await.unwrap();
        assert_eq!(controller.state().await, TrackingState::Ready);
    }

    #[tokio::test]
    async fn configuration_is_stored_and_pushed_while_tracking() {
        let engine = Arc::new(ResidualEngine::default());
        let (controller, _) = controller(StaticPermissionProvider::granted());
        let controller = controller.with_engine(engine.clone());

        controller.set_tracking_frequency(15).await.unwrap();
        assert_eq!(engine.configures.load(Ordering::SeqCst), 0);

        controller.initialize().await.unwrap();
        controller.start_tracking().await.unwrap();
        controller.set_accuracy_mode("high").await.unwrap();
        controller.enable_background_tracking(true).await.unwrap();
        assert_eq!(engine.configures.load(Ordering::SeqCst), 2);

        let session = controller.snapshot().await;
        assert_eq!(session.tracking_frequency_hz, 15);
        assert_eq!(session.accuracy_mode, AccuracyMode::High);
        assert!(session.background_tracking_enabled);

        assert_eq!(
            controller.set_accuracy_mode("extreme").await,
            Err(TrackingError::InvalidAccuracyMode("extreme".to_string()))
        );
        assert_eq!(controller.snapshot().await.accuracy_mode, AccuracyMode::High);
    }

    #[tokio::test]
    async fn dispose_drops_subscribers() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        controller.initialize().await.unwrap();
        let _stream = controller.channels().gaze.listen();
        assert!(controller.channels().gaze.has_listener());

        controller.dispose().await.unwrap();
        assert!(!controller.channels().gaze.has_listener());
        assert_eq!(controller.state().await, TrackingState::Uninitialized);
    }

    #[tokio::test]
    async fn revoked_permission_stops_tracking() {
        let (controller, provider) = controller(StaticPermissionProvider::granted());
        controller.initialize().await.unwrap();
        controller.start_tracking().await.unwrap();

        provider.set_status(PermissionStatus::Denied);
        assert!(!controller.has_camera_permission().await);

        let session = controller.snapshot().await;
        assert_eq!(session.state, TrackingState::Ready);
        assert!(!session.has_camera_permission);
        assert!(session.invariants_hold());
    }

    #[tokio::test]
    async fn revoked_permission_stops_a_paused_stream() {
        let (controller, provider) = controller(StaticPermissionProvider::granted());
        controller.initialize().await.unwrap();
        controller.start_tracking().await.unwrap();
        controller.pause_tracking().await.unwrap();

        provider.set_status(PermissionStatus::Denied);
        assert_eq!(controller.start_tracking().await, Err(TrackingError::PermissionDenied));
        assert_eq!(controller.state().await, TrackingState::Ready);
        assert!(controller.snapshot().await.invariants_hold());
    }

    #[tokio::test]
    async fn failed_start_closes_the_calibration_round() {
        let (controller, _) = controller(StaticPermissionProvider::granted());
        let controller = controller.with_engine(Arc::new(StartFailingEngine));
        controller.initialize().await.unwrap();
        controller.start_calibration(None).await.unwrap();

        assert!(controller.start_tracking().await.is_err());
        let session = controller.snapshot().await;
        assert_eq!(session.state, TrackingState::Error);
        assert!(!session.calibration_active());
        assert!(session.invariants_hold());
    }
}
