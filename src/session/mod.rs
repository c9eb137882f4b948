// SPDX-License-Identifier: GPL-3.0-only

//! Scanning session lifecycle
//!
//! A [`ScannerSession`] owns everything a scan needs while it runs: the bound
//! camera, the preview render target, the display listener, the camera state
//! observer and the analysis task. Lifecycle:
//!
//! ```text
//! Stopped ──start──► Starting ──► Running ◄──resume── Paused
//!    ▲                  │           │  └────pause────────▲
//!    └──── failure ─────┘           └──stop──► Stopped   │
//!                                              ▲─stop────┘
//! ```
//!
//! Teardown always runs in the same order and tolerates resources that were
//! never acquired, so a failed start leaves nothing behind.

pub mod controls;
pub mod state;

pub use state::{SessionState, StartResult};

use crate::backends::camera::{
    BindRequest, BoundCamera, CameraBackend, CameraStateChange, RegistrationId, RenderTarget,
    TorchState,
};
use crate::config::SessionConfig;
use crate::errors::{ScannerError, ScannerResult};
use crate::frame_processor::{
    AnalyzerCounters, AnalyzerStats, BarcodeDecoder, DecoderOptions, EventSender, FrameAnalyzer,
    LatestFrameSlot, ScanEvent,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Internal session state
struct SessionInner {
    id: Uuid,
    backend: Arc<dyn CameraBackend>,
    runtime: Handle,
    events: EventSender,
    state: SessionState,
    counters: Arc<AnalyzerCounters>,
    active: Option<ActiveSession>,
}

/// Resources held between start and stop
struct ActiveSession {
    config: Arc<SessionConfig>,
    analyzer: Arc<FrameAnalyzer>,
    slot: Arc<LatestFrameSlot>,
    task: Option<JoinHandle<()>>,
    render_target: Option<RenderTarget>,
    display_listener: Option<RegistrationId>,
    camera: Option<Arc<dyn BoundCamera>>,
    observer: Option<RegistrationId>,
}

impl ActiveSession {
    fn bind_request(&self) -> ScannerResult<BindRequest> {
        let render_target = self
            .render_target
            .ok_or_else(|| ScannerError::CameraError("no render target".into()))?;
        Ok(BindRequest {
            facing: self.config.facing,
            target_resolution: self.config.target_resolution,
            render_target,
        })
    }

    fn unbind_camera(&mut self, backend: &dyn CameraBackend) {
        if let Some(camera) = self.camera.take() {
            if let Some(id) = self.observer.take() {
                camera.remove_state_observer(id);
            }
        }
        backend.unbind_all();
    }

    /// Release everything in teardown order
    fn teardown(&mut self, backend: &dyn CameraBackend) {
        if let Some(id) = self.display_listener.take() {
            backend.unregister_display_listener(id);
        }
        if let (Some(camera), Some(id)) = (self.camera.as_ref(), self.observer.take()) {
            camera.remove_state_observer(id);
        }

        self.slot.close();
        self.analyzer.deactivate();
        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.camera = None;
        backend.unbind_all();

        if let Some(target) = self.render_target.take() {
            backend.release_render_target(target);
        }
        if let Some(decoder) = self.analyzer.take_decoder() {
            decoder.close();
        }
        self.analyzer.reset_duplicates();
    }
}

/// Barcode scanning session
///
/// Cheap to clone; clones share one session. The session is torn down when
/// the last clone is dropped.
#[derive(Clone)]
pub struct ScannerSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl ScannerSession {
    /// Create a stopped session
    ///
    /// The analysis task is spawned on `runtime`; detections, errors and
    /// camera state changes are sent to `events`.
    pub fn new(backend: Arc<dyn CameraBackend>, runtime: Handle, events: EventSender) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Creating scanner session");
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                backend,
                runtime,
                events,
                state: SessionState::Stopped,
                counters: Arc::new(AnalyzerCounters::default()),
                active: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session_id(&self) -> Uuid {
        self.lock().id
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Pipeline counters of the current or most recent session
    pub fn stats(&self) -> AnalyzerStats {
        self.lock().counters.snapshot()
    }

    /// Payloads of the last reported detection (`NoDuplicates` mode)
    pub fn last_scanned(&self) -> Vec<String> {
        self.lock()
            .active
            .as_ref()
            .map(|a| a.analyzer.last_scanned())
            .unwrap_or_default()
    }

    /// Torch state of the bound camera; `Unavailable` when nothing is bound
    pub fn torch_state(&self) -> TorchState {
        let inner = self.lock();
        inner
            .active
            .as_ref()
            .and_then(|a| a.camera.as_ref())
            .map(|camera| torch_state_of(camera.as_ref()))
            .unwrap_or(TorchState::Unavailable)
    }

    /// Start scanning
    ///
    /// `decoder_factory` is called once with the configured decoder options,
    /// before the session lock is taken, so it may call back into the session.
    /// On failure the session is left stopped with every acquired resource
    /// released.
    pub fn start<F>(&self, config: SessionConfig, decoder_factory: F) -> ScannerResult<StartResult>
    where
        F: FnOnce(&DecoderOptions) -> Arc<dyn BarcodeDecoder>,
    {
        if self.state() != SessionState::Stopped {
            return Err(ScannerError::AlreadyStarted);
        }
        config.validate()?;
        let decoder = decoder_factory(&config.decoder_options);

        let mut inner = self.lock();
        if inner.state != SessionState::Stopped {
            // Lost a race with another start
            decoder.close();
            return Err(ScannerError::AlreadyStarted);
        }

        info!(
            session = %inner.id,
            mode = ?config.detection_mode,
            facing = %config.facing,
            return_image = config.return_image,
            invert_image = config.invert_image,
            "Starting scanner session"
        );
        inner.state = SessionState::Starting;

        match inner.start_active(config, decoder) {
            Ok((active, result)) => {
                inner.active = Some(active);
                inner.state = SessionState::Running;
                info!(
                    session = %inner.id,
                    width = result.width,
                    height = result.height,
                    torch = ?result.torch_state,
                    "Scanner session started"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(session = %inner.id, error = %e, "Scanner session failed to start");
                inner.state = SessionState::Stopped;
                Err(e)
            }
        }
    }

    /// Unbind the camera but keep the analyzer and preview target
    pub fn pause(&self) -> ScannerResult<()> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Paused => return Err(ScannerError::AlreadyPaused),
            SessionState::Stopped | SessionState::Starting => {
                return Err(ScannerError::AlreadyStopped);
            }
            SessionState::Running => {}
        }

        let backend = Arc::clone(&inner.backend);
        if let Some(active) = inner.active.as_mut() {
            active.unbind_camera(backend.as_ref());
        }
        inner.state = SessionState::Paused;
        info!(session = %inner.id, "Scanner session paused");
        Ok(())
    }

    /// Rebind the camera of a paused session
    ///
    /// If the camera can no longer be bound the session is stopped.
    pub fn resume(&self) -> ScannerResult<StartResult> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Running => return Err(ScannerError::AlreadyStarted),
            SessionState::Stopped | SessionState::Starting => {
                return Err(ScannerError::AlreadyStopped);
            }
            SessionState::Paused => {}
        }

        match inner.resume_active() {
            Ok(result) => {
                inner.state = SessionState::Running;
                info!(session = %inner.id, "Scanner session resumed");
                Ok(result)
            }
            Err(e) => {
                warn!(session = %inner.id, error = %e, "Scanner session failed to resume");
                inner.shutdown();
                Err(e)
            }
        }
    }

    /// Stop scanning and release every resource
    pub fn stop(&self) -> ScannerResult<()> {
        let mut inner = self.lock();
        if !inner.state.is_active() {
            return Err(ScannerError::AlreadyStopped);
        }
        inner.shutdown();
        Ok(())
    }

    /// Stop if active; otherwise do nothing
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.state.is_active() {
            inner.shutdown();
        }
    }
}

impl std::fmt::Debug for ScannerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ScannerSession")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .finish()
    }
}

impl SessionInner {
    fn start_active(
        &mut self,
        config: SessionConfig,
        decoder: Arc<dyn BarcodeDecoder>,
    ) -> ScannerResult<(ActiveSession, StartResult)> {
        let config = Arc::new(config);

        self.counters = Arc::new(AnalyzerCounters::default());
        let analyzer = Arc::new(FrameAnalyzer::new(
            Arc::clone(&config),
            decoder,
            self.events.clone(),
            Arc::clone(&self.counters),
        ));
        let slot = Arc::new(LatestFrameSlot::new(Arc::clone(&self.counters)));

        let mut active = ActiveSession {
            config,
            analyzer,
            slot,
            task: None,
            render_target: None,
            display_listener: None,
            camera: None,
            observer: None,
        };

        match self.acquire(&mut active) {
            Ok(result) => Ok((active, result)),
            Err(e) => {
                active.teardown(self.backend.as_ref());
                Err(e)
            }
        }
    }

    fn acquire(&self, active: &mut ActiveSession) -> ScannerResult<StartResult> {
        let backend = self.backend.as_ref();
        backend.connect()?;
        backend.unbind_all();

        active.render_target = Some(backend.create_render_target()?);

        let analyzer = Arc::clone(&active.analyzer);
        let slot = Arc::clone(&active.slot);
        active.task = Some(self.runtime.spawn(analyzer.run(slot)));

        let camera = self.bind(active)?;

        if active.config.target_resolution.is_some() {
            active.display_listener = backend.register_display_listener();
        }

        if active.config.torch_enabled && camera.has_flash_unit() {
            if let Err(e) = camera.enable_torch(true) {
                warn!(session = %self.id, error = %e, "Failed to enable torch at start");
            }
        }

        Ok(self.start_result(active, camera.as_ref()))
    }

    /// Bind the camera and register the state observer
    fn bind(&self, active: &mut ActiveSession) -> ScannerResult<Arc<dyn BoundCamera>> {
        let request = active.bind_request()?;
        let camera = self
            .backend
            .bind(&request, Arc::clone(&active.slot))
            .map_err(|e| {
                warn!(session = %self.id, error = %e, "Failed to bind camera");
                ScannerError::NoCamera
            })?;

        active.observer = Some(camera.add_state_observer(state_observer(self.events.clone())));
        active.camera = Some(Arc::clone(&camera));
        Ok(camera)
    }

    fn resume_active(&mut self) -> ScannerResult<StartResult> {
        let mut active = self.active.take().ok_or(ScannerError::AlreadyStopped)?;
        let result = self
            .bind(&mut active)
            .map(|camera| self.start_result(&active, camera.as_ref()));
        self.active = Some(active);
        result
    }

    fn start_result(&self, active: &ActiveSession, camera: &dyn BoundCamera) -> StartResult {
        let (width, height) =
            StartResult::preview_size(camera.resolution(), camera.sensor_rotation());
        StartResult {
            width,
            height,
            torch_state: torch_state_of(camera),
            render_target_id: active.render_target.map(|t| t.id).unwrap_or_default(),
            camera_count: self.backend.camera_count(),
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.teardown(self.backend.as_ref());
        }
        self.state = SessionState::Stopped;
        info!(session = %self.id, "Scanner session stopped");
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if self.active.is_some() {
            debug!(session = %self.id, "Disposing scanner session on drop");
            self.shutdown();
        }
    }
}

fn torch_state_of(camera: &dyn BoundCamera) -> TorchState {
    if camera.has_flash_unit() {
        TorchState::from_enabled(camera.torch_enabled())
    } else {
        TorchState::Unavailable
    }
}

/// Forward camera state changes to the caller's event channel
fn state_observer(events: EventSender) -> crate::backends::camera::CameraStateObserver {
    Box::new(move |change| {
        let event = match change {
            CameraStateChange::Torch(enabled) => {
                ScanEvent::TorchStateChanged(TorchState::from_enabled(enabled))
            }
            CameraStateChange::Zoom { linear, .. } => ScanEvent::ZoomChanged(linear),
        };
        if events.send(event).is_err() {
            debug!("Event receiver dropped, discarding camera state change");
        }
    })
}
