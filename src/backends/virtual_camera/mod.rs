// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! An in-process [`CameraBackend`] that replays a fixed list of frames on a
//! frame loop thread. Used by the `scan` command to feed image files through a
//! real session, and by tests to drive sessions deterministically.
//!
//! ```text
//! SourceFrame list
//!        │  FrameLoopController (paced thread)
//!        ▼
//! CameraFrame + release hook ──► LatestFrameSlot ──► analysis task
//! ```
//!
//! Every frame handed out carries a release hook that updates the
//! [`FrameLedger`], so callers can check that each frame was released exactly
//! once.

mod file_source;

pub use file_source::{collect_image_paths, is_image_path, load_image_as_frame};

use crate::backends::camera::frame_loop::{FrameLoopController, LoopAction};
use crate::backends::camera::types::{
    BackendError, BackendResult, BindRequest, CameraFacing, CameraFrame, CameraStateChange,
    CameraStateObserver, FrameData, PixelFormat, RegistrationId, RenderTarget, Resolution,
    SensorRotation,
};
use crate::backends::camera::{BoundCamera, CameraBackend};
use crate::constants::virtual_camera as vc;
use crate::frame_processor::LatestFrameSlot;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pixel data replayed by the virtual camera
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub stride: u32,
    pub data: FrameData,
}

impl SourceFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<FrameData>) -> Self {
        Self {
            width,
            height,
            format,
            stride: width * format.plane_bytes_per_pixel(),
            data: data.into(),
        }
    }
}

/// Counts frames handed out and released
#[derive(Debug, Default)]
pub struct FrameLedger {
    produced: AtomicU64,
    released: AtomicU64,
}

impl FrameLedger {
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Frames handed out and not yet released
    pub fn outstanding(&self) -> u64 {
        self.produced().saturating_sub(self.released())
    }

    fn issue(
        self: &Arc<Self>,
        source: &SourceFrame,
        sequence: u64,
        rotation: SensorRotation,
    ) -> CameraFrame {
        self.produced.fetch_add(1, Ordering::SeqCst);
        let ledger = Arc::clone(self);
        CameraFrame::new(source.width, source.height, source.format, source.data.clone())
            .with_stride(source.stride)
            .with_rotation(rotation)
            .with_sequence(sequence)
            .with_release(move || {
                ledger.released.fetch_add(1, Ordering::SeqCst);
            })
    }
}

/// Behaviour of a [`VirtualCameraBackend`]
#[derive(Debug, Clone)]
pub struct VirtualCameraOptions {
    /// Cameras reported by the provider; front facing needs at least two
    pub camera_count: usize,
    pub has_flash: bool,
    pub rotation: SensorRotation,
    pub frame_interval: Duration,
    /// Replay the frame list forever instead of once
    pub loop_frames: bool,
    /// Make `connect` fail
    pub fail_connect: bool,
    /// Make `bind` fail
    pub fail_bind: bool,
    /// Report display listener registrations
    pub track_display: bool,
}

impl Default for VirtualCameraOptions {
    fn default() -> Self {
        Self {
            camera_count: 1,
            has_flash: true,
            rotation: SensorRotation::None,
            frame_interval: vc::FRAME_INTERVAL,
            loop_frames: false,
            fail_connect: false,
            fail_bind: false,
            track_display: true,
        }
    }
}

/// Virtual camera provider
pub struct VirtualCameraBackend {
    options: VirtualCameraOptions,
    frames: Vec<SourceFrame>,
    ledger: Arc<FrameLedger>,
    next_id: AtomicU64,
    sequence: Arc<AtomicU64>,
    bind_calls: AtomicUsize,
    render_targets: Mutex<HashSet<u64>>,
    display_listeners: Mutex<HashSet<u64>>,
    bound: Mutex<Option<Binding>>,
}

struct Binding {
    camera: Arc<VirtualBoundCamera>,
    sink: Arc<LatestFrameSlot>,
    frame_loop: Option<FrameLoopController>,
}

impl VirtualCameraBackend {
    pub fn new(options: VirtualCameraOptions, frames: Vec<SourceFrame>) -> Self {
        Self {
            options,
            frames,
            ledger: Arc::new(FrameLedger::default()),
            next_id: AtomicU64::new(1),
            sequence: Arc::new(AtomicU64::new(0)),
            bind_calls: AtomicUsize::new(0),
            render_targets: Mutex::new(HashSet::new()),
            display_listeners: Mutex::new(HashSet::new()),
            bound: Mutex::new(None),
        }
    }

    /// Backend with no queued frames; push frames with [`Self::push_frame`]
    pub fn manual(options: VirtualCameraOptions) -> Self {
        Self::new(options, Vec::new())
    }

    pub fn ledger(&self) -> Arc<FrameLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn is_bound(&self) -> bool {
        lock(&self.bound).is_some()
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }

    pub fn live_render_targets(&self) -> usize {
        lock(&self.render_targets).len()
    }

    pub fn display_listener_count(&self) -> usize {
        lock(&self.display_listeners).len()
    }

    /// Observers registered on the currently bound camera
    pub fn observer_count(&self) -> usize {
        lock(&self.bound)
            .as_ref()
            .map(|b| lock(&b.camera.observers).len())
            .unwrap_or(0)
    }

    /// True once the replay loop has pushed every queued frame
    pub fn replay_finished(&self) -> bool {
        lock(&self.bound)
            .as_ref()
            .is_none_or(|b| b.frame_loop.as_ref().is_none_or(|l| !l.is_running()))
    }

    /// Push one frame into the bound sink
    ///
    /// Returns false (the frame is released) when nothing is bound or the sink
    /// is closed.
    pub fn push_frame(&self, source: &SourceFrame) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let frame = self.ledger.issue(source, sequence, self.options.rotation);
        let sink = lock(&self.bound).as_ref().map(|b| Arc::clone(&b.sink));
        match sink {
            Some(sink) => sink.push(frame),
            None => false,
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn resolution(&self) -> Resolution {
        self.frames
            .first()
            .map(|f| Resolution::new(f.width, f.height))
            .unwrap_or(Resolution::new(vc::DEFAULT_WIDTH, vc::DEFAULT_HEIGHT))
    }

    fn start_replay(&self, sink: &Arc<LatestFrameSlot>) -> Option<FrameLoopController> {
        if self.frames.is_empty() {
            return None;
        }

        let frames = self.frames.clone();
        let ledger = Arc::clone(&self.ledger);
        let sequence = Arc::clone(&self.sequence);
        let rotation = self.options.rotation;
        let looping = self.options.loop_frames;
        let sink = Arc::clone(sink);
        let mut index = 0usize;

        Some(FrameLoopController::start("virtual-camera", self.options.frame_interval, move || {
            if index >= frames.len() {
                if !looping {
                    return LoopAction::Stop;
                }
                index = 0;
            }
            let sequence = sequence.fetch_add(1, Ordering::SeqCst);
            let frame = ledger.issue(&frames[index], sequence, rotation);
            index += 1;
            if sink.push(frame) {
                LoopAction::Continue
            } else {
                LoopAction::Stop
            }
        }))
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn connect(&self) -> BackendResult<()> {
        if self.options.fail_connect {
            return Err(BackendError::NotAvailable("virtual camera provider disabled".into()));
        }
        Ok(())
    }

    fn camera_count(&self) -> usize {
        self.options.camera_count
    }

    fn create_render_target(&self) -> BackendResult<RenderTarget> {
        let id = self.allocate_id();
        lock(&self.render_targets).insert(id);
        debug!(id, "Render target created");
        Ok(RenderTarget { id })
    }

    fn release_render_target(&self, target: RenderTarget) {
        if lock(&self.render_targets).remove(&target.id) {
            debug!(id = target.id, "Render target released");
        }
    }

    fn bind(
        &self,
        request: &BindRequest,
        sink: Arc<LatestFrameSlot>,
    ) -> BackendResult<Arc<dyn BoundCamera>> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);

        if self.options.fail_bind {
            return Err(BackendError::BindFailed("bind rejected".into()));
        }
        let available = match request.facing {
            CameraFacing::Back => self.options.camera_count >= 1,
            CameraFacing::Front => self.options.camera_count >= 2,
        };
        if !available {
            return Err(BackendError::DeviceNotFound(format!("no {} camera", request.facing)));
        }
        if !lock(&self.render_targets).contains(&request.render_target.id) {
            return Err(BackendError::BindFailed(format!(
                "unknown render target {}",
                request.render_target.id
            )));
        }

        self.unbind_all();

        let camera = Arc::new(VirtualBoundCamera::new(
            self.resolution(),
            self.options.rotation,
            self.options.has_flash,
        ));
        let frame_loop = self.start_replay(&sink);

        info!(
            facing = %request.facing,
            resolution = %camera.resolution,
            rotation = %camera.rotation,
            queued = self.frames.len(),
            "Virtual camera bound"
        );

        *lock(&self.bound) = Some(Binding {
            camera: Arc::clone(&camera),
            sink,
            frame_loop,
        });
        Ok(camera)
    }

    fn unbind_all(&self) {
        let Some(mut binding) = lock(&self.bound).take() else {
            return;
        };
        if let Some(mut frame_loop) = binding.frame_loop.take() {
            frame_loop.stop();
        }
        lock(&binding.camera.observers).clear();
        debug!("Virtual camera unbound");
    }

    fn register_display_listener(&self) -> Option<RegistrationId> {
        if !self.options.track_display {
            return None;
        }
        let id = self.allocate_id();
        lock(&self.display_listeners).insert(id);
        Some(RegistrationId(id))
    }

    fn unregister_display_listener(&self, id: RegistrationId) {
        lock(&self.display_listeners).remove(&id.0);
    }
}

impl Drop for VirtualCameraBackend {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

/// Camera handle returned by [`VirtualCameraBackend::bind`]
pub struct VirtualBoundCamera {
    resolution: Resolution,
    rotation: SensorRotation,
    has_flash: bool,
    torch: AtomicBool,
    next_observer: AtomicU64,
    observers: Mutex<HashMap<u64, CameraStateObserver>>,
}

impl VirtualBoundCamera {
    fn new(resolution: Resolution, rotation: SensorRotation, has_flash: bool) -> Self {
        Self {
            resolution,
            rotation,
            has_flash,
            torch: AtomicBool::new(false),
            next_observer: AtomicU64::new(1),
            observers: Mutex::new(HashMap::new()),
        }
    }

    fn notify(&self, change: CameraStateChange) {
        for observer in lock(&self.observers).values() {
            observer(change);
        }
    }

    fn apply_zoom(&self, ratio: f32, linear: f32) {
        self.notify(CameraStateChange::Zoom { ratio, linear });
    }
}

impl BoundCamera for VirtualBoundCamera {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn sensor_rotation(&self) -> SensorRotation {
        self.rotation
    }

    fn has_flash_unit(&self) -> bool {
        self.has_flash
    }

    fn torch_enabled(&self) -> bool {
        self.torch.load(Ordering::SeqCst)
    }

    fn enable_torch(&self, enabled: bool) -> BackendResult<()> {
        if !self.has_flash {
            return Err(BackendError::Unsupported("camera has no flash unit".into()));
        }
        if self.torch.swap(enabled, Ordering::SeqCst) != enabled {
            self.notify(CameraStateChange::Torch(enabled));
        }
        Ok(())
    }

    fn set_zoom_ratio(&self, ratio: f32) -> BackendResult<()> {
        if !ratio.is_finite() {
            return Err(BackendError::Unsupported(format!("zoom ratio {}", ratio)));
        }
        let ratio = ratio.clamp(vc::MIN_ZOOM_RATIO, vc::MAX_ZOOM_RATIO);
        let linear = (ratio - vc::MIN_ZOOM_RATIO) / (vc::MAX_ZOOM_RATIO - vc::MIN_ZOOM_RATIO);
        self.apply_zoom(ratio, linear);
        Ok(())
    }

    fn set_linear_zoom(&self, linear: f32) -> BackendResult<()> {
        if !(0.0..=1.0).contains(&linear) {
            warn!(linear, "Linear zoom outside 0..=1");
            return Err(BackendError::Unsupported(format!("linear zoom {}", linear)));
        }
        let ratio = vc::MIN_ZOOM_RATIO + linear * (vc::MAX_ZOOM_RATIO - vc::MIN_ZOOM_RATIO);
        self.apply_zoom(ratio, linear);
        Ok(())
    }

    fn add_state_observer(&self, observer: CameraStateObserver) -> RegistrationId {
        let id = self.next_observer.fetch_add(1, Ordering::SeqCst);
        lock(&self.observers).insert(id, observer);
        RegistrationId(id)
    }

    fn remove_state_observer(&self, id: RegistrationId) {
        lock(&self.observers).remove(&id.0);
    }
}
