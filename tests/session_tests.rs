// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the session lifecycle and controls

use futures::future::BoxFuture;
use scanner::backends::camera::{PixelFormat, Resolution, SensorRotation, TorchState};
use scanner::backends::virtual_camera::{SourceFrame, VirtualCameraBackend, VirtualCameraOptions};
use scanner::frame_processor::{
    Barcode, BarcodeDecoder, BarcodeFormat, BoundingBox, DecodeError, DecodeInput, EventReceiver,
};
use scanner::{ScanEvent, ScannerError, ScannerSession, SessionConfig, SessionState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

struct MockDecoder {
    barcodes: Mutex<Vec<Barcode>>,
    delay: Duration,
    calls: AtomicUsize,
    closed: AtomicBool,
    started: Notify,
}

impl MockDecoder {
    fn new(values: &[&str], delay: Duration) -> Arc<Self> {
        let barcodes = values
            .iter()
            .map(|v| Barcode::new(BarcodeFormat::QrCode, *v, BoundingBox::new(0.0, 0.0, 1.0, 1.0)))
            .collect();
        Arc::new(Self {
            barcodes: Mutex::new(barcodes),
            delay,
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            started: Notify::new(),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl BarcodeDecoder for MockDecoder {
    fn decode(&self, _input: DecodeInput) -> BoxFuture<'static, Result<Vec<Barcode>, DecodeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        let barcodes = self.barcodes.lock().unwrap().clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(barcodes)
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct Harness {
    backend: Arc<VirtualCameraBackend>,
    session: ScannerSession,
    events: EventReceiver,
}

fn harness(options: VirtualCameraOptions) -> Harness {
    let backend = Arc::new(VirtualCameraBackend::manual(options));
    let (tx, events) = tokio::sync::mpsc::unbounded_channel();
    let session = ScannerSession::new(backend.clone(), tokio::runtime::Handle::current(), tx);
    Harness {
        backend,
        session,
        events,
    }
}

fn start(
    h: &Harness,
    config: SessionConfig,
    decoder: &Arc<MockDecoder>,
) -> Result<scanner::StartResult, ScannerError> {
    let decoder = Arc::clone(decoder);
    h.session.start(config, move |_| decoder as Arc<dyn BarcodeDecoder>)
}

fn gray_frame() -> SourceFrame {
    SourceFrame::new(4, 4, PixelFormat::Gray8, vec![128u8; 16])
}

async fn next_event(events: &mut EventReceiver) -> Option<ScanEvent> {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .ok()
        .flatten()
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_reports_rotated_preview_size() {
    let h = harness(VirtualCameraOptions {
        rotation: SensorRotation::Rotate90,
        camera_count: 2,
        ..Default::default()
    });
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    let result = start(&h, SessionConfig::default(), &decoder).unwrap();

    assert_eq!((result.width, result.height), (480, 640));
    assert_eq!(result.torch_state, TorchState::Off);
    assert_eq!(result.camera_count, 2);
    assert_eq!(h.session.state(), SessionState::Running);
    assert!(h.backend.is_bound());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_applies_initial_torch() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);
    let config = SessionConfig {
        torch_enabled: true,
        ..Default::default()
    };

    let result = start(&h, config, &decoder).unwrap();
    assert_eq!(result.torch_state, TorchState::On);
    assert_eq!(h.session.torch_state(), TorchState::On);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lifecycle_misuse_errors() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    assert_eq!(h.session.pause(), Err(ScannerError::AlreadyStopped));
    assert_eq!(h.session.stop(), Err(ScannerError::AlreadyStopped));
    assert_eq!(h.session.resume().unwrap_err(), ScannerError::AlreadyStopped);

    start(&h, SessionConfig::default(), &decoder).unwrap();
    let err = start(&h, SessionConfig::default(), &decoder).unwrap_err();
    assert_eq!(err, ScannerError::AlreadyStarted);
    assert_eq!(h.session.resume().unwrap_err(), ScannerError::AlreadyStarted);

    h.session.pause().unwrap();
    assert_eq!(h.session.pause(), Err(ScannerError::AlreadyPaused));
    let err = start(&h, SessionConfig::default(), &decoder).unwrap_err();
    assert_eq!(err, ScannerError::AlreadyStarted);
    assert_eq!(h.session.state(), SessionState::Paused);

    h.session.stop().unwrap();
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert_eq!(h.session.stop(), Err(ScannerError::AlreadyStopped));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_unbinds_and_resume_rebinds() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);
    start(&h, SessionConfig::default(), &decoder).unwrap();

    h.session.pause().unwrap();
    assert!(!h.backend.is_bound());
    assert_eq!(h.backend.live_render_targets(), 1);
    assert!(!decoder.is_closed());
    assert_eq!(h.session.torch_state(), TorchState::Unavailable);

    let resumed = h.session.resume().unwrap();
    assert_eq!(h.session.state(), SessionState::Running);
    assert!(h.backend.is_bound());
    assert_eq!(h.backend.bind_calls(), 2);
    assert_eq!(resumed.torch_state, TorchState::Off);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_releases_everything() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&["a"], Duration::ZERO);
    let config = SessionConfig {
        target_resolution: Some(Resolution::new(1280, 720)),
        ..Default::default()
    };
    start(&h, config, &decoder).unwrap();
    assert_eq!(h.backend.display_listener_count(), 1);
    assert_eq!(h.backend.observer_count(), 1);

    h.backend.push_frame(&gray_frame());
    assert!(wait_until(|| !h.session.last_scanned().is_empty()).await);

    h.session.stop().unwrap();

    assert!(!h.backend.is_bound());
    assert_eq!(h.backend.live_render_targets(), 0);
    assert_eq!(h.backend.display_listener_count(), 0);
    assert!(decoder.is_closed());
    assert!(h.session.last_scanned().is_empty());
    assert!(wait_until(|| h.backend.ledger().outstanding() == 0).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_failure_leaves_session_stopped() {
    let h = harness(VirtualCameraOptions {
        fail_connect: true,
        ..Default::default()
    });
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    let err = start(&h, SessionConfig::default(), &decoder).unwrap_err();

    assert!(matches!(err, ScannerError::CameraError(_)));
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert_eq!(h.backend.live_render_targets(), 0);
    assert!(decoder.is_closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bind_failure_is_no_camera() {
    let h = harness(VirtualCameraOptions {
        fail_bind: true,
        ..Default::default()
    });
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    assert_eq!(start(&h, SessionConfig::default(), &decoder).unwrap_err(), ScannerError::NoCamera);
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert_eq!(h.backend.live_render_targets(), 0);
    assert!(decoder.is_closed());

    // A later start with a working camera is not blocked
    let h = harness(VirtualCameraOptions::default());
    assert!(start(&h, SessionConfig::default(), &MockDecoder::new(&[], Duration::ZERO)).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_front_camera_missing_is_no_camera() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);
    let config = SessionConfig {
        facing: scanner::backends::camera::CameraFacing::Front,
        ..Default::default()
    };
    assert_eq!(start(&h, config, &decoder).unwrap_err(), ScannerError::NoCamera);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_detection_reaches_caller() {
    let mut h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&["hello"], Duration::ZERO);
    start(&h, SessionConfig::default(), &decoder).unwrap();

    assert!(h.backend.push_frame(&gray_frame()));

    match next_event(&mut h.events).await {
        Some(ScanEvent::Detected(detection)) => {
            assert_eq!(detection.barcodes[0].raw_value.as_deref(), Some("hello"));
            assert_eq!((detection.width, detection.height), (4, 4));
        }
        other => panic!("Expected detection, got {:?}", other),
    }
    assert_eq!(h.session.last_scanned(), vec!["hello"]);
    assert!(wait_until(|| h.backend.ledger().outstanding() == 0).await);
    assert_eq!(h.session.stats().emitted, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_decode_finishing_after_stop_emits_nothing() {
    let mut h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&["late"], Duration::from_millis(300));
    start(&h, SessionConfig::default(), &decoder).unwrap();

    h.backend.push_frame(&gray_frame());
    tokio::time::timeout(Duration::from_secs(2), decoder.started.notified())
        .await
        .unwrap();
    h.session.stop().unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    while let Ok(event) = h.events.try_recv() {
        assert!(!matches!(event, ScanEvent::Detected(_)), "Unexpected {:?}", event);
    }
    assert_eq!(h.backend.ledger().outstanding(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_after_stop_reports_again() {
    let mut h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&["same"], Duration::ZERO);

    start(&h, SessionConfig::default(), &decoder).unwrap();
    h.backend.push_frame(&gray_frame());
    assert!(matches!(next_event(&mut h.events).await, Some(ScanEvent::Detected(_))));
    h.session.stop().unwrap();

    let decoder = MockDecoder::new(&["same"], Duration::ZERO);
    start(&h, SessionConfig::default(), &decoder).unwrap();
    h.backend.push_frame(&gray_frame());
    assert!(matches!(next_event(&mut h.events).await, Some(ScanEvent::Detected(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_torch_emits_state_changes() {
    let mut h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    // No camera: no-op
    h.session.toggle_torch().unwrap();

    start(&h, SessionConfig::default(), &decoder).unwrap();
    h.session.toggle_torch().unwrap();
    assert_eq!(next_event(&mut h.events).await, Some(ScanEvent::TorchStateChanged(TorchState::On)));
    h.session.toggle_torch().unwrap();
    assert_eq!(
        next_event(&mut h.events).await,
        Some(ScanEvent::TorchStateChanged(TorchState::Off))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_torch_without_flash_is_noop() {
    let mut h = harness(VirtualCameraOptions {
        has_flash: false,
        ..Default::default()
    });
    let decoder = MockDecoder::new(&[], Duration::ZERO);
    let result = start(&h, SessionConfig::default(), &decoder).unwrap();
    assert_eq!(result.torch_state, TorchState::Unavailable);

    h.session.toggle_torch().unwrap();
    assert_eq!(h.session.torch_state(), TorchState::Unavailable);
    assert!(h.events.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zoom_validation() {
    let mut h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    // Range is checked before state
    assert_eq!(h.session.set_linear_zoom(1.5), Err(ScannerError::ZoomNotInRange));
    assert_eq!(h.session.set_linear_zoom(f32::NAN), Err(ScannerError::ZoomNotInRange));
    assert_eq!(h.session.set_linear_zoom(0.5), Err(ScannerError::ZoomWhenStopped));
    assert_eq!(h.session.set_zoom_ratio(2.0), Err(ScannerError::ZoomWhenStopped));
    assert_eq!(h.session.reset_zoom(), Err(ScannerError::ZoomWhenStopped));

    start(&h, SessionConfig::default(), &decoder).unwrap();
    assert_eq!(h.session.set_linear_zoom(-0.1), Err(ScannerError::ZoomNotInRange));
    h.session.set_linear_zoom(0.5).unwrap();
    assert_eq!(next_event(&mut h.events).await, Some(ScanEvent::ZoomChanged(0.5)));
    h.session.reset_zoom().unwrap();
    assert_eq!(next_event(&mut h.events).await, Some(ScanEvent::ZoomChanged(0.0)));

    h.session.pause().unwrap();
    assert_eq!(h.session.set_zoom_ratio(2.0), Err(ScannerError::ZoomWhenStopped));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispose_and_drop_tear_down() {
    let h = harness(VirtualCameraOptions::default());
    let decoder = MockDecoder::new(&[], Duration::ZERO);

    h.session.dispose();
    start(&h, SessionConfig::default(), &decoder).unwrap();
    h.session.dispose();
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert!(decoder.is_closed());
    h.session.dispose();

    let decoder = MockDecoder::new(&[], Duration::ZERO);
    start(&h, SessionConfig::default(), &decoder).unwrap();
    let backend = Arc::clone(&h.backend);
    drop(h);
    assert!(!backend.is_bound());
    assert_eq!(backend.live_render_targets(), 0);
    assert!(decoder.is_closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sessions_are_independent() {
    let first = harness(VirtualCameraOptions::default());
    let second = harness(VirtualCameraOptions::default());
    start(&first, SessionConfig::default(), &MockDecoder::new(&[], Duration::ZERO)).unwrap();
    start(&second, SessionConfig::default(), &MockDecoder::new(&[], Duration::ZERO)).unwrap();

    assert_ne!(first.session.session_id(), second.session.session_id());
    first.session.stop().unwrap();
    assert_eq!(second.session.state(), SessionState::Running);
}
