//! Controller統合テスト
//!
//! Infrastructure層のモックアダプタとPNGラスタライザを組み合わせて、
//! スキャンモード・レースポリシー・通知の一連の流れを検証する。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use docuscan::application::controller::{Command, Controller};
use docuscan::domain::{
    AppConfig, DetectionOutcome, ScanError, SessionObserver, SessionSnapshot, SessionState,
};
use docuscan::infrastructure::mock_detection::MockDetectionClient;
use docuscan::infrastructure::mock_source::MockFrameSource;
use docuscan::infrastructure::png_raster::PngRasterizer;

/// スナップショット列を記録するObserver
#[derive(Clone)]
struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<SessionSnapshot>>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn states(&self) -> Vec<SessionState> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.state)
            .collect()
    }

    fn last(&self) -> Option<SessionSnapshot> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_transition(&self, snapshot: &SessionSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// テスト用の短周期設定
fn fast_config(scan_interval_ms: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.capture.scan_interval_ms = scan_interval_ms;
    config
}

/// 条件成立までイベントを処理する（最大5秒）
fn pump_until<S, R, D, O, F>(controller: &mut Controller<S, R, D, O>, mut predicate: F) -> bool
where
    S: docuscan::domain::FrameSourcePort,
    R: docuscan::domain::RasterizerPort,
    D: docuscan::domain::DetectionPort + 'static,
    O: SessionObserver,
    F: FnMut(&SessionSnapshot) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if predicate(&controller.snapshot()) {
            return true;
        }
        controller.pump(Duration::from_millis(20));
    }
    predicate(&controller.snapshot())
}

#[test]
fn test_scan_mode_retries_until_detection() {
    let detection = MockDetectionClient::scripted(vec![
        Ok(DetectionOutcome::error()),
        Err(ScanError::Transport("HTTP status 503".into())),
        Ok(DetectionOutcome::ok(Some(vec![9, 9, 9]))),
    ]);
    let mut controller = Controller::new(
        MockFrameSource::new(640, 360),
        PngRasterizer,
        detection,
        RecordingObserver::new(),
        &fast_config(30),
    );

    controller.start_preview();
    controller.start_scan_mode();
    assert!(controller.snapshot().scan_timer_active);

    assert!(pump_until(&mut controller, |s| s.is_detected));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Detected);
    assert!(!snapshot.scan_timer_active);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.last_result.unwrap().document.unwrap(), vec![9, 9, 9]);
    assert!(controller.stats().dispatched() >= 3);
    assert!(controller.stats().applied_errors() >= 2);
}

#[test]
fn test_detection_stops_further_submissions() {
    let detection = MockDetectionClient::scripted(vec![Ok(DetectionOutcome::ok(None))]);
    let mut controller = Controller::new(
        MockFrameSource::new(640, 360),
        PngRasterizer,
        detection,
        RecordingObserver::new(),
        &fast_config(30),
    );

    controller.start_preview();
    controller.start_scan_mode();
    assert!(pump_until(&mut controller, |s| s.is_detected));

    // 検出成功後はタイマーが止まり、新しい送信は発行されない
    let submissions_at_detection = controller.stats().dispatched();
    controller.pump(Duration::from_millis(150));
    assert_eq!(controller.stats().dispatched(), submissions_at_detection);

    // スキャン再開・キャプチャ・手動送信もすべてno-op
    controller.start_scan_mode();
    controller.capture_once();
    controller.submit_current_capture();
    controller.pump(Duration::from_millis(100));
    assert_eq!(controller.stats().dispatched(), submissions_at_detection);
    assert!(!controller.snapshot().scan_timer_active);
}

#[test]
fn test_overlapping_submissions_first_success_wins() {
    // レイテンシ(120ms) > 周期(40ms) のため、in-flight送信が重なる
    let detection = MockDetectionClient::scripted(vec![
        Ok(DetectionOutcome::error()),
        Ok(DetectionOutcome::ok(Some(vec![1, 2]))),
        Ok(DetectionOutcome::error()),
        Ok(DetectionOutcome::error()),
    ])
    .with_latency(Duration::from_millis(120));
    let mut controller = Controller::new(
        MockFrameSource::new(640, 360),
        PngRasterizer,
        detection,
        RecordingObserver::new(),
        &fast_config(40),
    );

    controller.start_preview();
    controller.start_scan_mode();
    assert!(pump_until(&mut controller, |s| s.is_detected));

    let result = controller.snapshot().last_result.unwrap();
    assert_eq!(result.document.as_deref(), Some(&[1u8, 2][..]));

    // 残りのin-flight送信を回収しても、最初の成功結果は上書きされない
    assert!(pump_until(&mut controller, |s| s.pending_requests == 0));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Detected);
    assert_eq!(snapshot.last_result.unwrap().document.as_deref(), Some(&[1u8, 2][..]));
    assert!(snapshot.error.is_none());
    assert!(controller.stats().discarded() >= 1);
}

#[test]
fn test_stop_scan_mode_keeps_inflight_running() {
    let detection = MockDetectionClient::scripted(vec![Ok(DetectionOutcome::ok(None))])
        .with_latency(Duration::from_millis(80));
    let mut controller = Controller::new(
        MockFrameSource::new(640, 360),
        PngRasterizer,
        detection,
        RecordingObserver::new(),
        &fast_config(30),
    );

    controller.start_preview();
    controller.start_scan_mode();

    // 最初の送信が発行されるまで待ってから停止する
    assert!(pump_until(&mut controller, |s| s.pending_requests > 0));
    controller.stop_scan_mode();
    assert!(!controller.snapshot().scan_timer_active);

    // 停止してもin-flightの結果は適用される
    assert!(pump_until(&mut controller, |s| s.is_detected));
    assert_eq!(controller.snapshot().state, SessionState::Detected);
}

#[test]
fn test_capture_produces_scaled_png() {
    let detection = Arc::new(MockDetectionClient::always_error());
    let mut controller = Controller::new(
        MockFrameSource::new(1280, 720),
        PngRasterizer,
        Arc::clone(&detection),
        RecordingObserver::new(),
        &AppConfig::default(),
    );

    controller.start_preview();
    controller.capture_once();
    assert!(pump_until(&mut controller, |s| s.pending_requests == 0));

    // 検出クライアントへ渡った画像は目標幅320pxへ縮小されたPNG
    let image = detection.last_image().expect("画像付き送信のはず");
    assert_eq!(image.width, 320);
    assert_eq!(image.height, 180);

    let decoded = image::load_from_memory(&image.data).expect("PNGとしてデコード可能なはず");
    assert_eq!(decoded.width(), 320);
    assert_eq!(decoded.height(), 180);
}

#[test]
fn test_source_denial_is_terminal() {
    let detection = MockDetectionClient::always_error();
    let observer = RecordingObserver::new();
    let mut controller = Controller::new(
        MockFrameSource::denied(),
        PngRasterizer,
        detection,
        observer.clone(),
        &fast_config(30),
    );

    controller.start_preview();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Failed);
    assert!(snapshot.error.is_some());

    // Failed中の操作はすべてno-op、送信は1件も発行されない
    controller.capture_once();
    controller.start_scan_mode();
    controller.submit_current_capture();
    controller.pump(Duration::from_millis(100));
    assert_eq!(controller.stats().dispatched(), 0);
    assert_eq!(observer.last().unwrap().state, SessionState::Failed);
}

#[test]
fn test_observer_sees_transition_sequence() {
    let detection = MockDetectionClient::scripted(vec![Ok(DetectionOutcome::ok(None))]);
    let observer = RecordingObserver::new();
    let mut controller = Controller::new(
        MockFrameSource::new(320, 240),
        PngRasterizer,
        detection,
        observer.clone(),
        &AppConfig::default(),
    );

    controller.start_preview();
    controller.capture_once();
    assert!(pump_until(&mut controller, |s| s.is_detected));

    assert_eq!(
        observer.states(),
        vec![
            SessionState::PreviewActive,
            SessionState::CaptureRequested,
            SessionState::Submitting,
            SessionState::Detected,
        ]
    );
}

#[test]
fn test_command_driven_run_loop() {
    let detection = MockDetectionClient::scripted(vec![Ok(DetectionOutcome::ok(None))]);
    let observer = RecordingObserver::new();
    let mut controller = Controller::new(
        MockFrameSource::new(320, 240),
        PngRasterizer,
        detection,
        observer.clone(),
        &fast_config(30),
    );

    let (tx, rx) = crossbeam_channel::unbounded::<Command>();
    let handle = std::thread::spawn(move || {
        controller.run(rx);
    });

    tx.send(Command::StartPreview).unwrap();
    tx.send(Command::StartScanMode).unwrap();

    // 検出成功がObserver経由で見えるまで待つ
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if observer
            .last()
            .map(|s| s.state == SessionState::Detected)
            .unwrap_or(false)
        {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    tx.send(Command::Shutdown).unwrap();
    handle.join().expect("ループスレッドの終了失敗");

    assert_eq!(observer.last().unwrap().state, SessionState::Detected);
}
