//! キャプチャ・検出コントローラーモジュール
//!
//! プレビュー開始、単発キャプチャ、スキャンモード（繰り返しタイマー）、
//! 手動送信を制御する状態機械の本体。
//!
//! # 並行性モデル
//! セッションの変更はすべてControllerを駆動するスレッド上で直列に適用される。
//! 検出APIの送信はワーカースレッドにfire-and-forgetで発行され、
//! 結果はcrossbeamチャネル経由で戻り、`pump()` / `run()` が1件ずつ
//! 完結実行で適用する。レスポンスハンドラ同士が交錯することはない。
//!
//! # レースポリシー
//! 複数のin-flight送信は発行順と無関係に完了する。最初に観測された
//! 成功だけが適用され（single-flight-result）、以降の結果はセッションが
//! すべて破棄する。キャンセルチャネルは存在しない: スキャンモード停止は
//! 新規発行を止めるだけで、in-flightの送信は完了まで走る。
//! セッションを跨ぐ結果は世代番号の不一致で破棄され、新セッションには
//! 一切適用されない。

use crate::application::stats::ScanStats;
use crate::domain::{
    AppConfig, CaptureSession, DetectionOutcome, DetectionPort, EncodedImage, FrameSourcePort,
    OutcomeDisposition, RasterizerPort, ScanResult, SessionObserver, SessionSnapshot,
    SessionState,
};
use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Presentation層からControllerへ送る操作コマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// プレビュー開始（新セッション）
    StartPreview,
    /// 単発キャプチャ＋送信
    CaptureOnce,
    /// スキャンモード開始
    StartScanMode,
    /// スキャンモード停止
    StopScanMode,
    /// 手動送信（最後のキャプチャ画像、なければ画像なし）
    SubmitCurrentCapture,
    /// セッション破棄
    Reset,
    /// ループ終了
    Shutdown,
}

/// ワーカースレッドから戻る送信結果
#[derive(Debug)]
struct SubmissionOutcome {
    result: ScanResult<DetectionOutcome>,
    dispatched_at: Instant,
    /// 発行元セッションの世代番号
    generation: u64,
}

/// キャプチャ・検出コントローラー
pub struct Controller<S, R, D, O>
where
    S: FrameSourcePort,
    R: RasterizerPort,
    D: DetectionPort + 'static,
    O: SessionObserver,
{
    source: S,
    rasterizer: R,
    detection: Arc<D>,
    observer: O,
    session: CaptureSession,
    /// 現在のセッションの世代番号
    ///
    /// `start_preview` / `reset` のたびに増える。破棄された旧セッションが
    /// 発行した送信の結果が新セッションへ適用されるのを防ぐ。
    generation: u64,
    stats: ScanStats,
    target_width: u32,
    scan_interval: Duration,
    outcome_tx: Sender<SubmissionOutcome>,
    outcome_rx: Receiver<SubmissionOutcome>,
    /// スキャンモードの繰り返しタイマー（armed時のみSome）
    scan_ticker: Option<Receiver<Instant>>,
}

impl<S, R, D, O> Controller<S, R, D, O>
where
    S: FrameSourcePort,
    R: RasterizerPort,
    D: DetectionPort + 'static,
    O: SessionObserver,
{
    /// 新しいControllerを作成
    pub fn new(source: S, rasterizer: R, detection: D, observer: O, config: &AppConfig) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            source,
            rasterizer,
            detection: Arc::new(detection),
            observer,
            session: CaptureSession::new(),
            generation: 0,
            stats: ScanStats::new(),
            target_width: config.capture.target_width,
            scan_interval: config.capture.scan_interval(),
            outcome_tx,
            outcome_rx,
            scan_ticker: None,
        }
    }

    // ===== Presentation向け操作 =====

    /// プレビューを開始する（新セッション、バナークリア）
    ///
    /// フレームソース取得失敗はFailed状態＋通知に変換され、
    /// 呼び出し側へは決して伝播しない。自動リトライもしない。
    pub fn start_preview(&mut self) {
        self.session = CaptureSession::new();
        self.generation += 1;
        self.stats.reset();
        self.scan_ticker = None;

        match self.source.acquire_live_feed() {
            Ok(()) => {
                tracing::info!("Live preview started");
                self.session.begin_preview();
            }
            Err(e) => {
                tracing::error!("Failed to acquire live feed: {}", e);
                self.session.fail_source(&e);
            }
        }
        self.notify();
    }

    /// 現在フレームをキャプチャして1回送信する
    ///
    /// フィードが最初の有効フレームを報告するまで（"canplay" 前）はno-op。
    /// プレビュー未開始・検出成功後・Failed状態でもno-op。
    pub fn capture_once(&mut self) {
        if !self.session.can_capture() {
            tracing::warn!(
                "capture_once ignored: state={:?}, detected={}",
                self.session.state(),
                self.session.is_detected()
            );
            return;
        }
        if !self.source.is_ready() {
            tracing::warn!("capture_once ignored: live feed not ready");
            return;
        }

        let image = match self.rasterize_current_frame() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Frame capture failed: {}", e);
                self.session.record_soft_error(&e);
                self.notify();
                return;
            }
        };

        self.session.begin_capture(image.clone());
        self.notify();
        self.session.begin_submission();
        self.notify();
        self.dispatch(Some(image));
    }

    /// スキャンモードを開始する
    ///
    /// 周期タイマーを起動し、tickごとに現在フレームを再キャプチャして
    /// 新しい送信を発行する。前のtickの送信が未完了でも待たない
    /// （fire-and-forget。in-flight数は1を超え得る）。
    pub fn start_scan_mode(&mut self) {
        if !self.session.arm_scan_timer() {
            tracing::warn!(
                "start_scan_mode ignored: state={:?}, detected={}",
                self.session.state(),
                self.session.is_detected()
            );
            return;
        }
        self.scan_ticker = Some(tick(self.scan_interval));
        tracing::info!("Scan mode armed: interval={}ms", self.scan_interval.as_millis());
        self.notify();
    }

    /// スキャンモードを停止する
    ///
    /// タイマーを止めるだけで、in-flightの送信はキャンセルしない。
    /// 遅れて到着した結果はレースポリシーに従って適用・破棄される。
    pub fn stop_scan_mode(&mut self) {
        self.session.disarm_scan_timer();
        self.scan_ticker = None;
        tracing::info!("Scan mode disarmed");
        self.notify();
    }

    /// 手動送信（フォームsubmit相当）
    ///
    /// 最後にキャプチャした画像があればそれを、なければ画像なしで送信する。
    pub fn submit_current_capture(&mut self) {
        if self.session.is_detected() || self.session.state() == SessionState::Failed {
            tracing::warn!(
                "submit_current_capture ignored: state={:?}",
                self.session.state()
            );
            return;
        }

        let image = self.session.last_captured_image().cloned();
        if image.is_none() {
            tracing::info!("Submitting without captured image");
        }
        self.session.begin_submission();
        self.notify();
        self.dispatch(image);
    }

    /// セッションを破棄してIdleに戻す
    pub fn reset(&mut self) {
        self.session = CaptureSession::new();
        self.generation += 1;
        self.stats.reset();
        self.scan_ticker = None;
        self.notify();
    }

    // ===== 駆動ループ =====

    /// コマンドチャネル駆動のメインループ（ブロッキング）
    ///
    /// コマンド・スキャンtick・送信結果を単一スレッドでselectし、
    /// 各ハンドラを完結実行する。Shutdownまたはチャネル切断で戻る。
    pub fn run(&mut self, commands: Receiver<Command>) {
        let outcomes = self.outcome_rx.clone();
        loop {
            let ticker = self.scan_ticker.clone().unwrap_or_else(never);
            select! {
                recv(commands) -> msg => match msg {
                    Ok(Command::Shutdown) | Err(_) => {
                        self.stats.report();
                        return;
                    }
                    Ok(command) => self.handle_command(command),
                },
                recv(outcomes) -> msg => match msg {
                    Ok(outcome) => self.handle_outcome(outcome),
                    Err(_) => return,
                },
                recv(ticker) -> msg => {
                    if msg.is_ok() {
                        self.scan_tick();
                    }
                }
            }
        }
    }

    /// 保留中のイベントを指定時間まで処理する（テスト・組み込み駆動用）
    ///
    /// 送信結果とスキャンtickを到着順に適用し、timeout経過で戻る。
    pub fn pump(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let outcomes = self.outcome_rx.clone();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            let ticker = self.scan_ticker.clone().unwrap_or_else(never);
            select! {
                recv(outcomes) -> msg => match msg {
                    Ok(outcome) => self.handle_outcome(outcome),
                    Err(_) => return,
                },
                recv(ticker) -> msg => {
                    if msg.is_ok() {
                        self.scan_tick();
                    }
                }
                default(remaining) => return,
            }
        }
    }

    // ===== 読み取り =====

    /// 現在のセッションスナップショット
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// セッション統計
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    // ===== 内部処理 =====

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartPreview => self.start_preview(),
            Command::CaptureOnce => self.capture_once(),
            Command::StartScanMode => self.start_scan_mode(),
            Command::StopScanMode => self.stop_scan_mode(),
            Command::SubmitCurrentCapture => self.submit_current_capture(),
            Command::Reset => self.reset(),
            Command::Shutdown => {}
        }
    }

    /// スキャンタイマーのtick処理
    ///
    /// 検出成功が確定していない間のみ、capture_once相当を実行する。
    fn scan_tick(&mut self) {
        if !self.session.scan_timer_active() || self.session.is_detected() {
            return;
        }
        if !self.source.is_ready() {
            tracing::debug!("Scan tick skipped: live feed not ready");
            return;
        }

        match self.rasterize_current_frame() {
            Ok(image) => {
                self.session.begin_capture(image.clone());
                self.notify();
                self.session.begin_submission();
                self.notify();
                self.dispatch(Some(image));
            }
            Err(e) => {
                // 次のtickで自然に再試行されるため非致命
                tracing::warn!("Scan tick capture failed: {}", e);
                self.session.record_soft_error(&e);
                self.notify();
            }
        }
    }

    /// 現在フレームを取得して目標幅の静止画へエンコード
    fn rasterize_current_frame(&mut self) -> ScanResult<EncodedImage> {
        let frame = self.source.current_frame()?;
        self.rasterizer.capture(&frame, self.target_width)
    }

    /// 送信をワーカースレッドへ発行（fire-and-forget）
    fn dispatch(&mut self, image: Option<EncodedImage>) {
        self.stats.record_dispatch();
        let detection = Arc::clone(&self.detection);
        let tx = self.outcome_tx.clone();
        let dispatched_at = Instant::now();
        let generation = self.generation;

        std::thread::spawn(move || {
            let result = detection.submit(image.as_ref());
            // Controller側が先に破棄されていた場合は結果ごと捨てるだけでよい
            let _ = tx.send(SubmissionOutcome {
                result,
                dispatched_at,
                generation,
            });
        });
    }

    /// 送信結果を1件適用する
    fn handle_outcome(&mut self, outcome: SubmissionOutcome) {
        // 破棄済みセッションが発行した送信の結果は新セッションに触れない
        if outcome.generation != self.generation {
            self.stats.record_discarded();
            tracing::debug!("Response from superseded session discarded");
            return;
        }

        self.stats.record_round_trip(outcome.dispatched_at.elapsed());

        match self.session.apply_outcome(outcome.result) {
            OutcomeDisposition::Detected => {
                self.stats.record_detection();
                self.scan_ticker = None;
                let has_document = self
                    .session
                    .last_result()
                    .map(|r| r.document.is_some())
                    .unwrap_or(false);
                tracing::info!("Document detected (document bytes: {})", has_document);
                self.notify();
            }
            OutcomeDisposition::SoftError => {
                self.stats.record_error();
                tracing::warn!(
                    "Detection attempt failed: {}",
                    self.session.last_error().unwrap_or("unknown")
                );
                self.notify();
            }
            OutcomeDisposition::Discarded => {
                self.stats.record_discarded();
                tracing::debug!("Late response discarded after detection");
            }
        }
    }

    /// 状態遷移をPresentation層へ通知
    fn notify(&self) {
        self.observer.on_transition(&self.session.snapshot());
    }
}
