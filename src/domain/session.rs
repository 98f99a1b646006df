/// キャプチャセッション状態管理
///
/// 1回のドキュメントキャプチャ対話を通して生きる唯一のセッションインスタンス。
/// Controllerのみが変更し、Presentation層はスナップショット経由で読み取る。
///
/// # 不変条件
/// - `is_detected` は単調: 一度trueになったらセッション内でリセットされず、
///   以降のレスポンスは `last_result` / `state` を一切変更しない
/// - `scan_timer_active` ⇒ state ∈ {PreviewActive, CaptureRequested, Submitting}
/// - セッションは `start_preview` ごとに新規作成される

use crate::domain::{DetectionOutcome, EncodedImage, ScanError, ScanResult};

/// セッション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 初期状態（プレビュー未開始）
    Idle,
    /// ライブプレビュー中
    PreviewActive,
    /// キャプチャ要求済み（ラスタライズ中）
    CaptureRequested,
    /// 検出API呼び出し中（複数同時あり得る）
    Submitting,
    /// 検出成功（セッション終端、結果保持）
    Detected,
    /// フレームソース取得失敗（セッション終端）
    Failed,
}

/// レスポンス適用の結果分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDisposition {
    /// 初回の検出成功として適用された
    Detected,
    /// 非致命エラーとして適用された（エラーバナー表示）
    SoftError,
    /// 検出成功後に到着したため破棄された
    Discarded,
}

/// Presentation層へ通知する読み取り専用スナップショット
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub pending_requests: u32,
    pub is_detected: bool,
    pub scan_timer_active: bool,
    pub last_result: Option<DetectionOutcome>,
    pub error: Option<String>,
}

/// キャプチャセッション
#[derive(Debug)]
pub struct CaptureSession {
    state: SessionState,
    /// Submitting解決後に戻る状態（PreviewActiveまたはIdle）
    resume_state: SessionState,
    pending_requests: u32,
    is_detected: bool,
    scan_timer_active: bool,
    last_captured_image: Option<EncodedImage>,
    last_result: Option<DetectionOutcome>,
    last_error: Option<String>,
}

impl CaptureSession {
    /// 新しいIdleセッションを作成
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            resume_state: SessionState::Idle,
            pending_requests: 0,
            is_detected: false,
            scan_timer_active: false,
            last_captured_image: None,
            last_result: None,
            last_error: None,
        }
    }

    // ===== 読み取り =====

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_detected(&self) -> bool {
        self.is_detected
    }

    pub fn pending_requests(&self) -> u32 {
        self.pending_requests
    }

    pub fn scan_timer_active(&self) -> bool {
        self.scan_timer_active
    }

    pub fn last_captured_image(&self) -> Option<&EncodedImage> {
        self.last_captured_image.as_ref()
    }

    pub fn last_result(&self) -> Option<&DetectionOutcome> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// 現在状態のスナップショットを作成
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            pending_requests: self.pending_requests,
            is_detected: self.is_detected,
            scan_timer_active: self.scan_timer_active,
            last_result: self.last_result.clone(),
            error: self.last_error.clone(),
        }
    }

    /// キャプチャ・送信を受け付けられる状態か
    ///
    /// 検出成功後・失敗後・プレビュー未開始では受け付けない。
    pub fn can_capture(&self) -> bool {
        !self.is_detected
            && matches!(
                self.state,
                SessionState::PreviewActive
                    | SessionState::CaptureRequested
                    | SessionState::Submitting
            )
    }

    // ===== 状態遷移（Controllerからのみ呼ばれる） =====

    /// フレームソース取得成功、プレビュー開始
    pub fn begin_preview(&mut self) {
        self.state = SessionState::PreviewActive;
        self.resume_state = SessionState::PreviewActive;
        self.last_error = None;
    }

    /// フレームソース取得失敗（セッション終端）
    pub fn fail_source(&mut self, error: &ScanError) {
        self.state = SessionState::Failed;
        self.scan_timer_active = false;
        self.last_error = Some(error.to_string());
    }

    /// キャプチャ開始（ラスタライズ済み画像を保持）
    pub fn begin_capture(&mut self, image: EncodedImage) {
        if matches!(
            self.state,
            SessionState::Idle | SessionState::PreviewActive
        ) {
            self.resume_state = self.state;
        }
        self.last_captured_image = Some(image);
        self.last_error = None;
        self.state = SessionState::CaptureRequested;
    }

    /// 検出API呼び出し開始（in-flightカウントを増やす）
    pub fn begin_submission(&mut self) {
        if matches!(
            self.state,
            SessionState::Idle | SessionState::PreviewActive
        ) {
            self.resume_state = self.state;
        }
        self.last_error = None;
        self.state = SessionState::Submitting;
        self.pending_requests += 1;
    }

    /// スキャンタイマーを起動
    ///
    /// # Returns
    /// 不変条件（プレビュー系状態のみ、検出成功後は不可）を満たさない場合はfalse
    pub fn arm_scan_timer(&mut self) -> bool {
        if !self.can_capture() {
            return false;
        }
        self.scan_timer_active = true;
        true
    }

    /// スキャンタイマーを停止（in-flight送信はキャンセルしない）
    pub fn disarm_scan_timer(&mut self) {
        self.scan_timer_active = false;
    }

    /// 非致命エラーをバナーとして記録（状態遷移なし）
    ///
    /// スキャンtick中のフレーム取得・エンコード失敗など、
    /// 次のtickで自然に再試行されるケースに使う。
    pub fn record_soft_error(&mut self, error: &ScanError) {
        self.last_error = Some(error.to_string());
    }

    /// 検出APIレスポンスを適用
    ///
    /// 到着順に依存しないsingle-flight-resultポリシー:
    /// 最初に観測された成功が勝ち、以降のレスポンスはすべて破棄される。
    /// どのtickから発行されたかに関わらず `pending_requests` は減算する。
    pub fn apply_outcome(&mut self, outcome: ScanResult<DetectionOutcome>) -> OutcomeDisposition {
        self.pending_requests = self.pending_requests.saturating_sub(1);

        if self.is_detected {
            return OutcomeDisposition::Discarded;
        }

        match outcome {
            Ok(result) if result.is_ok() => {
                self.is_detected = true;
                self.last_result = Some(result);
                self.last_error = None;
                self.scan_timer_active = false;
                self.state = SessionState::Detected;
                OutcomeDisposition::Detected
            }
            Ok(result) => {
                // code == ERROR: エラーバナーを出してストリーミング状態に留まる
                self.last_result = Some(result);
                self.last_error = Some(ScanError::Detection("service returned ERROR".into()).to_string());
                self.resume_after_submission();
                OutcomeDisposition::SoftError
            }
            Err(e) => {
                // 通信エラーはcode == ERRORと同一の扱い
                self.last_error = Some(e.to_string());
                self.resume_after_submission();
                OutcomeDisposition::SoftError
            }
        }
    }

    /// Submitting中のエラー解決後の戻り先
    ///
    /// まだin-flightの送信が残っている間はSubmittingに留まる。
    fn resume_after_submission(&mut self) {
        if self.pending_requests == 0 && self.state == SessionState::Submitting {
            self.state = self.resume_state;
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}
