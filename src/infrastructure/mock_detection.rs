/// モック検出クライアントアダプタ
///
/// テスト・開発用の検出APIモック実装。
/// スクリプト化された結果列を順に返し、使い切ったらフォールバック値を返す。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::{DetectionOutcome, DetectionPort, EncodedImage, ScanResult};

/// モック検出クライアント
pub struct MockDetectionClient {
    script: Mutex<VecDeque<ScanResult<DetectionOutcome>>>,
    fallback: ScanResult<DetectionOutcome>,
    latency: Duration,
    submissions: AtomicU64,
    last_image: Mutex<Option<EncodedImage>>,
}

impl MockDetectionClient {
    /// スクリプト化された結果列を返すモックを作成
    ///
    /// 結果列を使い切った後は `fallback`（デフォルト: ERROR）を返す。
    pub fn scripted(outcomes: Vec<ScanResult<DetectionOutcome>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            fallback: Ok(DetectionOutcome::error()),
            latency: Duration::ZERO,
            submissions: AtomicU64::new(0),
            last_image: Mutex::new(None),
        }
    }

    /// 常にERRORを返すモックを作成
    pub fn always_error() -> Self {
        Self::scripted(Vec::new())
    }

    /// ネットワーク遅延をシミュレートする
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// これまでに受け付けた送信の総数
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// 直近の送信に付いていた画像（なければNone）
    pub fn last_image(&self) -> Option<EncodedImage> {
        self.last_image.lock().expect("lock poisoned").clone()
    }
}

impl DetectionPort for MockDetectionClient {
    fn submit(&self, image: Option<&EncodedImage>) -> ScanResult<DetectionOutcome> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        *self.last_image.lock().expect("lock poisoned") = image.cloned();

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Arc越しの共有参照でも送信できるようにする
///
/// Controllerにムーブした後もテスト側から `submissions()` /
/// `last_image()` を観測したい場合に使う。
impl DetectionPort for std::sync::Arc<MockDetectionClient> {
    fn submit(&self, image: Option<&EncodedImage>) -> ScanResult<DetectionOutcome> {
        self.as_ref().submit(image)
    }
}
