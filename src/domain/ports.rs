/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。

use crate::domain::{DetectionOutcome, EncodedImage, Frame, ScanResult, SessionSnapshot};

/// フレームソースポート: ライブフィードの取得を抽象化
pub trait FrameSourcePort {
    /// ライブフィードを開始する
    ///
    /// ユーザー・環境による拒否（カメラ権限なし、デバイスなし）があり得る。
    /// 失敗はセッションに対して致命的で、Controllerは自動リトライしない。
    ///
    /// # Returns
    /// - `Ok(())`: フィード開始成功
    /// - `Err(ScanError::Source)`: 取得拒否・デバイスなし
    fn acquire_live_feed(&mut self) -> ScanResult<()>;

    /// フィードが最初の有効フレームを報告済みか（"canplay" 相当）
    ///
    /// falseの間、キャプチャはno-opとして扱われる。
    fn is_ready(&self) -> bool;

    /// 現在のライブフレームを取得する
    ///
    /// `is_ready()` がtrueになってからのみ呼ばれる。
    fn current_frame(&mut self) -> ScanResult<Frame>;
}

/// ラスタライザポート: フレームから静止画へのエンコードを抽象化
pub trait RasterizerPort {
    /// フレームを目標幅の静止画にエンコードする
    ///
    /// 出力高さは `source_height / (source_width / target_width)` で
    /// アスペクト比を保存する。
    ///
    /// # Returns
    /// - `Ok(EncodedImage)`: エンコード済み静止画（PNG）
    /// - `Err(ScanError::Encode)`: フレーム不正・エンコード失敗
    fn capture(&self, frame: &Frame, target_width: u32) -> ScanResult<EncodedImage>;
}

/// 検出ポート: リモートドキュメント検出APIの呼び出しを抽象化
///
/// ワーカースレッドから共有参照で呼ばれるため `Send + Sync`。
/// 実装はリトライせず、非成功ステータスをそのままTransportエラーとして返す。
pub trait DetectionPort: Send + Sync {
    /// 画像を検出APIへ送信する
    ///
    /// # Arguments
    /// - `image`: キャプチャ済み静止画。Noneの場合は画像なしで送信
    ///   （手動フォーム送信でキャプチャが存在しないケース）
    ///
    /// # Returns
    /// - `Ok(DetectionOutcome)`: 整形式レスポンス（OK/ERROR両方）
    /// - `Err(ScanError::Transport)`: 非2xx・接続失敗・タイムアウト
    fn submit(&self, image: Option<&EncodedImage>) -> ScanResult<DetectionOutcome>;
}

/// セッション監視ポート: Presentation層への状態遷移通知を抽象化
///
/// Controllerはレンダリング面に直接触れず、すべての状態遷移を
/// スナップショットとして通知する。
pub trait SessionObserver {
    /// 状態遷移ごとに呼ばれる
    fn on_transition(&self, snapshot: &SessionSnapshot);
}

/// 通知を行わないObserver（テスト・ツール用）
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_transition(&self, _snapshot: &SessionSnapshot) {}
}
