/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - Result型でエラー伝播を明示化
/// - 回復可能性をエラー型で表現（Sourceはセッション致命、Transport/Detectionはバナー表示のみ）

use thiserror::Error;

/// Domain層の統一エラー型
#[derive(Error, Debug, Clone)]
pub enum ScanError {
    /// フレームソース関連のエラー（カメラ拒否・デバイスなし）
    ///
    /// セッションに対して致命的。自動リトライは行わず、
    /// 呼び出し側の明示的なstart_preview()でのみ回復する。
    #[error("Source error: {0}")]
    Source(String),

    /// 検出APIへの通信エラー（非2xxステータス・接続失敗・タイムアウト）
    ///
    /// 非致命的。エラーバナーとして表示され、スキャンモードは
    /// 次のtickで自然に再試行する。
    #[error("Transport error: {0}")]
    Transport(String),

    /// 検出エラー（整形式レスポンスの code == ERROR 相当）
    ///
    /// 状態遷移上はTransportと同一の扱い。
    #[error("Detection error: {0}")]
    Detection(String),

    /// 静止画エンコード関連のエラー
    #[error("Encode error: {0}")]
    Encode(String),

    /// 設定関連のエラー
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Domain層の統一Result型
pub type ScanResult<T> = Result<T, ScanError>;
