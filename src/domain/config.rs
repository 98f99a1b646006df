//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。
//! 認証情報（licenseId・APIのベースURL）はプロセス全体のシングルトンではなく、
//! ここで読み込んだ値オブジェクトとして検出クライアントに注入される。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{ScanError, ScanResult};

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// 検出API設定
    pub api: ApiConfig,
    /// キャプチャ設定
    pub capture: CaptureConfig,
}

/// 検出API設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiConfig {
    /// 検出APIのベースURL
    ///
    /// 末尾スラッシュなし。`/detectDocument.json` が付与される
    pub base_url: String,

    /// 全送信に付与される固定ライセンスID
    pub license_id: String,

    /// 切り出し済みドキュメント画像をレスポンスに含めるか
    ///
    /// デフォルト: true
    #[serde(default = "default_return_document")]
    pub return_document: bool,

    /// 送信1回あたりのタイムアウト（ミリ秒）
    ///
    /// fire-and-forgetのスキャンモードでin-flight数が無制限に
    /// 伸びないよう、各リクエストをこの時間で打ち切る
    /// デフォルト: 10000ms
    pub timeout_ms: u64,
}

fn default_return_document() -> bool {
    true
}

impl ApiConfig {
    /// デフォルトのベースURL（公開デモエンドポイント）
    pub const DEFAULT_BASE_URL: &'static str = "https://demo.mobbeel.com/mobbscan";
    /// デフォルトのライセンスID
    pub const DEFAULT_LICENSE_ID: &'static str = "mobbscan-challenge";
    /// デフォルトの送信タイムアウト（ミリ秒）
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 検出エンドポイントの完全URL
    pub fn detect_endpoint(&self) -> String {
        format!("{}/detectDocument.json", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            license_id: Self::DEFAULT_LICENSE_ID.to_string(),
            return_document: true,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}

/// キャプチャ設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// 静止画の目標幅（ピクセル）
    ///
    /// 高さはソースのアスペクト比から自動計算される
    /// デフォルト: 320
    pub target_width: u32,

    /// スキャンモードのタイマー周期（ミリ秒）
    ///
    /// tickごとに現在フレームを再キャプチャし、前回の送信の完了を
    /// 待たずに新しい送信を発行する
    /// デフォルト: 2000ms
    pub scan_interval_ms: u64,
}

impl CaptureConfig {
    /// デフォルトの目標幅（ピクセル）
    pub const DEFAULT_TARGET_WIDTH: u32 = 320;
    /// デフォルトのスキャン周期（ミリ秒）
    pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 2000;

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_width: Self::DEFAULT_TARGET_WIDTH,
            scan_interval_ms: Self::DEFAULT_SCAN_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ScanError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> ScanResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            ScanError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| ScanError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> ScanResult<()> {
        if self.api.base_url.is_empty() {
            return Err(ScanError::Configuration(
                "api.base_url must not be empty".to_string(),
            ));
        }
        if self.api.license_id.is_empty() {
            return Err(ScanError::Configuration(
                "api.license_id must not be empty".to_string(),
            ));
        }
        if self.api.timeout_ms == 0 {
            return Err(ScanError::Configuration(
                "api.timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.capture.target_width == 0 {
            return Err(ScanError::Configuration(
                "capture.target_width must be greater than 0".to_string(),
            ));
        }
        if self.capture.scan_interval_ms == 0 {
            return Err(ScanError::Configuration(
                "capture.scan_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("デフォルト設定は妥当なはず");
        assert_eq!(config.capture.target_width, 320);
        assert_eq!(config.capture.scan_interval_ms, 2000);
        assert_eq!(config.api.timeout_ms, 10_000);
        assert!(config.api.return_document);
    }

    #[test]
    fn test_detect_endpoint_trailing_slash() {
        let mut api = ApiConfig::default();
        api.base_url = "https://example.com/scan/".to_string();
        assert_eq!(
            api.detect_endpoint(),
            "https://example.com/scan/detectDocument.json"
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AppConfig::default();
        config.capture.target_width = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.capture.scan_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.license_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().expect("一時ファイル作成失敗");
        write!(
            file,
            r#"
[api]
base_url = "https://scan.example.com/api"
license_id = "test-license"
timeout_ms = 3000

[capture]
target_width = 640
scan_interval_ms = 500
"#
        )
        .expect("書き込み失敗");

        let config = AppConfig::from_file(file.path()).expect("読み込み失敗");
        config.validate().expect("妥当なはず");
        assert_eq!(config.api.license_id, "test-license");
        assert_eq!(config.api.timeout(), Duration::from_millis(3000));
        // return_documentは省略時true
        assert!(config.api.return_document);
        assert_eq!(config.capture.target_width, 640);
        assert_eq!(config.capture.scan_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_from_file_missing() {
        let result = AppConfig::from_file("does-not-exist.toml");
        assert!(matches!(result, Err(ScanError::Configuration(_))));
    }

    #[test]
    fn test_write_default_roundtrip() {
        let dir = tempfile::tempdir().expect("一時ディレクトリ作成失敗");
        let path = dir.path().join("config.toml");

        AppConfig::write_default(&path).expect("書き出し失敗");
        let config = AppConfig::from_file(&path).expect("読み込み失敗");
        assert_eq!(config.api.base_url, ApiConfig::DEFAULT_BASE_URL);
    }
}
