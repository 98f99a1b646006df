mod application;
mod domain;
mod infrastructure;
mod logging;

use crate::application::controller::Controller;
use crate::domain::config::AppConfig;
use crate::domain::session::SessionState;
use crate::infrastructure::http_detection::HttpDetectionClient;
use crate::infrastructure::log_observer::LogObserver;
use crate::infrastructure::mock_source::MockFrameSource;
use crate::infrastructure::png_raster::PngRasterizer;
use crate::logging::init_logging;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn main() {
    // ログシステムの初期化（非同期ファイル出力）
    let log_dir = PathBuf::from("logs");
    let _guard = init_logging("info", false, Some(log_dir));
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("docuscan starting...");

    match run() {
        Ok(_) => {
            tracing::info!("docuscan terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
fn run() -> anyhow::Result<()> {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config.toml: {:?}, using defaults", e);
            AppConfig::default()
        }
    };

    // 設定の検証
    config.validate()?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Detection API: endpoint={}, timeout={}ms",
        config.api.detect_endpoint(),
        config.api.timeout_ms
    );
    tracing::info!(
        "Capture: target_width={}px, scan_interval={}ms",
        config.capture.target_width,
        config.capture.scan_interval_ms
    );

    // HTTP検出クライアントの初期化
    tracing::info!("Initializing HTTP detection client...");
    let detection = HttpDetectionClient::new(&config.api)?;

    // モックフレームソースの初期化（実カメラ統合は未実装）
    tracing::info!("Initializing mock frame source...");
    let source = MockFrameSource::new(1280, 720);

    // PNGラスタライザの初期化
    let rasterizer = PngRasterizer::new();

    let mut controller = Controller::new(source, rasterizer, detection, LogObserver, &config);

    // プレビュー開始（ソース拒否ならFailedで終了）
    controller.start_preview();
    if controller.snapshot().state == SessionState::Failed {
        anyhow::bail!(
            "live feed unavailable: {}",
            controller.snapshot().error.unwrap_or_default()
        );
    }

    // スキャンモードで検出成功まで繰り返す（最大60秒）
    tracing::info!("Starting scan mode...");
    controller.start_scan_mode();

    let deadline = Instant::now() + Duration::from_secs(60);
    while !controller.snapshot().is_detected && Instant::now() < deadline {
        controller.pump(Duration::from_millis(100));
    }

    controller.stop_scan_mode();

    // 遅れて到着する送信結果を短時間だけ回収
    controller.pump(Duration::from_millis(500));

    let snapshot = controller.snapshot();
    if snapshot.is_detected {
        let document_bytes = snapshot
            .last_result
            .as_ref()
            .and_then(|r| r.document.as_ref().map(|d| d.len()))
            .unwrap_or(0);
        tracing::info!("Scan finished: document detected ({} bytes)", document_bytes);
    } else {
        tracing::warn!(
            "Scan finished without detection: last_error={:?}",
            snapshot.error
        );
    }

    controller.stats().report();

    Ok(())
}
