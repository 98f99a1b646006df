/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// キャプチャから検出レスポンスまで、すべての処理で共有される型。

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::domain::{ScanError, ScanResult};

/// ライブフィードから取得した生フレームデータ（RGBA8、連続メモリ）
#[derive(Debug, Clone)]
pub struct Frame {
    /// フレーム取得時刻
    pub timestamp: Instant,
    /// フレーム画像データ（RGBA形式、width * height * 4 バイト）
    pub data: Vec<u8>,
    /// 画像の幅
    pub width: u32,
    /// 画像の高さ
    pub height: u32,
}

impl Frame {
    /// 新しいフレームを作成
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            timestamp: Instant::now(),
            data,
            width,
            height,
        }
    }

    /// アスペクト比を保存した目標高さを計算
    ///
    /// `target_height = source_height / (source_width / target_width)`
    ///
    /// f64で計算し最近傍へ丸める。割り切れない比率でも決定的な値を返す。
    ///
    /// # Returns
    /// - `Ok(u32)`: 目標高さ（1以上）
    /// - `Err(ScanError::Encode)`: 幅が0の場合
    pub fn scaled_height(&self, target_width: u32) -> ScanResult<u32> {
        scaled_height(self.width, self.height, target_width)
    }
}

/// アスペクト比を保存した目標高さの計算（Frameに依存しない形）
pub fn scaled_height(source_width: u32, source_height: u32, target_width: u32) -> ScanResult<u32> {
    if source_width == 0 || target_width == 0 {
        return Err(ScanError::Encode(format!(
            "invalid widths: source={}, target={}",
            source_width, target_width
        )));
    }
    let ratio = source_width as f64 / target_width as f64;
    let height = (source_height as f64 / ratio).round() as u32;
    // 高さ0の画像はエンコードできないため最低1ピクセルを保証
    Ok(height.max(1))
}

/// エンコード済み静止画（PNG）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// エンコード済みバイト列
    pub data: Vec<u8>,
    /// 画像の幅
    pub width: u32,
    /// 画像の高さ
    pub height: u32,
}

/// 検出APIのレスポンスコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseCode {
    /// 検出成功
    Ok,
    /// 検出失敗（整形式レスポンス）
    Error,
}

/// 検出APIの構造化結果
///
/// `document` は切り出し済みドキュメント画像のバイト列（base64デコード済み）。
/// code == Ok かつ document なしは正当なレスポンス（成功として扱う）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutcome {
    /// レスポンスコード
    pub code: ResponseCode,
    /// 切り出し済みドキュメント画像（存在する場合）
    pub document: Option<Vec<u8>>,
}

impl DetectionOutcome {
    /// 成功レスポンスを作成
    pub fn ok(document: Option<Vec<u8>>) -> Self {
        Self {
            code: ResponseCode::Ok,
            document,
        }
    }

    /// 失敗レスポンスを作成
    pub fn error() -> Self {
        Self {
            code: ResponseCode::Error,
            document: None,
        }
    }

    /// 検出成功かどうか
    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }
}
