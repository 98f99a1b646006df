/// PNGラスタライザアダプタ
///
/// RGBAフレームをアスペクト比を保存した目標幅にリサイズし、
/// PNGへエンコードする。imageクレート使用。

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::domain::{EncodedImage, Frame, RasterizerPort, ScanError, ScanResult};

/// PNGラスタライザ
pub struct PngRasterizer;

impl PngRasterizer {
    /// 新しいラスタライザを作成
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterizerPort for PngRasterizer {
    fn capture(&self, frame: &Frame, target_width: u32) -> ScanResult<EncodedImage> {
        let target_height = frame.scaled_height(target_width)?;

        let expected_len = frame.width as usize * frame.height as usize * 4;
        if frame.data.len() != expected_len {
            return Err(ScanError::Encode(format!(
                "frame buffer size mismatch: expected {} bytes, got {}",
                expected_len,
                frame.data.len()
            )));
        }

        let source = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| ScanError::Encode("frame buffer rejected by decoder".to_string()))?;

        let resized = imageops::resize(&source, target_width, target_height, FilterType::Triangle);

        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                resized.as_raw(),
                target_width,
                target_height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| ScanError::Encode(format!("PNG encode failed: {}", e)))?;

        Ok(EncodedImage {
            data: buffer,
            width: target_width,
            height: target_height,
        })
    }
}
