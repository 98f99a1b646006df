/// モックフレームソースアダプタ
///
/// テスト・開発用のライブフィードモック実装。
/// 合成グラデーションフレームを生成する。実カメラ統合の代替。

use crate::domain::{Frame, FrameSourcePort, ScanError, ScanResult};

/// モックフレームソース
pub struct MockFrameSource {
    width: u32,
    height: u32,
    deny: bool,
    streaming: bool,
    frame_counter: u64,
}

impl MockFrameSource {
    /// 指定解像度のモックソースを作成
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            deny: false,
            streaming: false,
            frame_counter: 0,
        }
    }

    /// 取得が常に拒否されるモックソースを作成（権限拒否の再現）
    pub fn denied() -> Self {
        Self {
            width: 0,
            height: 0,
            deny: true,
            streaming: false,
            frame_counter: 0,
        }
    }
}

impl FrameSourcePort for MockFrameSource {
    fn acquire_live_feed(&mut self) -> ScanResult<()> {
        if self.deny {
            return Err(ScanError::Source(
                "camera permission denied (mock)".to_string(),
            ));
        }
        self.streaming = true;
        tracing::debug!("MockFrameSource: live feed started ({}x{})", self.width, self.height);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.streaming
    }

    fn current_frame(&mut self) -> ScanResult<Frame> {
        if !self.streaming {
            return Err(ScanError::Source("live feed not started".to_string()));
        }

        // フレームごとに変化するグラデーションパターン（RGBA）
        let shift = (self.frame_counter % 256) as u8;
        self.frame_counter += 1;

        let mut data = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x % 256) as u8).wrapping_add(shift));
                data.push((y % 256) as u8);
                data.push(shift);
                data.push(255);
            }
        }

        Ok(Frame::new(data, self.width, self.height))
    }
}
