//! 統計情報管理モジュール
//!
//! 送信回数、レスポンス適用/破棄数、往復レイテンシ、検出までの所要時間を収集・出力します。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// パーセンタイル統計値
#[derive(Debug, Clone)]
pub struct PercentileStats {
    pub p50: Duration,
    pub p95: Duration,
    pub count: usize,
}

/// スキャンセッションの統計コレクター
#[derive(Debug)]
pub struct ScanStats {
    /// 発行した送信の総数
    dispatched: u64,
    /// エラーとして適用されたレスポンス数
    applied_errors: u64,
    /// 検出成功後に破棄されたレスポンス数
    discarded: u64,
    /// 送信往復時間（最大サンプル数まで保持）
    round_trips: VecDeque<Duration>,
    /// セッション開始時刻
    started_at: Instant,
    /// 検出成功までの所要時間
    time_to_detection: Option<Duration>,
}

impl ScanStats {
    /// 最大サンプル保持数（パーセンタイル計算用）
    const MAX_ROUND_TRIP_SAMPLES: usize = 1000;

    /// 新しいScanStatsを作成
    pub fn new() -> Self {
        Self {
            dispatched: 0,
            applied_errors: 0,
            discarded: 0,
            round_trips: VecDeque::new(),
            started_at: Instant::now(),
            time_to_detection: None,
        }
    }

    /// セッション開始時刻をリセット（新しいプレビュー開始時）
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 送信の発行を記録
    pub fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    /// 送信の往復時間を記録
    pub fn record_round_trip(&mut self, duration: Duration) {
        self.round_trips.push_back(duration);
        if self.round_trips.len() > Self::MAX_ROUND_TRIP_SAMPLES {
            self.round_trips.pop_front();
        }
    }

    /// エラーレスポンスの適用を記録
    pub fn record_error(&mut self) {
        self.applied_errors += 1;
    }

    /// 検出成功の適用を記録
    pub fn record_detection(&mut self) {
        if self.time_to_detection.is_none() {
            self.time_to_detection = Some(self.started_at.elapsed());
        }
    }

    /// 破棄されたレスポンスを記録
    pub fn record_discarded(&mut self) {
        self.discarded += 1;
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn applied_errors(&self) -> u64 {
        self.applied_errors
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn time_to_detection(&self) -> Option<Duration> {
        self.time_to_detection
    }

    /// 往復時間のパーセンタイル統計を計算
    ///
    /// # Returns
    /// データがない場合は None
    pub fn round_trip_percentiles(&self) -> Option<PercentileStats> {
        if self.round_trips.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = self.round_trips.iter().copied().collect();
        sorted.sort();

        let count = sorted.len();
        let p50 = sorted[count * 50 / 100];
        let p95 = sorted[count * 95 / 100];

        Some(PercentileStats { p50, p95, count })
    }

    /// 統計レポートをログに出力
    pub fn report(&self) {
        tracing::info!("=== Scan Statistics ===");
        tracing::info!(
            "Submissions: dispatched={}, errors={}, discarded={}",
            self.dispatched,
            self.applied_errors,
            self.discarded
        );

        if let Some(stats) = self.round_trip_percentiles() {
            tracing::info!(
                "Round trip: p50={:.2}ms, p95={:.2}ms (n={})",
                stats.p50.as_secs_f64() * 1000.0,
                stats.p95.as_secs_f64() * 1000.0,
                stats.count
            );
        }

        match self.time_to_detection {
            Some(elapsed) => {
                tracing::info!("Time to detection: {:.2}s", elapsed.as_secs_f64())
            }
            None => tracing::info!("Time to detection: not detected"),
        }
        tracing::info!("=======================");
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = ScanStats::new();

        stats.record_dispatch();
        stats.record_dispatch();
        stats.record_dispatch();
        stats.record_error();
        stats.record_discarded();

        assert_eq!(stats.dispatched(), 3);
        assert_eq!(stats.applied_errors(), 1);
        assert_eq!(stats.discarded(), 1);
    }

    #[test]
    fn test_round_trip_percentiles() {
        let mut stats = ScanStats::new();

        // 100サンプルの往復時間を記録
        for i in 0..100 {
            stats.record_round_trip(Duration::from_millis(i));
        }

        let percentile = stats.round_trip_percentiles().unwrap();
        assert_eq!(percentile.count, 100);
        assert!(percentile.p50.as_millis() >= 45 && percentile.p50.as_millis() <= 55);
        assert!(percentile.p95.as_millis() >= 90 && percentile.p95.as_millis() <= 99);
    }

    #[test]
    fn test_empty_percentiles() {
        let stats = ScanStats::new();
        assert!(stats.round_trip_percentiles().is_none());
    }

    #[test]
    fn test_time_to_detection_recorded_once() {
        let mut stats = ScanStats::new();
        assert!(stats.time_to_detection().is_none());

        stats.record_detection();
        let first = stats.time_to_detection();
        assert!(first.is_some());

        std::thread::sleep(Duration::from_millis(10));
        stats.record_detection();
        // 初回の値が保持される
        assert_eq!(stats.time_to_detection(), first);
    }

    #[test]
    fn test_reset() {
        let mut stats = ScanStats::new();
        stats.record_dispatch();
        stats.record_detection();

        stats.reset();
        assert_eq!(stats.dispatched(), 0);
        assert!(stats.time_to_detection().is_none());
    }
}
