//! Application Layer
//!
//! キャプチャ・検出の制御ループと統計管理のユースケースを実装します。
//!
//! ## モジュール構成
//! - `controller`: キャプチャ・検出コントローラー（状態機械＋スキャンタイマー＋送信ディスパッチ）
//! - `stats`: 統計情報管理（送信数、往復レイテンシ、検出所要時間）

pub mod controller;
pub mod stats;
