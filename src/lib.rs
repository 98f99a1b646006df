//! docuscan: ドキュメント撮影・検出ワークフロー
//!
//! ライブフィードのプレビュー、静止画キャプチャ、検出APIへの送信を
//! 制御するCapture-and-Detectコントローラ。
//!
//! # アーキテクチャ
//! - **Domain層**: セッション状態機械・型・ポート（trait）定義
//! - **Application層**: コントローラ（ユースケース・並行制御）
//! - **Infrastructure層**: HTTP検出クライアント・PNGラスタライザ・モック
//!
//! このライブラリクレートは、バイナリ（main.rs）と統合テストから
//! 各モジュールへアクセスするために存在する。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod logging;
