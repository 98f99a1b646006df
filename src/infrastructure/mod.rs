//! Infrastructure層: 外部技術の統合
//!
//! Domain層のtraitを実装し、外部ライブラリ（reqwest/image）と接続する。

pub mod http_detection;
pub mod log_observer;
pub mod mock_detection;
pub mod mock_source;
pub mod png_raster;
