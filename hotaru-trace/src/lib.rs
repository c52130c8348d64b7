//! Hotaru トレース機能
//!
//! このクレートは、実行中のフレームからのスナップショット抽出、
//! ウォッチ指定の解決、および実行1回分を計装して走らせる
//! トレースドライバを提供します。
//! ライブ再生・記録再生の両モード（hotaru-core）はこの上に載ります。

pub mod driver;
pub mod snapshot;
pub mod watch;

pub use driver::TraceDriver;
pub use snapshot::{extract, CellSet, Snapshot};
pub use watch::{IndexRef, Watch, WatchParser};

/// トレース機能の結果型
pub type Result<T> = anyhow::Result<T>;
