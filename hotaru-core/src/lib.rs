//! Hotaru トレースエンジンのコア機能
//!
//! このクレートは、トレースエンジンの2つの消費モードを提供します。
//! ライブモード（ペーシング付きの逐次ストリーム、協調的キャンセル可能）と
//! 記録再生モード（構築時に全フレームをバッファし、カーソルで自由に
//! 行き来できるタイムライン）です。
//! 描画と永続化は外部の可視化レイヤの責務であり、このクレートは
//! 更新通知の発行と現在状態の公開のみを行います。

pub mod command;
pub mod config;
pub mod live;
pub mod replay;
pub mod state;

pub use command::Command;
pub use config::{TraceConfig, TraceError};
pub use live::LiveTracer;
pub use replay::ReplayTracer;
pub use state::{UpdateFn, ViewState};

// 他のクレートから使用するために再エクスポート
pub use hotaru_trace::{CellSet, IndexRef, Snapshot, Watch, WatchParser};
pub use hotaru_vm::{eval_const_expr, RunState, RuntimeError, Value};

/// トレースエンジンの結果型
pub type Result<T> = anyhow::Result<T>;
