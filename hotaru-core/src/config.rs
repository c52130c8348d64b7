//! トレース構成

use hotaru_trace::Watch;
use hotaru_vm::{CompileError, RuntimeError, Value};
use std::time::Duration;
use thiserror::Error;

/// 両モード共通の構築時入力
///
/// 呼び出し側は同一の構成でどちらのモードも構築できます。
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// プログラムのソーステキスト
    pub source: String,
    /// エントリ関数名
    pub entry: String,
    /// エントリ関数へ渡す引数（順序あり）
    pub args: Vec<Value>,
    /// 追跡対象の変数名
    pub tracked: String,
    /// ウォッチ指定（順序は意味を持たない。重複は集合化で吸収される）
    pub watches: Vec<Watch>,
    /// スナップショット発行後の待機時間
    ///
    /// `Duration` のため負値は型として存在しない。0は「ペーシングなし」。
    pub interval: Duration,
}

/// モード構築時のエラー
///
/// ユーザープログラム自身の障害（生成パス中の `RuntimeError`）は
/// 変換せずそのまま持ち上げます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// プログラムユニットの構築に失敗した
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// ユーザープログラムが実行中に障害を起こした
    #[error(transparent)]
    Program(#[from] RuntimeError),
}
