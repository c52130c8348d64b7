//! 消費者から見える観測可能状態
//!
//! 更新通知はペイロードを持ちません。通知を受けた消費者は
//! モードのアクセサを通じて現在状態を読み直します。

use hotaru_trace::{CellSet, Snapshot};
use hotaru_vm::{RuntimeError, Value};
use std::sync::Arc;

/// 更新通知コールバック
///
/// ワーカースレッドから呼ばれるため `Send + Sync` を要求します。
/// UIコンテキストへのマーシャリングは消費者側の責務です。
pub type UpdateFn = Arc<dyn Fn() + Send + Sync>;

/// 現在の観測可能状態
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// 現在の行番号列（完了後は空）
    pub lines: Vec<u32>,
    /// 追跡対象構造の最新コピー
    pub structure: Vec<Value>,
    /// 現在のハイライト集合
    pub highlights: CellSet,
    /// 実行中に発生したユーザープログラムの障害
    pub fault: Option<RuntimeError>,
}

impl ViewState {
    /// スナップショットの内容で状態を置き換える
    pub(crate) fn apply(&mut self, snapshot: &Snapshot) {
        self.lines = snapshot.lines.clone();
        self.structure = snapshot.structure.clone();
        self.highlights = snapshot.highlights.clone();
    }

    /// 行状態だけをクリアする（完了後はどの行もマークしない）
    pub(crate) fn clear_lines(&mut self) {
        self.lines.clear();
    }
}
