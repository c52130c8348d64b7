//! 計装ドライバ
//!
//! プログラムユニットを1回実行し、実行された行ごとにスナップショット
//! 抽出を行ってシンクへ流します。ライブモードではシンクが実行全体を
//! 打ち切れます。記録再生の生成パスでは打ち切りは発生しません。

use crate::snapshot::{extract, Snapshot};
use crate::watch::Watch;
use hotaru_vm::{Frame, HookFlow, ProgramUnit, RunOutcome, RuntimeError, Value};
use tracing::debug;

/// 計装ドライバ
///
/// プログラムユニット、追跡対象名、ウォッチ指定を束ねて保持します。
/// 実行状態は `idle -> running -> (completed | halted)` と遷移し、
/// 終了時の状態が `RunOutcome` として返ります。
pub struct TraceDriver {
    /// 実行対象のプログラムユニット
    unit: ProgramUnit,
    /// 追跡対象の変数名
    tracked: String,
    /// ウォッチ指定（順序は意味を持たない）
    watches: Vec<Watch>,
}

impl TraceDriver {
    /// 新しい計装ドライバを作成する
    pub fn new(unit: ProgramUnit, tracked: impl Into<String>, watches: Vec<Watch>) -> Self {
        Self {
            unit,
            tracked: tracked.into(),
            watches,
        }
    }

    /// エントリ関数を1回実行する
    ///
    /// 実行された行ごとにシンクを1回呼びます。追跡対象がスコープに
    /// あればスナップショット付き、なければ `None` 付きで呼ばれます。
    /// シンクが `Halt` を返すと、その行境界で実行を打ち切ります
    /// （実行中の行の完了は待ちます。先取りの停止はありません）。
    ///
    /// 行フックは実行1回分のスコープに閉じており、正常終了・打ち切り・
    /// 障害のいずれの経路でも実行終了とともに解放されます。
    pub fn run<F>(&self, args: &[Value], mut sink: F) -> Result<RunOutcome, RuntimeError>
    where
        F: FnMut(Option<Snapshot>) -> HookFlow,
    {
        let mut hook = |line: u32, frame: &Frame| {
            sink(extract(line, frame, &self.tracked, &self.watches))
        };
        let outcome = self.unit.run(args, &mut hook)?;
        debug!("trace run finished: {:?}", outcome);
        Ok(outcome)
    }

    /// プログラムユニットを取得する
    pub fn unit(&self) -> &ProgramUnit {
        &self.unit
    }

    /// 追跡対象の変数名を取得する
    pub fn tracked(&self) -> &str {
        &self.tracked
    }
}
