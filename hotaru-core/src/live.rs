//! ライブトレースモード
//!
//! エントリ関数を専用のワーカースレッドで実行し、追跡対象がスコープに
//! ある行ごとにスナップショットを現在状態へ反映して更新通知を発行し、
//! 設定された間隔だけ待機してから実行を再開します。
//! スナップショットはバッファしません。停止は協調的で、ワーカーは
//! 次の行境界で停止要求を観測して抜けます。

use crate::config::{TraceConfig, TraceError};
use crate::state::{UpdateFn, ViewState};
use hotaru_trace::{CellSet, TraceDriver};
use hotaru_vm::{HookFlow, ProgramUnit, RunOutcome, RunState, RuntimeError, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// ライブトレーサ
pub struct LiveTracer {
    driver: Arc<TraceDriver>,
    args: Arc<Vec<Value>>,
    interval: Duration,
    update: UpdateFn,
    /// 実行中フラグ（再入ガード兼停止要求）
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ViewState>>,
    run_state: Arc<Mutex<RunState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LiveTracer {
    /// 構成からライブトレーサを作成する
    ///
    /// プログラムユニットはここで一度だけコンパイルされ、以後の
    /// 再実行で再コンパイルされることはありません。
    pub fn new(config: TraceConfig, update: UpdateFn) -> Result<Self, TraceError> {
        let unit = ProgramUnit::compile(&config.source, &config.entry)?;
        let driver = TraceDriver::new(unit, config.tracked, config.watches);
        Ok(Self {
            driver: Arc::new(driver),
            args: Arc::new(config.args),
            interval: config.interval,
            update,
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ViewState::default())),
            run_state: Arc::new(Mutex::new(RunState::Idle)),
            worker: Mutex::new(None),
        })
    }

    /// 実行を開始する
    ///
    /// すでに実行中の場合は何もしません（再入はエラーではない）。
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.run_state.lock().expect("run_state lock poisoned") = RunState::Running;

        let driver = Arc::clone(&self.driver);
        let args = Arc::clone(&self.args);
        let interval = self.interval;
        let update = Arc::clone(&self.update);
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let run_state = Arc::clone(&self.run_state);

        let handle = thread::spawn(move || {
            let result = driver.run(&args, |snap| {
                // 行境界ごとに停止要求を確認する
                if !running.load(Ordering::SeqCst) {
                    return HookFlow::Halt;
                }
                if let Some(snapshot) = snap {
                    {
                        let mut view = state.lock().expect("state lock poisoned");
                        view.apply(&snapshot);
                    }
                    // ロックを持ったまま通知・待機はしない
                    update();
                    thread::sleep(interval);
                }
                HookFlow::Continue
            });

            match result {
                Ok(RunOutcome::Completed) => {
                    // 完了後はどの行もマークしない
                    {
                        let mut view = state.lock().expect("state lock poisoned");
                        view.clear_lines();
                    }
                    *run_state.lock().expect("run_state lock poisoned") = RunState::Completed;
                    running.store(false, Ordering::SeqCst);
                    update();
                }
                Ok(RunOutcome::Halted) => {
                    // 停止要求後は追加の更新を発行しない
                    *run_state.lock().expect("run_state lock poisoned") = RunState::Halted;
                    running.store(false, Ordering::SeqCst);
                }
                Err(fault) => {
                    // ユーザープログラムの障害。変換せずそのまま公開する
                    {
                        let mut view = state.lock().expect("state lock poisoned");
                        view.clear_lines();
                        view.fault = Some(fault);
                    }
                    *run_state.lock().expect("run_state lock poisoned") = RunState::Halted;
                    running.store(false, Ordering::SeqCst);
                    update();
                }
            }
        });

        *self.worker.lock().expect("worker lock poisoned") = Some(handle);
    }

    /// 停止を要求する
    ///
    /// ワーカーは次の行境界で停止します。実行中の行が即座に中断される
    /// 保証はありません。
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// `stop()` と同じ
    ///
    /// ライブモードは履歴を持たないため、巻き戻すべき過去の状態は
    /// 存在しません。
    pub fn reset(&self) {
        self.stop();
    }

    /// ワーカースレッドの終了を待つ
    pub fn wait(&self) {
        let handle = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// 実行中か確認する
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 実行状態を取得する
    pub fn run_state(&self) -> RunState {
        *self.run_state.lock().expect("run_state lock poisoned")
    }

    /// 現在の行番号列を取得する
    pub fn lines(&self) -> Vec<u32> {
        self.state.lock().expect("state lock poisoned").lines.clone()
    }

    /// 追跡対象構造の最新コピーを取得する
    pub fn structure(&self) -> Vec<Value> {
        self.state
            .lock()
            .expect("state lock poisoned")
            .structure
            .clone()
    }

    /// 現在のハイライト集合を取得する
    pub fn highlights(&self) -> CellSet {
        self.state
            .lock()
            .expect("state lock poisoned")
            .highlights
            .clone()
    }

    /// 実行中に発生した障害を取り出す
    pub fn take_fault(&self) -> Option<RuntimeError> {
        self.state.lock().expect("state lock poisoned").fault.take()
    }
}
