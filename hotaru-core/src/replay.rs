//! 記録再生モード
//!
//! 構築時に計装ドライバを1回だけペーシングなしで完走させ、全スナップ
//! ショットを順序付きバッファに記録します。以後の再生操作はすべて
//! バッファとカーソルの上だけで動き、プログラムを再実行しません。
//! バッファは生成パスの後は不変です。

use crate::config::{TraceConfig, TraceError};
use crate::state::{UpdateFn, ViewState};
use hotaru_trace::{CellSet, Snapshot, TraceDriver};
use hotaru_vm::{HookFlow, ProgramUnit, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// 記録再生トレーサ
pub struct ReplayTracer {
    /// 生成パスで記録されたトレース（以後不変）
    frames: Arc<Vec<Snapshot>>,
    /// 現在位置。手動ステップと自動再生はこのロックで直列化される
    cursor: Arc<Mutex<usize>>,
    interval: Duration,
    update: UpdateFn,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ViewState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ReplayTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayTracer")
            .field("frames", &self.frames.len())
            .field("interval", &self.interval)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ReplayTracer {
    /// 構成から記録再生トレーサを作成する
    ///
    /// 生成パスはここで同期的に完走します。ユーザープログラムが
    /// 障害を起こした場合、構築は失敗し障害がそのまま返ります。
    pub fn new(config: TraceConfig, update: UpdateFn) -> Result<Self, TraceError> {
        let unit = ProgramUnit::compile(&config.source, &config.entry)?;
        let driver = TraceDriver::new(unit, config.tracked, config.watches);

        let mut frames = Vec::new();
        driver.run(&config.args, |snap| {
            if let Some(snapshot) = snap {
                frames.push(snapshot);
            }
            HookFlow::Continue
        })?;
        debug!("buffered {} frame(s) for replay", frames.len());

        Ok(Self {
            frames: Arc::new(frames),
            cursor: Arc::new(Mutex::new(0)),
            interval: config.interval,
            update,
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(ViewState::default())),
            worker: Mutex::new(None),
        })
    }

    /// 1フレーム進めて発行する（末尾の次は先頭へ循環する）
    ///
    /// トレースが空の場合は何もしません。
    pub fn step_forward(&self) {
        self.step(1);
    }

    /// 1フレーム戻して発行する（先頭の前は末尾へ循環する）
    ///
    /// トレースが空の場合は何もしません。
    pub fn step_back(&self) {
        self.step(-1);
    }

    fn step(&self, delta: isize) {
        if self.frames.is_empty() {
            return;
        }
        let snapshot = {
            let mut cursor = self.cursor.lock().expect("cursor lock poisoned");
            let len = self.frames.len() as isize;
            *cursor = (*cursor as isize + delta).rem_euclid(len) as usize;
            self.frames[*cursor].clone()
        };
        self.publish(&snapshot);
    }

    /// 自動再生を止め、カーソルを先頭へ戻して先頭フレームを発行する
    pub fn reset(&self) {
        self.running.store(false, Ordering::SeqCst);
        if self.frames.is_empty() {
            return;
        }
        let snapshot = {
            let mut cursor = self.cursor.lock().expect("cursor lock poisoned");
            *cursor = 0;
            self.frames[0].clone()
        };
        self.publish(&snapshot);
    }

    /// 自動再生を開始する
    ///
    /// 専用のワーカースレッドで、1フレーム進めては設定間隔だけ待機する
    /// ことを繰り返します。最終フレームに達すると停止します
    /// （循環はしません）。すでに再生中の場合は何もしません。
    pub fn start(&self) {
        if self.frames.is_empty() {
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let frames = Arc::clone(&self.frames);
        let cursor = Arc::clone(&self.cursor);
        let interval = self.interval;
        let update = Arc::clone(&self.update);
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);

        let handle = thread::spawn(move || {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let snapshot = {
                    let mut cursor = cursor.lock().expect("cursor lock poisoned");
                    if *cursor >= frames.len() - 1 {
                        // 最終フレームで自動停止
                        break;
                    }
                    *cursor = (*cursor + 1) % frames.len();
                    frames[*cursor].clone()
                };
                {
                    let mut view = state.lock().expect("state lock poisoned");
                    view.apply(&snapshot);
                }
                update();
                thread::sleep(interval);
            }
            running.store(false, Ordering::SeqCst);
        });

        *self.worker.lock().expect("worker lock poisoned") = Some(handle);
    }

    /// 自動再生を停止する
    ///
    /// ワーカーは次のイテレーション境界で停止します。
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 自動再生ワーカーの終了を待つ
    pub fn wait(&self) {
        let handle = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn publish(&self, snapshot: &Snapshot) {
        {
            let mut view = self.state.lock().expect("state lock poisoned");
            view.apply(snapshot);
        }
        (self.update)();
    }

    /// バッファされたフレーム数を取得する
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// 現在のカーソル位置を取得する
    pub fn cursor(&self) -> usize {
        *self.cursor.lock().expect("cursor lock poisoned")
    }

    /// 再生中か確認する
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 指定位置のフレームを取得する
    pub fn frame(&self, index: usize) -> Option<&Snapshot> {
        self.frames.get(index)
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotaru_trace::{IndexRef, Watch};
    use hotaru_vm::RuntimeError;
    use std::sync::atomic::AtomicUsize;

    const INCREMENT_ALL: &str = "\
fn f(a) {
    let i = 0;
    while i < len(a) {
        a[i] = a[i] + 1;
        i = i + 1;
    }
}
";

    fn int_array(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|&v| Value::Int(v)).collect())
    }

    fn noop_update() -> UpdateFn {
        Arc::new(|| {})
    }

    fn increment_config() -> TraceConfig {
        TraceConfig {
            source: INCREMENT_ALL.to_string(),
            entry: "f".to_string(),
            args: vec![int_array(&[1, 2, 3])],
            tracked: "a".to_string(),
            watches: vec![Watch::Cell(IndexRef::Name("i".to_string()))],
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_generation_buffers_all_qualifying_lines() {
        let tracer = ReplayTracer::new(increment_config(), noop_update()).unwrap();

        // let + while判定4回 + 本体2文×3周
        assert_eq!(tracer.frame_count(), 11);
        assert_eq!(tracer.cursor(), 0);

        // 2周目の代入直前: a[1]はまだ加算前
        let frame = tracer.frame(6).unwrap();
        assert_eq!(frame.lines, vec![5]);
        assert_eq!(
            frame.structure,
            vec![Value::Int(2), Value::Int(3), Value::Int(3)]
        );
        assert_eq!(frame.highlights, CellSet::from([(1, 0)]));
    }

    #[test]
    fn test_stepping_is_cyclic() {
        let tracer = ReplayTracer::new(increment_config(), noop_update()).unwrap();
        let len = tracer.frame_count();

        tracer.step_forward();
        assert_eq!(tracer.cursor(), 1);

        // len回進めると一周して元に戻る
        for _ in 0..len {
            tracer.step_forward();
        }
        assert_eq!(tracer.cursor(), 1);

        // 先頭から1つ戻ると末尾へ回り込む
        tracer.reset();
        assert_eq!(tracer.cursor(), 0);
        tracer.step_back();
        assert_eq!(tracer.cursor(), len - 1);
    }

    #[test]
    fn test_step_publishes_frame_state() {
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let update: UpdateFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let tracer = ReplayTracer::new(increment_config(), update).unwrap();

        // 生成パスでは更新通知を発行しない
        assert_eq!(updates.load(Ordering::SeqCst), 0);

        tracer.step_forward();
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(tracer.lines(), vec![3]);
        assert_eq!(
            tracer.structure(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_eq!(tracer.highlights(), CellSet::from([(0, 0)]));
    }

    #[test]
    fn test_reset_relocates_cursor_from_any_position() {
        let tracer = ReplayTracer::new(increment_config(), noop_update()).unwrap();
        let len = tracer.frame_count();

        // 末尾フレームまで進める
        for _ in 0..len - 1 {
            tracer.step_forward();
        }
        assert_eq!(tracer.cursor(), len - 1);

        tracer.reset();
        assert_eq!(tracer.cursor(), 0);
        assert_eq!(tracer.lines(), vec![2]);
    }

    #[test]
    fn test_empty_trace_stepping_is_noop() {
        // 追跡対象が一度もスコープに現れないプログラム
        let config = TraceConfig {
            source: "fn f() { let x = 1; }".to_string(),
            entry: "f".to_string(),
            args: Vec::new(),
            tracked: "a".to_string(),
            watches: Vec::new(),
            interval: Duration::ZERO,
        };
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let update: UpdateFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let tracer = ReplayTracer::new(config, update).unwrap();

        assert_eq!(tracer.frame_count(), 0);

        // ゼロ除算や添字パニックを起こさず、状態も変えない
        tracer.step_forward();
        tracer.step_back();
        tracer.reset();
        tracer.start();
        assert_eq!(tracer.cursor(), 0);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert!(tracer.lines().is_empty());
        assert!(!tracer.is_running());
    }

    #[test]
    fn test_generation_fault_fails_construction() {
        let config = TraceConfig {
            source: "fn f(a) { a[9] = 1; }".to_string(),
            entry: "f".to_string(),
            args: vec![int_array(&[1])],
            tracked: "a".to_string(),
            watches: Vec::new(),
            interval: Duration::ZERO,
        };
        let err = ReplayTracer::new(config, noop_update()).unwrap_err();
        assert_eq!(
            err,
            TraceError::Program(RuntimeError::IndexOutOfBounds { index: 9, len: 1 })
        );
    }

    #[test]
    fn test_autoplay_stops_at_last_frame() {
        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        let update: UpdateFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let tracer = ReplayTracer::new(increment_config(), update).unwrap();
        let len = tracer.frame_count();

        tracer.start();
        tracer.wait();

        // 末尾で停止し、循環しない
        assert_eq!(tracer.cursor(), len - 1);
        assert!(!tracer.is_running());
        assert_eq!(updates.load(Ordering::SeqCst), len - 1);

        // 停止後の手動ステップは末尾から先頭へ回り込む
        tracer.step_forward();
        assert_eq!(tracer.cursor(), 0);
    }
}
