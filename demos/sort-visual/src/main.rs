//! バブルソートのトレースをダンプするサンプルプログラム
//! hotaruエンジンの記録再生モードの最小の利用例です。
//! 全フレームを一括で生成し、比較対象のセルをマークして出力します。

use anyhow::Result;
use hotaru_core::{ReplayTracer, TraceConfig, Value, WatchParser};
use std::sync::Arc;
use std::time::Duration;

/// 可視化対象のアルゴリズム
const BUBBLE_SORT: &str = "\
fn bubble_sort(a) {
    let n = len(a);
    let i = 0;
    while i < n - 1 {
        let j = 0;
        while j < n - i - 1 {
            if a[j] > a[j + 1] {
                let t = a[j];
                a[j] = a[j + 1];
                a[j + 1] = t;
            }
            j = j + 1;
        }
        i = i + 1;
    }
}
";

fn main() -> Result<()> {
    println!("=== Hotaru Sort Visualization Example ===");
    println!("Recording a bubble sort trace of [5, 2, 4, 1, 3]");
    println!();

    let parser = WatchParser::new()?;
    let config = TraceConfig {
        source: BUBBLE_SORT.to_string(),
        entry: "bubble_sort".to_string(),
        args: vec![Value::Array(vec![
            Value::Int(5),
            Value::Int(2),
            Value::Int(4),
            Value::Int(1),
            Value::Int(3),
        ])],
        tracked: "a".to_string(),
        // 比較中のセル j と外側ループの進行位置 i を観測する
        watches: vec![parser.parse("j")?, parser.parse("i")?],
        interval: Duration::ZERO,
    };

    // 生成パスは構築時に同期で完走する
    let tracer = ReplayTracer::new(config, Arc::new(|| {}))?;
    println!("Recorded {} frame(s)", tracer.frame_count());
    println!();

    for index in 0..tracer.frame_count() {
        if let Some(frame) = tracer.frame(index) {
            let cells: Vec<String> = frame
                .structure
                .iter()
                .enumerate()
                .map(|(row, value)| {
                    if frame.highlights.contains(&(row, 0)) {
                        format!("*{}*", value)
                    } else {
                        value.to_string()
                    }
                })
                .collect();
            println!(
                "{:>4}: line {:>2} | [{}]",
                index,
                frame.lines[0],
                cells.join(", ")
            );
        }
    }

    println!();
    println!("Expected final order: [1, 2, 3, 4, 5]");
    Ok(())
}
