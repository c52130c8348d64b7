//! Hotaru CLI - コマンドラインインターフェース
//!
//! 配列アルゴリズム可視化エンジン hotaru の端末フロントエンド。
//! ライブモードは更新通知を受けるたびに現在状態を読み直して1行ずつ
//! 描画し、記録再生モードはREPLでトレースを行き来します。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hotaru_core::{
    CellSet, Command, LiveTracer, ReplayTracer, TraceConfig, UpdateFn, Value, WatchParser,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Hotaru - Algorithm Visualization Tracer
#[derive(Parser)]
#[command(name = "hotaru")]
#[command(version = "0.1.0")]
#[command(about = "Step-by-step execution tracer for array algorithms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: TraceCommand,
}

#[derive(Subcommand)]
enum TraceCommand {
    /// Run a script live with paced streaming output
    Run {
        /// Path to the algorithm script
        script: String,

        /// Entry function name
        #[arg(short, long, default_value = "main")]
        entry: String,

        /// Call argument as a literal, e.g. --arg "[3, 1, 2]" (repeatable)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,

        /// Name of the tracked array variable
        #[arg(short, long)]
        track: String,

        /// Watch spec, e.g. --watch i or --watch "(i, j)" (repeatable)
        #[arg(short, long = "watch")]
        watches: Vec<String>,

        /// Pacing interval in seconds (may be fractional, must be >= 0)
        #[arg(short, long, default_value_t = 0.5)]
        interval: f64,
    },

    /// Record a full trace, then scrub through it interactively
    Replay {
        /// Path to the algorithm script
        script: String,

        /// Entry function name
        #[arg(short, long, default_value = "main")]
        entry: String,

        /// Call argument as a literal, e.g. --arg "[3, 1, 2]" (repeatable)
        #[arg(short = 'a', long = "arg")]
        args: Vec<String>,

        /// Name of the tracked array variable
        #[arg(short, long)]
        track: String,

        /// Watch spec, e.g. --watch i or --watch "(i, j)" (repeatable)
        #[arg(short, long = "watch")]
        watches: Vec<String>,

        /// Autoplay interval in seconds (may be fractional, must be >= 0)
        #[arg(short, long, default_value_t = 0.5)]
        interval: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        TraceCommand::Run {
            script,
            entry,
            args,
            track,
            watches,
            interval,
        } => {
            let config = build_config(&script, &entry, &args, &track, &watches, interval)?;
            run_live(config)
        }
        TraceCommand::Replay {
            script,
            entry,
            args,
            track,
            watches,
            interval,
        } => {
            let config = build_config(&script, &entry, &args, &track, &watches, interval)?;
            run_replay(config)
        }
    }
}

/// CLI引数からトレース構成を組み立てる
fn build_config(
    script: &str,
    entry: &str,
    args: &[String],
    track: &str,
    watches: &[String],
    interval: f64,
) -> Result<TraceConfig> {
    let source = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script '{}'", script))?;

    if !interval.is_finite() || interval < 0.0 {
        anyhow::bail!("interval must be a finite value >= 0 (got {})", interval);
    }

    // 引数はミニ言語の定数式として解釈する
    let mut call_args = Vec::with_capacity(args.len());
    for arg in args {
        let value = hotaru_core::eval_const_expr(arg)
            .with_context(|| format!("invalid call argument '{}'", arg))?;
        call_args.push(value);
    }

    let parser = WatchParser::new()?;
    let mut watch_specs = Vec::with_capacity(watches.len());
    for watch in watches {
        watch_specs.push(parser.parse(watch)?);
    }

    Ok(TraceConfig {
        source,
        entry: entry.to_string(),
        args: call_args,
        tracked: track.to_string(),
        watches: watch_specs,
        interval: Duration::from_secs_f64(interval),
    })
}

/// ライブモードを実行する
///
/// ワーカーからの更新通知をチャネルで受け、このスレッドで現在状態を
/// 読み直して描画します（通知自体はペイロードを持たない）。
fn run_live(config: TraceConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let update: UpdateFn = Arc::new(move || {
        let _ = tx.send(());
    });

    let tracer = LiveTracer::new(config, update)?;
    tracer.start();

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(()) => {
                print_state(&tracer.lines(), &tracer.structure(), &tracer.highlights());
            }
            Err(RecvTimeoutError::Timeout) => {
                if !tracer.is_running() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracer.wait();

    // 残っている通知を描画してから終わる
    for _ in rx.try_iter() {
        print_state(&tracer.lines(), &tracer.structure(), &tracer.highlights());
    }

    if let Some(fault) = tracer.take_fault() {
        anyhow::bail!("program crashed: {}", fault);
    }
    println!("Run completed");
    Ok(())
}

/// 記録再生モードを実行する
fn run_replay(config: TraceConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let update: UpdateFn = Arc::new(move || {
        let _ = tx.send(());
    });

    let tracer = ReplayTracer::new(config, update)
        .context("trace generation failed")?;
    let tracer = Arc::new(tracer);

    println!("Recorded {} frame(s)", tracer.frame_count());
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    // 更新通知を受けて描画する専用スレッド（自動再生中もREPLを塞がない）
    let render_tracer = Arc::clone(&tracer);
    thread::spawn(move || {
        while rx.recv().is_ok() {
            print_state(
                &render_tracer.lines(),
                &render_tracer.structure(),
                &render_tracer.highlights(),
            );
        }
    });

    let mut rl = DefaultEditor::new()?;
    loop {
        let readline = rl.readline("(hotaru) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                if !handle_command(&tracer, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    tracer.stop();
    Ok(())
}

/// コマンドを処理する。falseを返すとREPLを抜ける
fn handle_command(tracer: &ReplayTracer, line: &str) -> bool {
    match Command::parse(line) {
        Some(Command::Play) => tracer.start(),
        Some(Command::Stop) => tracer.stop(),
        Some(Command::StepForward) => tracer.step_forward(),
        Some(Command::StepBack) => tracer.step_back(),
        Some(Command::Reset) => tracer.reset(),
        Some(Command::Show) => {
            println!(
                "frame {}/{}",
                tracer.cursor() + 1,
                tracer.frame_count()
            );
            print_state(&tracer.lines(), &tracer.structure(), &tracer.highlights());
        }
        Some(Command::Help) => print_help(),
        Some(Command::Quit) => {
            println!("Goodbye!");
            return false;
        }
        None => {
            println!("Unknown command: {}", line);
            println!("Type 'help' for available commands.");
        }
    }
    true
}

/// 現在状態を1フレームぶん描画する
fn print_state(lines: &[u32], structure: &[Value], highlights: &CellSet) {
    match lines.first() {
        Some(line) => println!("line {:>3} | {}", line, format_structure(structure, highlights)),
        None => println!("  (done) | {}", format_structure(structure, highlights)),
    }
}

/// 追跡対象構造をハイライト付きで整形する
///
/// ハイライトされたセルは `*値*` で囲みます。スカラーウォッチの
/// ハイライト (v, 0) は1次元配列のインデックスvを指します。
fn format_structure(structure: &[Value], highlights: &CellSet) -> String {
    let mut out = String::from("[");
    for (row, value) in structure.iter().enumerate() {
        if row > 0 {
            out.push_str(", ");
        }
        match value {
            Value::Array(cells) => {
                out.push('[');
                for (col, cell) in cells.iter().enumerate() {
                    if col > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format_cell(cell, highlights.contains(&(row, col))));
                }
                out.push(']');
            }
            other => out.push_str(&format_cell(other, highlights.contains(&(row, 0)))),
        }
    }
    out.push(']');
    out
}

fn format_cell(value: &Value, highlighted: bool) -> String {
    if highlighted {
        format!("*{}*", value)
    } else {
        value.to_string()
    }
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  play (p)       - Start autoplay (stops at the last frame)");
    println!("  stop           - Stop autoplay");
    println!("  step (s/n)     - Step one frame forward (wraps around)");
    println!("  back (b)       - Step one frame back (wraps around)");
    println!("  reset (r)      - Rewind to the first frame");
    println!("  show           - Print the current frame");
    println!("  help           - Show this help message");
    println!("  quit/exit/q    - Exit");
    println!();
    println!("Examples:");
    println!("  step");
    println!("  play");
    println!("  reset");
}
