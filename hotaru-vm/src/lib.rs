//! Hotaru 実行基盤
//!
//! このクレートは、ミニ言語のツリーウォーク型インタプリタを提供します。
//! 実行中のフレーム（名前→値の対応表）は明示的な所有データ構造であり、
//! 行フックを通じて文の実行直前に観測できます。
//! トレースエンジンはこのフックを計装点として利用します。

pub mod error;
pub mod frame;
pub mod interp;
pub mod unit;
pub mod value;

pub use error::{CompileError, RuntimeError};
pub use frame::Frame;
pub use interp::{HookFlow, LineHook, RunOutcome, RunState};
pub use unit::{eval_const_expr, ProgramUnit};
pub use value::Value;
