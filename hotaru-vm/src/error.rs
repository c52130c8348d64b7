//! 実行時エラー
//!
//! 実行時エラーはユーザープログラム自身の障害であり、エンジンは
//! 捕捉も変換もせず、そのまま呼び出し側へ伝播させます。

use hotaru_lang::ParseError;
use thiserror::Error;

/// ユーザープログラムの実行時エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// 未定義の変数を参照した
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// 未定義の関数を呼び出した
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// 引数の数が一致しない
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// 配列の範囲外アクセス
    #[error("index {index} out of bounds (length: {len})")]
    IndexOutOfBounds { index: i64, len: usize },

    /// 型の不一致
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    /// ゼロ除算
    #[error("division by zero")]
    DivisionByZero,

    /// 整数演算のオーバーフロー
    #[error("integer overflow")]
    IntegerOverflow,

    /// 呼び出しの深さ制限超過
    #[error("call depth limit exceeded")]
    CallDepthExceeded,
}

/// プログラムユニット構築時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// 構文解析に失敗した
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// エントリ関数が定義されていない
    #[error("entry function '{0}' not found")]
    EntryNotFound(String),
}
