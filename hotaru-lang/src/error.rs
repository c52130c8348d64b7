//! 構文解析エラー

use thiserror::Error;

/// 字句解析・構文解析のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// 認識できない文字
    #[error("unexpected character '{ch}' at line {line}")]
    UnexpectedChar { ch: char, line: u32 },

    /// 整数リテラルがi64の範囲を超えた
    #[error("integer literal out of range at line {line}")]
    IntOutOfRange { line: u32 },

    /// 期待と異なるトークン
    #[error("unexpected token {found} at line {line}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        line: u32,
    },

    /// 入力が途中で終わった
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// 代入の左辺が変数でも配列要素でもない
    #[error("invalid assignment target at line {line}")]
    InvalidAssignTarget { line: u32 },
}
