//! 実行時の値
//!
//! 値はすべて所有型のコンテナで表現します。`clone` は常に深いコピーに
//! なるため、スナップショットが実行中の配列とメモリを共有することは
//! 構造上ありえません。

use crate::error::RuntimeError;
use std::fmt;

/// ミニ言語の値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 整数
    Int(i64),
    /// 真偽値
    Bool(bool),
    /// 配列（入れ子で2次元配列を表す）
    Array(Vec<Value>),
    /// 値なし（returnしない関数の戻り値）
    Unit,
}

impl Value {
    /// 型名を取得する（エラーメッセージ用）
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Unit => "unit",
        }
    }

    /// 整数として取り出す
    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(RuntimeError::TypeMismatch {
                expected: "int",
                got: other.type_name(),
            }),
        }
    }

    /// 真偽値として取り出す
    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::TypeMismatch {
                expected: "bool",
                got: other.type_name(),
            }),
        }
    }

    /// 配列として取り出す
    pub fn as_array(&self) -> Result<&Vec<Value>, RuntimeError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(RuntimeError::TypeMismatch {
                expected: "array",
                got: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Unit => write!(f, "()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(
            Value::Array(vec![
                Value::Int(1),
                Value::Array(vec![Value::Int(2), Value::Int(3)]),
            ])
            .to_string(),
            "[1, [2, 3]]"
        );
    }

    #[test]
    fn test_as_int_type_mismatch() {
        assert_eq!(Value::Int(1).as_int().unwrap(), 1);
        assert_eq!(
            Value::Bool(true).as_int(),
            Err(RuntimeError::TypeMismatch {
                expected: "int",
                got: "bool",
            })
        );
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Value::Array(vec![Value::Array(vec![Value::Int(1)])]);
        let mut copied = original.clone();
        if let Value::Array(rows) = &mut copied {
            if let Value::Array(row) = &mut rows[0] {
                row[0] = Value::Int(99);
            }
        }
        // コピー側の変更は元に影響しない
        assert_eq!(
            original,
            Value::Array(vec![Value::Array(vec![Value::Int(1)])])
        );
    }
}
