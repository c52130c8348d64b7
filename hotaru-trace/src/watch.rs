//! ウォッチ指定
//!
//! ハイライト対象のセルを指すインデックス式。スカラー参照
//! （1次元インデックス）とペア参照（2次元インデックス）があり、
//! それぞれリテラル整数またはスコープ内の変数名で表します。

use crate::Result;
use regex::Regex;

/// インデックス参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRef {
    /// リテラル整数
    Literal(i64),
    /// スコープ内の変数名
    Name(String),
}

/// ウォッチ指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Watch {
    /// スカラー参照: `i` / `3`（ハイライトは (値, 0) に正規化される）
    Cell(IndexRef),
    /// ペア参照: `(i, j)`（2次元インデックスとして解釈される）
    Pair(IndexRef, IndexRef),
}

/// ウォッチ指定のテキストパーサー
///
/// CLIや設定から渡される `i` / `3` / `(i, j)` / `i,j` 形式の
/// 文字列をパースします。
pub struct WatchParser {
    /// スカラー参照パターン（変数名またはリテラル整数）
    scalar_pattern: Regex,
    /// ペア参照パターン（括弧は除去済みの `x, y` 形式）
    pair_pattern: Regex,
}

impl WatchParser {
    /// 新しいウォッチパーサーを作成する
    pub fn new() -> Result<Self> {
        let scalar_pattern = Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*|[0-9]+)$")?;
        let pair_pattern = Regex::new(
            r"^([A-Za-z_][A-Za-z0-9_]*|[0-9]+)\s*,\s*([A-Za-z_][A-Za-z0-9_]*|[0-9]+)$",
        )?;
        Ok(Self {
            scalar_pattern,
            pair_pattern,
        })
    }

    /// ウォッチ指定文字列をパースする
    pub fn parse(&self, input: &str) -> Result<Watch> {
        let input = input.trim();

        // 外側の括弧は取り除いてから判定する
        let inner = if input.starts_with('(') && input.ends_with(')') {
            input[1..input.len() - 1].trim()
        } else {
            input
        };

        if let Some(caps) = self.pair_pattern.captures(inner) {
            let x = Self::index_ref(&caps[1]);
            let y = Self::index_ref(&caps[2]);
            Ok(Watch::Pair(x, y))
        } else if self.scalar_pattern.is_match(inner) {
            Ok(Watch::Cell(Self::index_ref(inner)))
        } else {
            Err(anyhow::anyhow!("invalid watch spec '{}'", input))
        }
    }

    fn index_ref(text: &str) -> IndexRef {
        match text.parse::<i64>() {
            Ok(value) => IndexRef::Literal(value),
            Err(_) => IndexRef::Name(text.to_string()),
        }
    }
}
