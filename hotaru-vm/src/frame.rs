//! 実行フレーム
//!
//! 関数呼び出しごとのローカル変数表。行フックはこのフレームへの
//! 参照を受け取り、追跡対象の構造やウォッチ変数を名前で引けます。

use crate::value::Value;
use std::collections::HashMap;

/// 関数呼び出し1回分のローカルスコープ
#[derive(Debug, Clone, Default)]
pub struct Frame {
    locals: HashMap<String, Value>,
}

impl Frame {
    /// 空のフレームを作成する
    pub fn new() -> Self {
        Self {
            locals: HashMap::new(),
        }
    }

    /// 変数の値を取得する
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// 変数の値を可変参照で取得する
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.locals.get_mut(name)
    }

    /// 変数を束縛する（既存なら上書き）
    pub fn set(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// 変数が存在するか確認する
    pub fn contains(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    /// 束縛されている変数の数を取得する
    pub fn len(&self) -> usize {
        self.locals.len()
    }

    /// フレームが空か確認する
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}
