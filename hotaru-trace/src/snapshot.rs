//! スナップショット抽出
//!
//! 実行中のフレームから、追跡対象構造のコピーと解決済みハイライト
//! 集合を取り出します。状態を持たない純粋な関数です。

use crate::watch::{IndexRef, Watch};
use hotaru_vm::{Frame, Value};
use std::collections::HashSet;

/// ハイライト対象セルの集合（(行, 列) のペア）
pub type CellSet = HashSet<(usize, usize)>;

/// 1行分の不変スナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// 直前に実行された行番号
    ///
    /// 現状は常に1要素。複数行ハイライトへの拡張余地のため列で保持します。
    pub lines: Vec<u32>,
    /// 追跡対象構造の深いコピー
    ///
    /// 実行側の配列はこの後も変化し続けるため、コピーは必須です。
    pub structure: Vec<Value>,
    /// ハイライト対象セルの集合（スカラーウォッチは col=0 に正規化）
    pub highlights: CellSet,
}

/// 現在のフレームからスナップショットを抽出する
///
/// 追跡対象がフレームに存在しない（または配列でない）場合は `None` を
/// 返します。これが「まだ対象のコード領域に達していない」と
/// 「現在その中にいる」の区別になります。
///
/// 各ウォッチ指定は独立に解決され、解決できないものはそのフレームの
/// ハイライトから黙って除外されます。エラーにはなりません。
pub fn extract(line: u32, frame: &Frame, tracked: &str, watches: &[Watch]) -> Option<Snapshot> {
    let arr = match frame.get(tracked) {
        Some(Value::Array(items)) => items,
        _ => return None,
    };

    let mut highlights = CellSet::new();
    for watch in watches {
        match watch {
            Watch::Cell(r) => {
                if let Some(row) = resolve(r, frame, arr.len()) {
                    highlights.insert((row, 0));
                }
            }
            Watch::Pair(x, y) => {
                // 両方解決できた場合のみ追加する（部分的なペアは捨てる）
                let row = match resolve(x, frame, arr.len()) {
                    Some(row) => row,
                    None => continue,
                };
                let row_items = match &arr[row] {
                    Value::Array(items) => items,
                    _ => continue,
                };
                let col = match resolve(y, frame, row_items.len()) {
                    Some(col) => col,
                    None => continue,
                };
                highlights.insert((row, col));
            }
        }
    }

    Some(Snapshot {
        lines: vec![line],
        structure: arr.clone(),
        highlights,
    })
}

/// インデックス参照を上限 `len - 1` に対して解決する
///
/// 名前参照はスコープに存在し、かつ整数の場合のみ解決します。
/// リテラルも名前も同じ範囲検査を受け、範囲外なら解決失敗です。
fn resolve(r: &IndexRef, frame: &Frame, len: usize) -> Option<usize> {
    let value = match r {
        IndexRef::Literal(v) => *v,
        IndexRef::Name(name) => match frame.get(name) {
            Some(Value::Int(v)) => *v,
            _ => return None,
        },
    };
    if value >= 0 && (value as usize) < len {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(entries: &[(&str, Value)]) -> Frame {
        let mut frame = Frame::new();
        for (name, value) in entries {
            frame.set(name, value.clone());
        }
        frame
    }

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|&v| Value::Int(v)).collect())
    }

    #[test]
    fn test_extract_none_when_tracked_absent() {
        let frame = frame_with(&[("i", Value::Int(0))]);
        assert_eq!(extract(1, &frame, "a", &[]), None);
    }

    #[test]
    fn test_extract_none_when_tracked_not_array() {
        let frame = frame_with(&[("a", Value::Int(7))]);
        assert_eq!(extract(1, &frame, "a", &[]), None);
    }

    #[test]
    fn test_scalar_watch_normalizes_to_col_zero() {
        let frame = frame_with(&[("a", ints(&[10, 20, 30])), ("i", Value::Int(2))]);
        let watches = vec![Watch::Cell(IndexRef::Name("i".to_string()))];
        let snap = extract(5, &frame, "a", &watches).unwrap();
        assert_eq!(snap.lines, vec![5]);
        assert_eq!(snap.structure, vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
        assert_eq!(snap.highlights, CellSet::from([(2, 0)]));
    }

    #[test]
    fn test_unresolvable_watches_are_dropped() {
        let frame = frame_with(&[("a", ints(&[1, 2])), ("i", Value::Int(5))]);
        let watches = vec![
            // 範囲外の名前参照
            Watch::Cell(IndexRef::Name("i".to_string())),
            // 未定義の名前参照
            Watch::Cell(IndexRef::Name("j".to_string())),
            // 範囲外のリテラル
            Watch::Cell(IndexRef::Literal(9)),
            // 負のリテラル
            Watch::Cell(IndexRef::Literal(-1)),
        ];
        let snap = extract(1, &frame, "a", &watches).unwrap();
        assert!(snap.highlights.is_empty());
    }

    #[test]
    fn test_non_integer_watch_is_dropped() {
        let frame = frame_with(&[("a", ints(&[1, 2])), ("i", Value::Bool(true))]);
        let watches = vec![Watch::Cell(IndexRef::Name("i".to_string()))];
        let snap = extract(1, &frame, "a", &watches).unwrap();
        assert!(snap.highlights.is_empty());
    }

    #[test]
    fn test_pair_watch_resolves_against_selected_row() {
        let grid = Value::Array(vec![ints(&[1, 2, 3]), ints(&[4, 5])]);
        let frame = frame_with(&[
            ("g", grid),
            ("i", Value::Int(1)),
            ("j", Value::Int(1)),
        ]);
        let watches = vec![Watch::Pair(
            IndexRef::Name("i".to_string()),
            IndexRef::Name("j".to_string()),
        )];
        let snap = extract(1, &frame, "g", &watches).unwrap();
        assert_eq!(snap.highlights, CellSet::from([(1, 1)]));
    }

    #[test]
    fn test_partial_pair_is_dropped_whole() {
        // j=2 は2行目（長さ2）の範囲外
        let grid = Value::Array(vec![ints(&[1, 2, 3]), ints(&[4, 5])]);
        let frame = frame_with(&[
            ("g", grid),
            ("i", Value::Int(1)),
            ("j", Value::Int(2)),
        ]);
        let watches = vec![Watch::Pair(
            IndexRef::Name("i".to_string()),
            IndexRef::Name("j".to_string()),
        )];
        let snap = extract(1, &frame, "g", &watches).unwrap();
        assert!(snap.highlights.is_empty());
    }

    #[test]
    fn test_pair_on_non_array_row_is_dropped() {
        // 1次元配列の行は配列でないため、ペアは解決されない
        let frame = frame_with(&[("a", ints(&[1, 2, 3])), ("i", Value::Int(0))]);
        let watches = vec![Watch::Pair(
            IndexRef::Name("i".to_string()),
            IndexRef::Literal(0),
        )];
        let snap = extract(1, &frame, "a", &watches).unwrap();
        assert!(snap.highlights.is_empty());
    }

    #[test]
    fn test_duplicate_watches_dedupe() {
        let frame = frame_with(&[("a", ints(&[1, 2])), ("i", Value::Int(0))]);
        let watches = vec![
            Watch::Cell(IndexRef::Name("i".to_string())),
            Watch::Cell(IndexRef::Name("i".to_string())),
            Watch::Cell(IndexRef::Literal(0)),
        ];
        let snap = extract(1, &frame, "a", &watches).unwrap();
        assert_eq!(snap.highlights, CellSet::from([(0, 0)]));
    }

    #[test]
    fn test_structure_is_independent_copy() {
        let mut frame = frame_with(&[("a", ints(&[1, 2]))]);
        let snap = extract(1, &frame, "a", &[]).unwrap();

        // 抽出後にライブ側を変更してもスナップショットは変わらない
        if let Some(Value::Array(items)) = frame.get_mut("a") {
            items[0] = Value::Int(99);
        }
        assert_eq!(snap.structure, vec![Value::Int(1), Value::Int(2)]);
    }
}
