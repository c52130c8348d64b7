//! プログラムユニット
//!
//! ソーステキストとエントリ関数名の組を、構築時に一度だけ
//! コンパイル（パース＋エントリ検証）して保持します。
//! 再実行は同じユニットを再解釈するだけで、再コンパイルは行いません。

use crate::error::{CompileError, RuntimeError};
use crate::frame::Frame;
use crate::interp::{Interp, LineHook, RunOutcome, VmStop};
use crate::value::Value;
use hotaru_lang::{parse_expression, parse_program, Program};
use tracing::debug;

/// コンパイル済みプログラムとエントリ関数
pub struct ProgramUnit {
    program: Program,
    entry: String,
}

impl ProgramUnit {
    /// ソーステキストをコンパイルしてプログラムユニットを作成する
    ///
    /// エントリ関数が定義されていない場合はエラーになります。
    pub fn compile(source: &str, entry: &str) -> Result<Self, CompileError> {
        let program = parse_program(source)?;
        if program.find_func(entry).is_none() {
            return Err(CompileError::EntryNotFound(entry.to_string()));
        }
        debug!("compiled program unit, entry '{}'", entry);
        Ok(Self {
            program,
            entry: entry.to_string(),
        })
    }

    /// エントリ関数名を取得する
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// エントリ関数を実行する
    ///
    /// 行フックは実行中の各文の直前に呼ばれ、`Halt` を返すと
    /// その行境界で実行を打ち切ります。ユーザープログラムの障害は
    /// そのまま `RuntimeError` として伝播します。
    pub fn run(
        &self,
        args: &[Value],
        hook: &mut dyn LineHook,
    ) -> Result<RunOutcome, RuntimeError> {
        let mut interp = Interp::new(&self.program, hook);
        match interp.call(&self.entry, args.to_vec()) {
            Ok(_) => Ok(RunOutcome::Completed),
            Err(VmStop::Halt) => Ok(RunOutcome::Halted),
            Err(VmStop::Fault(e)) => Err(e),
        }
    }

    /// エントリ関数を実行して戻り値を取得する
    ///
    /// フックに打ち切られた場合は `Value::Unit` を返します。
    pub fn run_for_value(
        &self,
        args: &[Value],
        hook: &mut dyn LineHook,
    ) -> Result<Value, RuntimeError> {
        let mut interp = Interp::new(&self.program, hook);
        match interp.call(&self.entry, args.to_vec()) {
            Ok(value) => Ok(value),
            Err(VmStop::Halt) => Ok(Value::Unit),
            Err(VmStop::Fault(e)) => Err(e),
        }
    }
}

/// 定数式を評価して値を得る
///
/// CLI引数（呼び出し引数の `[3, 1, 2]` 等）の解釈に使用します。
/// 変数参照や関数呼び出しを含む式はエラーになります。
pub fn eval_const_expr(source: &str) -> anyhow::Result<Value> {
    struct NullHook;
    impl LineHook for NullHook {
        fn on_line(&mut self, _line: u32, _frame: &Frame) -> crate::interp::HookFlow {
            crate::interp::HookFlow::Continue
        }
    }

    let expr = parse_expression(source)?;
    let program = Program { funcs: Vec::new() };
    let mut hook = NullHook;
    let mut interp = Interp::new(&program, &mut hook);
    let frame = Frame::new();
    match interp.eval(&expr, &frame) {
        Ok(value) => Ok(value),
        Err(VmStop::Fault(e)) => Err(e.into()),
        Err(VmStop::Halt) => unreachable!("NullHook never halts"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_missing_entry() {
        let result = ProgramUnit::compile("fn g() {}", "f");
        assert!(matches!(result, Err(CompileError::EntryNotFound(name)) if name == "f"));
    }

    #[test]
    fn test_compile_parse_error() {
        let result = ProgramUnit::compile("fn f( {}", "f");
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_eval_const_expr() {
        assert_eq!(eval_const_expr("42").unwrap(), Value::Int(42));
        assert_eq!(
            eval_const_expr("[1, 2]").unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(eval_const_expr("-(2 + 3)").unwrap(), Value::Int(-5));
        // 変数参照は定数式では評価できない
        assert!(eval_const_expr("x").is_err());
    }
}
