//! ツリーウォーク型インタプリタ
//!
//! 文の実行直前に行フックを発火させます。whileループの先頭行は
//! 条件を再評価するたびに発火し直すため、ループの進行が
//! 1イテレーションずつ観測できます。

use crate::error::RuntimeError;
use crate::frame::Frame;
use crate::value::Value;
use hotaru_lang::{AssignTarget, BinOp, Expr, Program, Stmt, UnaryOp};

/// 呼び出しの深さ制限
const MAX_CALL_DEPTH: usize = 256;

/// 行フックの継続判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFlow {
    /// 実行を継続する
    Continue,
    /// 次の行境界で実行を打ち切る（協調的キャンセル）
    Halt,
}

/// 行フック
///
/// 文の実行直前に、その文の行番号と現在のフレームを受け取ります。
/// フックは実行1回分のスコープに束縛され、実行の終了（正常・打ち切り・
/// 障害のいずれでも）とともに解放されます。
pub trait LineHook {
    fn on_line(&mut self, line: u32, frame: &Frame) -> HookFlow;
}

/// クロージャをそのまま行フックとして使えるようにする
impl<F> LineHook for F
where
    F: FnMut(u32, &Frame) -> HookFlow,
{
    fn on_line(&mut self, line: u32, frame: &Frame) -> HookFlow {
        self(line, frame)
    }
}

/// 実行1回分の終了結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// エントリ関数が正常に復帰した
    Completed,
    /// フックの要求により打ち切られた
    Halted,
}

/// 実行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// 未実行
    Idle,
    /// 実行中
    Running,
    /// 正常終了
    Completed,
    /// 打ち切り
    Halted,
}

/// 実行を中断する内部シグナル
///
/// ユーザープログラムの障害とフックによる打ち切りは、どちらも
/// `?` で呼び出し階層を巻き戻す必要があるためここで合流させます。
pub(crate) enum VmStop {
    Fault(RuntimeError),
    Halt,
}

impl From<RuntimeError> for VmStop {
    fn from(e: RuntimeError) -> Self {
        VmStop::Fault(e)
    }
}

pub(crate) type ExecResult<T> = Result<T, VmStop>;

/// 文の実行結果（returnの伝播用）
enum Flow {
    Normal,
    Return(Value),
}

pub(crate) struct Interp<'a> {
    program: &'a Program,
    hook: &'a mut dyn LineHook,
    depth: usize,
}

impl<'a> Interp<'a> {
    pub(crate) fn new(program: &'a Program, hook: &'a mut dyn LineHook) -> Self {
        Self {
            program,
            hook,
            depth: 0,
        }
    }

    /// 関数を呼び出す
    pub(crate) fn call(&mut self, name: &str, args: Vec<Value>) -> ExecResult<Value> {
        // 組み込み関数
        if name == "len" {
            return self.builtin_len(&args);
        }

        let func = self
            .program
            .find_func(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;

        if args.len() != func.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: func.params.len(),
                got: args.len(),
            }
            .into());
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded.into());
        }
        self.depth += 1;

        // 引数は値渡し（呼び出し先での変更は呼び出し元に影響しない）
        let mut frame = Frame::new();
        for (param, arg) in func.params.iter().zip(args) {
            frame.set(param, arg);
        }

        let result = self.exec_block(&func.body, &mut frame);
        self.depth -= 1;

        Ok(match result? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Unit,
        })
    }

    fn builtin_len(&self, args: &[Value]) -> ExecResult<Value> {
        if args.len() != 1 {
            return Err(RuntimeError::ArityMismatch {
                name: "len".to_string(),
                expected: 1,
                got: args.len(),
            }
            .into());
        }
        let items = args[0].as_array().map_err(VmStop::from)?;
        Ok(Value::Int(items.len() as i64))
    }

    fn line_event(&mut self, line: u32, frame: &Frame) -> ExecResult<()> {
        match self.hook.on_line(line, frame) {
            HookFlow::Continue => Ok(()),
            HookFlow::Halt => Err(VmStop::Halt),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], frame: &mut Frame) -> ExecResult<Flow> {
        for stmt in stmts {
            self.line_event(stmt.line(), frame)?;
            if let Flow::Return(value) = self.exec_stmt(stmt, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> ExecResult<Flow> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval(value, frame)?;
                frame.set(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value, .. } => {
                let value = self.eval(value, frame)?;
                self.assign(target, value, frame)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                if self.eval_bool(cond, frame)? {
                    self.exec_block(then_body, frame)
                } else {
                    self.exec_block(else_body, frame)
                }
            }
            Stmt::While { cond, body, line } => {
                // 初回の条件評価のフックは exec_block が発火済み
                loop {
                    if !self.eval_bool(cond, frame)? {
                        return Ok(Flow::Normal);
                    }
                    if let Flow::Return(value) = self.exec_block(body, frame)? {
                        return Ok(Flow::Return(value));
                    }
                    // ループ先頭へ戻り条件を再評価する
                    self.line_event(*line, frame)?;
                }
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr, frame)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Expr { expr, .. } => {
                self.eval(expr, frame)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn assign(
        &mut self,
        target: &AssignTarget,
        value: Value,
        frame: &mut Frame,
    ) -> ExecResult<()> {
        match target {
            AssignTarget::Name(name) => {
                if !frame.contains(name) {
                    return Err(RuntimeError::UndefinedVariable(name.clone()).into());
                }
                frame.set(name, value);
                Ok(())
            }
            AssignTarget::Index { name, indices } => {
                // インデックスをすべて評価してから可変参照をたどる
                let mut idx_values = Vec::with_capacity(indices.len());
                for index in indices {
                    idx_values.push(self.eval_int(index, frame)?);
                }

                let mut slot: &mut Value = frame
                    .get_mut(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                for &idx in &idx_values {
                    let items = match slot {
                        Value::Array(items) => items,
                        other => {
                            return Err(RuntimeError::TypeMismatch {
                                expected: "array",
                                got: other.type_name(),
                            }
                            .into());
                        }
                    };
                    let len = items.len();
                    if idx < 0 || idx as usize >= len {
                        return Err(RuntimeError::IndexOutOfBounds { index: idx, len }.into());
                    }
                    slot = &mut items[idx as usize];
                }
                *slot = value;
                Ok(())
            }
        }
    }

    pub(crate) fn eval(&mut self, expr: &Expr, frame: &Frame) -> ExecResult<Value> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, frame)?);
                }
                Ok(Value::Array(values))
            }
            Expr::Name(name) => frame
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()).into()),
            Expr::Index { base, index } => {
                let base = self.eval(base, frame)?;
                let idx = self.eval_int(index, frame)?;
                let items = base.as_array().map_err(VmStop::from)?;
                let len = items.len();
                if idx < 0 || idx as usize >= len {
                    return Err(RuntimeError::IndexOutOfBounds { index: idx, len }.into());
                }
                Ok(items[idx as usize].clone())
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let v = self.eval_int(operand, frame)?;
                    let negated = v.checked_neg().ok_or(RuntimeError::IntegerOverflow)?;
                    Ok(Value::Int(negated))
                }
                UnaryOp::Not => {
                    let b = self.eval_bool(operand, frame)?;
                    Ok(Value::Bool(!b))
                }
            },
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, frame),
            Expr::Call { name, args } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, frame)?);
                }
                self.call(name, arg_values)
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        frame: &Frame,
    ) -> ExecResult<Value> {
        match op {
            // 論理演算は短絡評価
            BinOp::And => {
                if !self.eval_bool(lhs, frame)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_bool(rhs, frame)?))
            }
            BinOp::Or => {
                if self.eval_bool(lhs, frame)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_bool(rhs, frame)?))
            }
            // 等値比較は構造比較
            BinOp::Eq => {
                let l = self.eval(lhs, frame)?;
                let r = self.eval(rhs, frame)?;
                Ok(Value::Bool(l == r))
            }
            BinOp::Ne => {
                let l = self.eval(lhs, frame)?;
                let r = self.eval(rhs, frame)?;
                Ok(Value::Bool(l != r))
            }
            _ => {
                let l = self.eval_int(lhs, frame)?;
                let r = self.eval_int(rhs, frame)?;
                let result = match op {
                    BinOp::Add => {
                        Value::Int(l.checked_add(r).ok_or(RuntimeError::IntegerOverflow)?)
                    }
                    BinOp::Sub => {
                        Value::Int(l.checked_sub(r).ok_or(RuntimeError::IntegerOverflow)?)
                    }
                    BinOp::Mul => {
                        Value::Int(l.checked_mul(r).ok_or(RuntimeError::IntegerOverflow)?)
                    }
                    BinOp::Div => {
                        if r == 0 {
                            return Err(RuntimeError::DivisionByZero.into());
                        }
                        Value::Int(l.checked_div(r).ok_or(RuntimeError::IntegerOverflow)?)
                    }
                    BinOp::Rem => {
                        if r == 0 {
                            return Err(RuntimeError::DivisionByZero.into());
                        }
                        Value::Int(l.checked_rem(r).ok_or(RuntimeError::IntegerOverflow)?)
                    }
                    BinOp::Lt => Value::Bool(l < r),
                    BinOp::Le => Value::Bool(l <= r),
                    BinOp::Gt => Value::Bool(l > r),
                    BinOp::Ge => Value::Bool(l >= r),
                    // And/Or/Eq/Ne は上で処理済み
                    BinOp::And | BinOp::Or | BinOp::Eq | BinOp::Ne => unreachable!(),
                };
                Ok(result)
            }
        }
    }

    fn eval_int(&mut self, expr: &Expr, frame: &Frame) -> ExecResult<i64> {
        let value = self.eval(expr, frame)?;
        value.as_int().map_err(VmStop::from)
    }

    fn eval_bool(&mut self, expr: &Expr, frame: &Frame) -> ExecResult<bool> {
        let value = self.eval(expr, frame)?;
        value.as_bool().map_err(VmStop::from)
    }
}
