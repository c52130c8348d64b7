//! 再帰下降構文解析器

use crate::ast::{AssignTarget, BinOp, Expr, FuncDef, Program, Stmt, UnaryOp};
use crate::error::ParseError;
use crate::token::{tokenize, Token, TokenKind};
use tracing::debug;

/// ソーステキストをパースしてプログラムを得る
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let program = parser.parse_program()?;
    debug!("parsed {} function(s)", program.funcs.len());
    Ok(program)
}

/// 単一の式をパースする
///
/// CLI引数や設定値（配列リテラル等）の解釈に使用します。
/// 式の後に余分なトークンが残っている場合はエラーになります。
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            found: token.kind.to_string(),
            expected: "end of input".to_string(),
            line: token.line,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    /// 次のトークンが指定の種類か確認する（消費しない）
    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    /// 次のトークンが指定の種類なら消費する
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 指定の種類のトークンを要求する
    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        let token = self.advance()?;
        if &token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: expected.to_string(),
                line: token.line,
            })
        }
    }

    /// 識別子を要求する
    fn expect_ident(&mut self) -> Result<(String, u32), ParseError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.line)),
            kind => Err(ParseError::UnexpectedToken {
                found: kind.to_string(),
                expected: "identifier".to_string(),
                line: token.line,
            }),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut funcs = Vec::new();
        while self.peek().is_some() {
            funcs.push(self.parse_func()?);
        }
        Ok(Program { funcs })
    }

    fn parse_func(&mut self) -> Result<FuncDef, ParseError> {
        let fn_token = self.expect(&TokenKind::Fn, "'fn'")?;
        let (name, _) = self.expect_ident()?;

        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let (param, _) = self.expect_ident()?;
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;

        let body = self.parse_block()?;
        Ok(FuncDef {
            name,
            params,
            body,
            line: fn_token.line,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(ParseError::UnexpectedEof);
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek().ok_or(ParseError::UnexpectedEof)?.clone();
        match token.kind {
            TokenKind::Let => {
                self.advance()?;
                let (name, _) = self.expect_ident()?;
                self.expect(&TokenKind::Assign, "'='")?;
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(Stmt::Let {
                    name,
                    value,
                    line: token.line,
                })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance()?;
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While {
                    cond,
                    body,
                    line: token.line,
                })
            }
            TokenKind::Return => {
                self.advance()?;
                let value = if self.at(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&TokenKind::Semicolon, "';'")?;
                Ok(Stmt::Return {
                    value,
                    line: token.line,
                })
            }
            _ => {
                // 代入または式文
                let expr = self.parse_expr()?;
                if self.eat(&TokenKind::Assign) {
                    let target = Self::expr_to_target(expr, token.line)?;
                    let value = self.parse_expr()?;
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    Ok(Stmt::Assign {
                        target,
                        value,
                        line: token.line,
                    })
                } else {
                    self.expect(&TokenKind::Semicolon, "';'")?;
                    Ok(Stmt::Expr {
                        expr,
                        line: token.line,
                    })
                }
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let if_token = self.expect(&TokenKind::If, "'if'")?;
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                // else if は入れ子のif文として扱う
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
            line: if_token.line,
        })
    }

    /// パース済みの式を代入の左辺に変換する
    ///
    /// 変数参照、または変数を起点とするインデックス参照の連鎖のみ許可します。
    fn expr_to_target(expr: Expr, line: u32) -> Result<AssignTarget, ParseError> {
        match expr {
            Expr::Name(name) => Ok(AssignTarget::Name(name)),
            Expr::Index { .. } => {
                let mut indices = Vec::new();
                let mut current = expr;
                loop {
                    match current {
                        Expr::Index { base, index } => {
                            indices.push(*index);
                            current = *base;
                        }
                        Expr::Name(name) => {
                            // 外側から順になるよう反転する
                            indices.reverse();
                            return Ok(AssignTarget::Index { name, indices });
                        }
                        _ => return Err(ParseError::InvalidAssignTarget { line }),
                    }
                }
            }
            _ => Err(ParseError::InvalidAssignTarget { line }),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.eat(&TokenKind::NotEq) {
                BinOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.eat(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.eat(&TokenKind::Le) {
                BinOp::Le
            } else if self.eat(&TokenKind::Gt) {
                BinOp::Gt
            } else if self.eat(&TokenKind::Ge) {
                BinOp::Ge
            } else {
                break;
            };
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinOp::Div
            } else if self.eat(&TokenKind::Percent) {
                BinOp::Rem
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            })
        } else if self.eat(&TokenKind::Bang) {
            let operand = self.parse_unary()?;
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.eat(&TokenKind::LBracket) {
            let index = self.parse_expr()?;
            self.expect(&TokenKind::RBracket, "']'")?;
            expr = Expr::Index {
                base: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Int(value) => Ok(Expr::Int(value)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.at(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen, "')'")?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                if !self.at(&TokenKind::RBracket) {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            kind => Err(ParseError::UnexpectedToken {
                found: kind.to_string(),
                expected: "expression".to_string(),
                line: token.line,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_function() {
        let program = parse_program("fn main() {}").unwrap();
        assert_eq!(program.funcs.len(), 1);
        assert_eq!(program.funcs[0].name, "main");
        assert!(program.funcs[0].params.is_empty());
        assert!(program.funcs[0].body.is_empty());
    }

    #[test]
    fn test_parse_let_and_assign() {
        let program = parse_program("fn f(a) {\n    let i = 0;\n    i = i + 1;\n}").unwrap();
        let body = &program.funcs[0].body;
        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::Let { name, line: 2, .. } if name == "i"));
        assert!(matches!(
            &body[1],
            Stmt::Assign {
                target: AssignTarget::Name(name),
                line: 3,
                ..
            } if name == "i"
        ));
    }

    #[test]
    fn test_parse_indexed_assign() {
        let program = parse_program("fn f(a) { a[i][j] = 0; }").unwrap();
        match &program.funcs[0].body[0] {
            Stmt::Assign {
                target: AssignTarget::Index { name, indices },
                ..
            } => {
                assert_eq!(name, "a");
                // インデックスは外側から順
                assert_eq!(
                    indices,
                    &vec![Expr::Name("i".to_string()), Expr::Name("j".to_string())]
                );
            }
            other => panic!("Expected indexed assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_while_condition() {
        let program = parse_program("fn f(a) { while i < len(a) { i = i + 1; } }").unwrap();
        match &program.funcs[0].body[0] {
            Stmt::While { cond, body, .. } => {
                assert!(matches!(cond, Expr::Binary { op: BinOp::Lt, .. }));
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_else_if_chain() {
        let source = "fn f(x) { if x < 0 { return 0; } else if x == 0 { return 1; } else { return 2; } }";
        let program = parse_program(source).unwrap();
        match &program.funcs[0].body[0] {
            Stmt::If { else_body, .. } => {
                // else if は入れ子のif文1つになる
                assert_eq!(else_body.len(), 1);
                assert!(matches!(&else_body[0], Stmt::If { .. }));
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_operator_precedence() {
        let program = parse_program("fn f() { let x = 1 + 2 * 3; }").unwrap();
        match &program.funcs[0].body[0] {
            Stmt::Let { value, .. } => match value {
                Expr::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("Expected addition at top, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_parse_array_literal() {
        let program = parse_program("fn f() { let a = [1, 2, 3]; let b = []; }").unwrap();
        match &program.funcs[0].body[0] {
            Stmt::Let { value: Expr::Array(items), .. } => assert_eq!(items.len(), 3),
            other => panic!("Expected array literal, got {:?}", other),
        }
        match &program.funcs[0].body[1] {
            Stmt::Let { value: Expr::Array(items), .. } => assert!(items.is_empty()),
            other => panic!("Expected empty array literal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_assign_target() {
        assert!(matches!(
            parse_program("fn f() { 1 = 2; }"),
            Err(ParseError::InvalidAssignTarget { line: 1 })
        ));
        assert!(matches!(
            parse_program("fn f() { len(a) = 2; }"),
            Err(ParseError::InvalidAssignTarget { .. })
        ));
    }

    #[test]
    fn test_parse_expression_standalone() {
        let expr = parse_expression("[3, 1, 2]").unwrap();
        assert_eq!(
            expr,
            Expr::Array(vec![Expr::Int(3), Expr::Int(1), Expr::Int(2)])
        );

        // 余分なトークンはエラー
        assert!(matches!(
            parse_expression("1 2"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_parse_unterminated_block() {
        assert!(matches!(
            parse_program("fn f() { let x = 1;"),
            Err(ParseError::UnexpectedEof)
        ));
    }
}
