//! Recursive-descent parser for the Vela surface syntax.
//!
//! Statements are separated by newlines or optional semicolons; the grammar
//! is written so that no statement can continue into the next one, which
//! keeps the separator optional.

use crate::ast::{
    BinOp, Block, Expr, ForStmt, Function, IfStmt, Param, Program, Stmt, Type,
};
use crate::frontend::lexer::{self, Span, Spanned, Token};
use crate::CompileError;

/// Lex and parse a whole source file.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = lexer::lex(source)?;
    Parser::new(source, &tokens).parse_program()
}

struct Parser<'s, 't> {
    source: &'s str,
    tokens: &'t [Spanned],
    pos: usize,
}

impl<'s, 't> Parser<'s, 't> {
    fn new(source: &'s str, tokens: &'t [Spanned]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    // ── Token stream helpers ─────────────────────────────────────────────

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|s| &s.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.tok)
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map(|s| s.span).unwrap_or(Span {
            start: self.source.len(),
            end: self.source.len(),
        })
    }

    fn error(&self, span: Span, message: String) -> CompileError {
        let (line, col) = lexer::position_to_line_col(self.source, span.start);
        CompileError::Parse { line, col, message }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Span, CompileError> {
        let span = self.current_span();
        match self.peek() {
            Some(t) if t == expected => {
                self.pos += 1;
                Ok(span)
            }
            Some(t) => Err(self.error(span, format!("expected {what}, found {t}"))),
            None => Err(self.error(span, format!("expected {what}, found end of input"))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), CompileError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok((name, span))
            }
            Some(t) => Err(self.error(span, format!("expected {what}, found {t}"))),
            None => Err(self.error(span, format!("expected {what}, found end of input"))),
        }
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.peek() == Some(t) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ── Top level ────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut functions = Vec::new();
        while self.peek().is_some() {
            functions.push(self.parse_function()?);
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> Result<Function, CompileError> {
        let start = self.expect(&Token::Proc, "'proc'")?;
        let (name, _) = self.expect_ident("function name")?;
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                let (pname, pspan) = self.expect_ident("parameter name")?;
                self.expect(&Token::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: pname,
                    ty,
                    span: pspan,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;
        self.expect(&Token::Arrow, "'->'")?;
        let return_ty = self.parse_type()?;
        let body = self.parse_block()?;
        let span = Span {
            start: start.start,
            end: body.span.end,
        };
        Ok(Function {
            name,
            params,
            return_ty,
            body,
            span,
        })
    }

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::LBracket) => {
                self.pos += 1;
                let len = self.parse_int_literal("array length")?;
                self.expect(&Token::RBracket, "']'")?;
                let elem = self.parse_type()?;
                Ok(Type::Array {
                    elem: Box::new(elem),
                    len: len as usize,
                })
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                scalar_type(&name).ok_or_else(|| self.error(span, format!("unknown type '{name}'")))
            }
            Some(t) => Err(self.error(span, format!("expected type, found {t}"))),
            None => Err(self.error(span, "expected type, found end of input".to_string())),
        }
    }

    fn parse_int_literal(&mut self, what: &str) -> Result<i64, CompileError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Int(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            Some(t) => Err(self.error(span, format!("expected {what}, found {t}"))),
            None => Err(self.error(span, format!("expected {what}, found end of input"))),
        }
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Block, CompileError> {
        let start = self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            if self.peek() == Some(&Token::RBrace) || self.peek().is_none() {
                break;
            }
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(&Token::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: Span {
                start: start.start,
                end: end.end,
            },
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match self.peek() {
            Some(Token::Let) => self.parse_let(),
            Some(Token::Return) => self.parse_return(),
            Some(Token::If) => Ok(Stmt::If(Box::new(self.parse_if()?))),
            Some(Token::For) => self.parse_for(),
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            _ => self.parse_simple_stmt(),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, CompileError> {
        let start = self.expect(&Token::Let, "'let'")?;
        let (name, _) = self.expect_ident("variable name")?;
        let ty = if self.eat(&Token::Colon) {
            self.parse_type()?
        } else {
            Type::Unknown
        };
        self.expect(&Token::Assign, "'='")?;
        let init = if self.peek() == Some(&Token::LBrace) {
            self.parse_array_list(&name)?
        } else {
            self.parse_expr()?
        };
        let span = Span {
            start: start.start,
            end: init.span().end,
        };
        Ok(Stmt::Declare {
            name,
            ty,
            init,
            span,
        })
    }

    fn parse_array_list(&mut self, target: &str) -> Result<Expr, CompileError> {
        let start = self.expect(&Token::LBrace, "'{'")?;
        let mut elems = Vec::new();
        if self.peek() != Some(&Token::RBrace) {
            loop {
                elems.push(self.parse_expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&Token::RBrace, "'}'")?;
        Ok(Expr::ArrayList {
            target: target.to_string(),
            elems,
            span: Span {
                start: start.start,
                end: end.end,
            },
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let start = self.expect(&Token::Return, "'return'")?;
        let value = self.parse_expr()?;
        let span = Span {
            start: start.start,
            end: value.span().end,
        };
        Ok(Stmt::Return { value, span })
    }

    fn parse_if(&mut self) -> Result<IfStmt, CompileError> {
        let start = self.expect(&Token::If, "'if'")?;
        let cond = self.parse_expr()?;
        let then = self.parse_block()?;
        let mut end = then.span.end;
        let else_branch = if self.eat(&Token::Else) {
            let arm = if self.peek() == Some(&Token::If) {
                self.parse_if()?
            } else {
                let blk = self.parse_block()?;
                let span = blk.span;
                IfStmt {
                    cond: None,
                    then: blk,
                    else_branch: None,
                    span,
                }
            };
            end = arm.span.end;
            Some(Box::new(arm))
        } else {
            None
        };
        Ok(IfStmt {
            cond: Some(cond),
            then,
            else_branch,
            span: Span {
                start: start.start,
                end,
            },
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        let start = self.expect(&Token::For, "'for'")?;
        let init = self.parse_simple_stmt()?;
        self.expect(&Token::Semicolon, "';'")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::Semicolon, "';'")?;
        let post = self.parse_simple_stmt()?;
        let body = self.parse_block()?;
        let span = Span {
            start: start.start,
            end: body.span.end,
        };
        Ok(Stmt::For(Box::new(ForStmt {
            init,
            cond,
            post,
            body,
            span,
        })))
    }

    /// Assignment (`:=` or `=`) or a bare expression statement.
    fn parse_simple_stmt(&mut self) -> Result<Stmt, CompileError> {
        if let Some(Token::Ident(_)) = self.peek() {
            if let Some(Token::ColonAssign | Token::Assign) = self.peek_at(1) {
                let (name, nspan) = self.expect_ident("identifier")?;
                let declare = matches!(self.peek(), Some(Token::ColonAssign));
                self.pos += 1; // ':=' or '='
                let value = self.parse_expr()?;
                let span = Span {
                    start: nspan.start,
                    end: value.span().end,
                };
                return Ok(Stmt::Assign {
                    name,
                    value,
                    declare,
                    span,
                });
            }
        }
        let expr = self.parse_expr()?;
        let span = expr.span();
        Ok(Stmt::Expr { expr, span })
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_additive()?;
        while let Some(op) = match self.peek() {
            Some(Token::EqEq) => Some(BinOp::Eql),
            Some(Token::NotEq) => Some(BinOp::Neq),
            Some(Token::Gt) => Some(BinOp::Gtr),
            Some(Token::Lt) => Some(BinOp::Lss),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_primary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Quo),
            Some(Token::Percent) => Some(BinOp::Rem),
            _ => None,
        } {
            self.pos += 1;
            let rhs = self.parse_primary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Int(value)) => {
                let value = *value;
                self.pos += 1;
                Ok(Expr::Int {
                    value,
                    ty: Type::Unknown,
                    span,
                })
            }
            Some(Token::Float(value)) => {
                let value = *value;
                self.pos += 1;
                Ok(Expr::Float {
                    value,
                    ty: Type::Unknown,
                    span,
                })
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                match self.peek() {
                    // `i64(e)` is a cast, `f(e, …)` is a call.
                    Some(Token::LParen) => {
                        self.pos += 1;
                        if let Some(target) = scalar_type(&name) {
                            let inner = self.parse_expr()?;
                            let end = self.expect(&Token::RParen, "')'")?;
                            Ok(Expr::Cast {
                                target,
                                inner: Box::new(inner),
                                span: Span {
                                    start: span.start,
                                    end: end.end,
                                },
                            })
                        } else {
                            let mut args = Vec::new();
                            if self.peek() != Some(&Token::RParen) {
                                loop {
                                    args.push(self.parse_expr()?);
                                    if !self.eat(&Token::Comma) {
                                        break;
                                    }
                                }
                            }
                            let end = self.expect(&Token::RParen, "')'")?;
                            Ok(Expr::Call {
                                callee: name,
                                args,
                                ty: Type::Unknown,
                                span: Span {
                                    start: span.start,
                                    end: end.end,
                                },
                            })
                        }
                    }
                    Some(Token::LBracket) => {
                        self.pos += 1;
                        let index = self.parse_expr()?;
                        let end = self.expect(&Token::RBracket, "']'")?;
                        Ok(Expr::ArrayIndex {
                            array: name,
                            index: Box::new(index),
                            ty: Type::Unknown,
                            span: Span {
                                start: span.start,
                                end: end.end,
                            },
                        })
                    }
                    _ => Ok(Expr::Ident {
                        name,
                        ty: Type::Unknown,
                        span,
                    }),
                }
            }
            Some(t) => Err(self.error(span, format!("expected expression, found {t}"))),
            None => Err(self.error(span, "expected expression, found end of input".to_string())),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = Span {
        start: lhs.span().start,
        end: rhs.span().end,
    };
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        is_float: false,
        ty: Type::Unknown,
        span,
    }
}

fn scalar_type(name: &str) -> Option<Type> {
    Some(match name {
        "i8" => Type::Int {
            width: 8,
            signed: true,
        },
        "i16" => Type::Int {
            width: 16,
            signed: true,
        },
        "i32" => Type::Int {
            width: 32,
            signed: true,
        },
        "i64" => Type::Int {
            width: 64,
            signed: true,
        },
        "u8" => Type::Int {
            width: 8,
            signed: false,
        },
        "u16" => Type::Int {
            width: 16,
            signed: false,
        },
        "u32" => Type::Int {
            width: 32,
            signed: false,
        },
        "u64" => Type::Int {
            width: 64,
            signed: false,
        },
        "f32" => Type::Float { width: 32 },
        "f64" => Type::Float { width: 64 },
        "bool" => Type::Bool,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(source: &str) -> Function {
        let program = parse(source).unwrap();
        assert_eq!(program.functions.len(), 1);
        program.functions.into_iter().next().unwrap()
    }

    #[test]
    fn function_with_params() {
        let f = parse_one("proc add(a: i64, b: i64) -> i64 { return a + b }");
        assert_eq!(f.name, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].name, "a");
        assert_eq!(f.return_ty, Type::I64);
        assert_eq!(f.body.stmts.len(), 1);
    }

    #[test]
    fn else_if_chain_is_recursive() {
        let f = parse_one(
            "proc f(x: i64) -> i64 { if x < 1 { return 1 } else if x < 2 { return 2 } else { return 3 } }",
        );
        let Stmt::If(first) = &f.body.stmts[0] else {
            panic!("expected if statement");
        };
        assert!(first.cond.is_some());
        let second = first.else_branch.as_ref().unwrap();
        assert!(second.cond.is_some());
        let third = second.else_branch.as_ref().unwrap();
        assert!(third.cond.is_none());
        assert!(third.else_branch.is_none());
    }

    #[test]
    fn for_loop_components() {
        let f = parse_one("proc f() -> i64 { for i := 0; i < 10; i = i + 1 { } return 0 }");
        let Stmt::For(node) = &f.body.stmts[0] else {
            panic!("expected for statement");
        };
        assert!(matches!(&node.init, Stmt::Assign { declare: true, .. }));
        assert!(matches!(&node.post, Stmt::Assign { declare: false, .. }));
    }

    #[test]
    fn array_list_initializer() {
        let f = parse_one("proc f() -> i64 { let a: [3]i64 = {1, 2, 3} return a[0] }");
        let Stmt::Declare { ty, init, .. } = &f.body.stmts[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(ty, Type::Array { len: 3, .. }));
        let Expr::ArrayList { target, elems, .. } = init else {
            panic!("expected array initializer");
        };
        assert_eq!(target, "a");
        assert_eq!(elems.len(), 3);
    }

    #[test]
    fn cast_is_not_a_call() {
        let f = parse_one("proc f() -> i64 { return i64(1) }");
        let Stmt::Return { value, .. } = &f.body.stmts[0] else {
            panic!("expected return");
        };
        assert!(matches!(value, Expr::Cast { .. }));
    }

    #[test]
    fn semicolons_are_optional_separators() {
        let a = parse("proc f() -> i64 { let a = 1; return a }").unwrap();
        let b = parse("proc f() -> i64 { let a = 1\n return a }").unwrap();
        assert_eq!(a.functions[0].body.stmts.len(), b.functions[0].body.stmts.len());
    }

    #[test]
    fn precedence_mul_binds_tighter() {
        let f = parse_one("proc f() -> i64 { return 1 + 2 * 3 }");
        let Stmt::Return { value, .. } = &f.body.stmts[0] else {
            panic!("expected return");
        };
        let Expr::Binary { op, rhs, .. } = value else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }
}
