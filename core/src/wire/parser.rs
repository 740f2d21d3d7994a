//! Recursive-descent parser for Wire HDL.
//!
//! Grammar:
//! ```text
//! Module  := 'module' IDENT '(' PortList ')' '->' Outputs ':' Stmt*
//! Outputs := Port | '(' PortList ')'
//! Port    := IDENT (':' NUMBER)?
//! Stmt    := IDENT '=' Expr
//! Expr    := Primary ('.' IDENT | '[' NUMBER (':' NUMBER)? ']')*
//! Primary := NUMBER | IDENT | IDENT '(' (Expr (',' Expr)*)? ')'
//! ```
//!
//! A colon after a port name is a width spec iff the next token is a number;
//! otherwise it terminates the module header. Layout tokens (newline, indent)
//! are skipped.

use crate::wire::ast::{Expr, Module, Port, Statement};
use crate::wire::error::ParseError;
use crate::wire::lexer::{Token, TokenKind};

pub fn parse(tokens: &[Token]) -> Result<Vec<Module>, ParseError> {
    Parser { tokens, pos: 0 }.run()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<Module>, ParseError> {
        let mut modules = Vec::new();
        loop {
            self.skip_layout();
            if self.at(&TokenKind::Eof) {
                return Ok(modules);
            }
            modules.push(self.parse_module()?);
        }
    }

    /// Current token, with layout already skipped by callers.
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn skip_layout(&mut self) {
        while matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Indent
        ) {
            self.pos += 1;
        }
    }

    fn bump(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {what}, found {}", self.peek().kind)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(self.error_here(&format!("expected {what}, found {other}"))),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<u32, ParseError> {
        match self.peek().kind {
            TokenKind::Number(value) => {
                self.bump();
                Ok(value)
            }
            ref other => Err(self.error_here(&format!("expected {what}, found {other}"))),
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        let tok = self.peek();
        ParseError {
            message: message.to_string(),
            line: tok.line,
            col: tok.col,
        }
    }

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        let line = self.peek().line;
        self.expect(&TokenKind::Module, "'module'")?;
        let name = self.expect_ident("module name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let inputs = self.parse_port_list()?;
        self.expect(&TokenKind::RParen, "')'")?;
        self.expect(&TokenKind::Arrow, "'->'")?;

        let outputs = if self.eat(&TokenKind::LParen) {
            let ports = self.parse_port_list()?;
            self.expect(&TokenKind::RParen, "')'")?;
            ports
        } else {
            vec![self.parse_port()?]
        };
        self.expect(&TokenKind::Colon, "':'")?;

        let mut statements = Vec::new();
        loop {
            self.skip_layout();
            match self.peek().kind {
                TokenKind::Ident(_) => statements.push(self.parse_statement()?),
                _ => break,
            }
        }

        Ok(Module {
            name,
            inputs,
            outputs,
            statements,
            line,
        })
    }

    fn parse_port_list(&mut self) -> Result<Vec<Port>, ParseError> {
        let mut ports = Vec::new();
        if self.at(&TokenKind::RParen) {
            return Ok(ports);
        }
        loop {
            ports.push(self.parse_port()?);
            if !self.eat(&TokenKind::Comma) {
                return Ok(ports);
            }
        }
    }

    fn parse_port(&mut self) -> Result<Port, ParseError> {
        let name = self.expect_ident("port name")?;
        // One-token lookahead: a colon starts a width spec only when a
        // number follows; otherwise it ends the module header.
        let width = if self.at(&TokenKind::Colon)
            && matches!(
                self.tokens.get(self.pos + 1).map(|t| &t.kind),
                Some(TokenKind::Number(_))
            ) {
            self.bump();
            let width = self.expect_number("port width")?;
            if !(1..=32).contains(&width) {
                return Err(self.error_here(&format!(
                    "port width must be between 1 and 32, got {width}"
                )));
            }
            width
        } else {
            1
        };
        Ok(Port { name, width })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.peek().line;
        let target = self.expect_ident("wire name")?;
        self.expect(&TokenKind::Equals, "'='")?;
        let expr = self.parse_expr()?;
        Ok(Statement { target, expr, line })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let field = self.expect_ident("field name")?;
                expr = Expr::Member {
                    base: Box::new(expr),
                    field,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let start = self.expect_number("bit index")?;
                if self.eat(&TokenKind::Colon) {
                    let end = self.expect_number("slice end")?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    expr = Expr::Slice {
                        base: Box::new(expr),
                        start,
                        end,
                    };
                } else {
                    self.expect(&TokenKind::RBracket, "']'")?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        bit: start,
                    };
                }
            } else if self.at(&TokenKind::LParen) {
                return Err(self.error_here("only identifiers may be called"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Number(value) => {
                self.bump();
                Ok(Expr::Number(value))
            }
            TokenKind::Ident(name) => {
                self.bump();
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
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(self.error_here(&format!("expected expression, found {other}"))),
        }
    }
}
