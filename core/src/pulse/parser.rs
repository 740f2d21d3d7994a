//! Statement parser for Pulse assembly. One statement per token run; a
//! label may share its line with the instruction that follows it.

use crate::pulse::AsmError;
use crate::pulse::lexer::{Token, TokenKind, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Implied,
    Immediate(Value),
    /// Absolute address or branch target; mode is settled against the
    /// opcode table during assembly.
    Address(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Label {
        name: String,
        line: u32,
    },
    /// `NAME = value`; numeric at parse time.
    Constant {
        name: String,
        value: u32,
        line: u32,
    },
    Directive {
        name: String,
        values: Vec<Value>,
        line: u32,
    },
    Instruction {
        mnemonic: String,
        operand: Operand,
        line: u32,
    },
}

impl Statement {
    pub fn line(&self) -> u32 {
        match self {
            Self::Label { line, .. }
            | Self::Constant { line, .. }
            | Self::Directive { line, .. }
            | Self::Instruction { line, .. } => *line,
        }
    }
}

pub fn parse(lines: &[Vec<Token>]) -> Result<Vec<Statement>, AsmError> {
    let mut statements = Vec::new();
    for tokens in lines {
        parse_line(tokens, &mut statements)?;
    }
    Ok(statements)
}

fn parse_line(tokens: &[Token], out: &mut Vec<Statement>) -> Result<(), AsmError> {
    let mut rest = tokens;

    // Leading labels; `loop: DEX` carries on to the instruction.
    while let Some(Token {
        kind: TokenKind::Label(name),
        line,
    }) = rest.first()
    {
        out.push(Statement::Label {
            name: name.clone(),
            line: *line,
        });
        rest = &rest[1..];
    }
    let Some(first) = rest.first() else {
        return Ok(());
    };
    let line = first.line;

    match &first.kind {
        TokenKind::Directive(name) => {
            let values = parse_value_list(&rest[1..], line)?;
            out.push(Statement::Directive {
                name: name.clone(),
                values,
                line,
            });
            Ok(())
        }
        TokenKind::Ident(word) => {
            // `NAME = value` defines a constant.
            if matches!(rest.get(1).map(|t| &t.kind), Some(TokenKind::Equals)) {
                let value = match rest.get(2).map(|t| &t.kind) {
                    Some(TokenKind::Number(v)) | Some(TokenKind::Address(v)) => *v,
                    _ => {
                        return Err(AsmError {
                            message: format!("constant '{word}' needs a numeric value"),
                            line,
                        });
                    }
                };
                if rest.len() > 3 {
                    return Err(AsmError {
                        message: "unexpected tokens after constant definition".into(),
                        line,
                    });
                }
                out.push(Statement::Constant {
                    name: word.clone(),
                    value,
                    line,
                });
                return Ok(());
            }

            let mnemonic = word.to_uppercase();
            let operand = parse_operand(&rest[1..], line)?;
            out.push(Statement::Instruction {
                mnemonic,
                operand,
                line,
            });
            Ok(())
        }
        other => Err(AsmError {
            message: format!("unexpected token {other:?}"),
            line,
        }),
    }
}

fn parse_operand(tokens: &[Token], line: u32) -> Result<Operand, AsmError> {
    let operand = match tokens.first().map(|t| &t.kind) {
        None => Operand::Implied,
        Some(TokenKind::Immediate(value)) => Operand::Immediate(value.clone()),
        Some(TokenKind::Address(value)) | Some(TokenKind::Number(value)) => {
            Operand::Address(Value::Number(*value))
        }
        Some(TokenKind::Ident(symbol)) => Operand::Address(Value::Symbol(symbol.clone())),
        Some(other) => {
            return Err(AsmError {
                message: format!("unexpected operand token {other:?}"),
                line,
            });
        }
    };
    if tokens.len() > 1 {
        return Err(AsmError {
            message: "unexpected tokens after operand".into(),
            line,
        });
    }
    Ok(operand)
}

fn parse_value_list(tokens: &[Token], line: u32) -> Result<Vec<Value>, AsmError> {
    let mut values = Vec::new();
    let mut expect_value = true;
    for token in tokens {
        match (&token.kind, expect_value) {
            (TokenKind::Number(v), true) | (TokenKind::Address(v), true) => {
                values.push(Value::Number(*v));
                expect_value = false;
            }
            (TokenKind::Ident(s), true) => {
                values.push(Value::Symbol(s.clone()));
                expect_value = false;
            }
            (TokenKind::Comma, false) => expect_value = true,
            (other, _) => {
                return Err(AsmError {
                    message: format!("unexpected token {other:?} in directive"),
                    line,
                });
            }
        }
    }
    if expect_value && !values.is_empty() {
        return Err(AsmError {
            message: "trailing comma in directive".into(),
            line,
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::lexer::tokenize;

    fn parse_src(src: &str) -> Vec<Statement> {
        parse(&tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn label_then_instruction_same_line() {
        let stmts = parse_src("loop: DEX");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0], Statement::Label { name, .. } if name == "loop"));
        assert!(matches!(
            &stmts[1],
            Statement::Instruction { mnemonic, operand: Operand::Implied, .. }
                if mnemonic == "DEX"
        ));
    }

    #[test]
    fn mnemonics_fold_to_uppercase() {
        let stmts = parse_src("lda #$10");
        assert!(matches!(
            &stmts[0],
            Statement::Instruction { mnemonic, .. } if mnemonic == "LDA"
        ));
    }

    #[test]
    fn constants_and_directives() {
        let stmts = parse_src("SPEED = $10\n.org $0200\n.byte 1, 2, 3");
        assert!(matches!(
            &stmts[0],
            Statement::Constant { name, value: 0x10, .. } if name == "SPEED"
        ));
        assert!(matches!(
            &stmts[1],
            Statement::Directive { name, values, .. }
                if name == "org" && values == &[Value::Number(0x0200)]
        ));
        assert!(matches!(
            &stmts[2],
            Statement::Directive { values, .. } if values.len() == 3
        ));
    }

    #[test]
    fn word_directive_accepts_symbols() {
        let stmts = parse_src(".word start");
        assert!(matches!(
            &stmts[0],
            Statement::Directive { values, .. }
                if values == &[Value::Symbol("start".into())]
        ));
    }

    #[test]
    fn symbol_operand_parses_as_address() {
        let stmts = parse_src("JMP main");
        assert!(matches!(
            &stmts[0],
            Statement::Instruction { operand: Operand::Address(Value::Symbol(s)), .. }
                if s == "main"
        ));
    }

    #[test]
    fn non_numeric_constant_is_an_error() {
        let err = parse(&tokenize("X = name").unwrap()).unwrap_err();
        assert!(err.message.contains("numeric"));
    }
}
