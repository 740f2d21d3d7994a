//! Tokenizer for Wire HDL source.
//!
//! Whitespace is insignificant except inside module bodies, where newlines
//! and leading indentation are emitted as tokens so editor tooling can track
//! statement layout. The parser skips both.

use crate::wire::error::LexError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Module,
    Arrow,
    Colon,
    Equals,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Ident(String),
    Number(u32),
    Newline,
    Indent,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "'module'"),
            Self::Arrow => write!(f, "'->'"),
            Self::Colon => write!(f, "':'"),
            Self::Equals => write!(f, "'='"),
            Self::Comma => write!(f, "','"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::Dot => write!(f, "'.'"),
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Number(value) => write!(f, "number {value}"),
            Self::Newline => write!(f, "newline"),
            Self::Indent => write!(f, "indent"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    /// Set once the module-header colon has been seen; newlines and leading
    /// indentation are emitted as tokens only inside a body.
    in_body: bool,
    paren_depth: u32,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            in_body: false,
            paren_depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            let line = self.line;
            let col = self.col;

            // Leading run of spaces/tabs at line start.
            if self.col == 1 && (ch == ' ' || ch == '\t') {
                while matches!(self.peek(), Some(' ' | '\t')) {
                    self.advance();
                }
                if self.in_body {
                    tokens.push(Token {
                        kind: TokenKind::Indent,
                        line,
                        col,
                    });
                }
                continue;
            }

            match ch {
                '\n' => {
                    self.advance();
                    if self.in_body {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            line,
                            col,
                        });
                    }
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                ';' => {
                    // Comment to end of line; the newline itself is handled
                    // on the next pass.
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.advance();
                    }
                }
                '0'..='9' => {
                    let value = self.lex_number()?;
                    tokens.push(Token {
                        kind: TokenKind::Number(value),
                        line,
                        col,
                    });
                }
                'A'..='Z' | 'a'..='z' | '_' => {
                    let name = self.lex_ident();
                    let kind = if name == "module" {
                        self.in_body = false;
                        TokenKind::Module
                    } else {
                        TokenKind::Ident(name)
                    };
                    tokens.push(Token { kind, line, col });
                }
                '-' => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        tokens.push(Token {
                            kind: TokenKind::Arrow,
                            line,
                            col,
                        });
                    } else {
                        return Err(LexError {
                            message: "unexpected character '-'".into(),
                            line,
                            col,
                        });
                    }
                }
                ':' => {
                    self.advance();
                    if self.paren_depth == 0 {
                        self.in_body = true;
                    }
                    tokens.push(Token {
                        kind: TokenKind::Colon,
                        line,
                        col,
                    });
                }
                '=' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::Equals,
                        line,
                        col,
                    });
                }
                ',' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::Comma,
                        line,
                        col,
                    });
                }
                '(' => {
                    self.advance();
                    self.paren_depth += 1;
                    tokens.push(Token {
                        kind: TokenKind::LParen,
                        line,
                        col,
                    });
                }
                ')' => {
                    self.advance();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    tokens.push(Token {
                        kind: TokenKind::RParen,
                        line,
                        col,
                    });
                }
                '[' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::LBracket,
                        line,
                        col,
                    });
                }
                ']' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::RBracket,
                        line,
                        col,
                    });
                }
                '.' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::Dot,
                        line,
                        col,
                    });
                }
                other => {
                    return Err(LexError {
                        message: format!("unexpected character '{other}'"),
                        line,
                        col,
                    });
                }
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
            col: self.col,
        });
        Ok(tokens)
    }

    fn lex_number(&mut self) -> Result<u32, LexError> {
        let line = self.line;
        let col = self.col;

        if self.peek() == Some('0')
            && matches!(self.chars.get(self.pos + 1), Some('x' | 'X'))
        {
            self.advance();
            self.advance();
            let mut value: u32 = 0;
            let mut digits = 0;
            while let Some(ch) = self.peek() {
                if let Some(d) = ch.to_digit(16) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    digits += 1;
                    self.advance();
                } else {
                    break;
                }
            }
            if digits == 0 {
                return Err(LexError {
                    message: "unterminated hex literal".into(),
                    line,
                    col,
                });
            }
            Ok(value)
        } else {
            let mut value: u32 = 0;
            while let Some(ch) = self.peek() {
                if let Some(d) = ch.to_digit(10) {
                    value = value.wrapping_mul(10).wrapping_add(d);
                    self.advance();
                } else {
                    break;
                }
            }
            Ok(value)
        }
    }

    fn lex_ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_decimal_numbers() {
        let tokens = tokenize("255 0xFF 0X10").unwrap();
        let values: Vec<u32> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Number(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![255, 255, 16]);
    }

    #[test]
    fn comment_skipped_to_end_of_line() {
        let tokens = tokenize("a ; the rest is noise\nb").unwrap();
        let names: Vec<&str> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn newline_and_indent_only_inside_body() {
        let src = "module t(a)\n -> out:\n  out = a\n";
        let tokens = tokenize(src).unwrap();
        // No layout tokens before the header colon.
        let colon_at = tokens
            .iter()
            .position(|t| t.kind == TokenKind::Colon)
            .unwrap();
        assert!(
            tokens[..colon_at]
                .iter()
                .all(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Indent))
        );
        assert!(
            tokens[colon_at..]
                .iter()
                .any(|t| t.kind == TokenKind::Newline)
        );
        assert!(
            tokens[colon_at..]
                .iter()
                .any(|t| t.kind == TokenKind::Indent)
        );
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = tokenize("module x(a) -> out:\n  out = a").unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        let eq = tokens.iter().find(|t| t.kind == TokenKind::Equals).unwrap();
        assert_eq!((eq.line, eq.col), (2, 7));
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = tokenize("module t(a) -> out:\n  out = @a").unwrap_err();
        assert_eq!(err.message, "unexpected character '@'");
        assert_eq!((err.line, err.col), (2, 9));
    }

    #[test]
    fn unterminated_hex_is_an_error() {
        let err = tokenize("x = 0x").unwrap_err();
        assert_eq!(err.message, "unterminated hex literal");
    }
}
