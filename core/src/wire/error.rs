//! Error types for the Wire compilation pipeline.
//!
//! Each stage has its own error type carrying a source location where one
//! exists; [`WireError`] is the umbrella returned by the simulator factory.
//! All of these are returned as values, never panicked.

/// Lexer error: an unexpected or malformed character sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexError {}

/// Parser error: token stream does not match the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Per-module compilation error (undeclared wires, width mismatches,
/// invalid slices, bad primitive arity).
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    /// Source line of the offending statement.
    pub line: u32,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CompileError {}

/// Flattening error: unknown submodules, arity/width mismatches across an
/// instance boundary, alias cycles, bad member access.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenError {
    pub message: String,
}

impl std::fmt::Display for FlattenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FlattenError {}

/// Any error the Wire pipeline can produce, from source text to flat circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum WireError {
    Lex(LexError),
    Parse(ParseError),
    Compile(CompileError),
    Flatten(FlattenError),
    /// The requested top module does not exist in the source.
    UnknownModule(String),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "lex error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Compile(e) => write!(f, "compile error: {e}"),
            Self::Flatten(e) => write!(f, "flatten error: {e}"),
            Self::UnknownModule(name) => write!(f, "unknown top module: {name}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<LexError> for WireError {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for WireError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<CompileError> for WireError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<FlattenError> for WireError {
    fn from(e: FlattenError) -> Self {
        Self::Flatten(e)
    }
}
