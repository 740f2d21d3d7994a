//! Syntax tree for Wire HDL modules.

/// A named port with a bit width (1–32).
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub width: u32,
}

/// One `target = expr` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    pub expr: Expr,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Number(u32),
    Call { callee: String, args: Vec<Expr> },
    Member { base: Box<Expr>, field: String },
    /// Single-bit index `base[bit]`.
    Index { base: Box<Expr>, bit: u32 },
    /// Inclusive slice `base[start:end]`.
    Slice { base: Box<Expr>, start: u32, end: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub statements: Vec<Statement>,
    pub line: u32,
}
