//! Owned AST types for cart script.
//!
//! These types represent the parsed structure of a cartridge, independent of
//! the lexer. All types are `Clone + Debug`.

/// Source location for error reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

/// A complete program: a sequence of statements.
#[derive(Clone, Debug)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// Statement variants.
#[derive(Clone, Debug)]
pub enum Stmt {
    LetDecl {
        name: String,
        value: Expr,
        span: Span,
    },
    MutDecl {
        name: String,
        value: Expr,
        span: Span,
    },
    Assignment {
        target: Expr,
        value: Expr,
        span: Span,
    },
    FnDecl {
        name: String,
        params: Vec<String>,
        body: Block,
        span: Span,
    },
    Import {
        module: String,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::LetDecl { span, .. }
            | Stmt::MutDecl { span, .. }
            | Stmt::Assignment { span, .. }
            | Stmt::FnDecl { span, .. }
            | Stmt::Import { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span } => span,
            Stmt::Expr(expr) => expr.span(),
        }
    }
}

/// A block of statements (e.g., `{ ... }`).
#[derive(Clone, Debug)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Expression variants.
#[derive(Clone, Debug)]
pub enum Expr {
    Number {
        value: String,
        span: Span,
    },
    Float {
        value: String,
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    StringLit {
        value: String,
        span: Span,
    },
    Nil {
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    BinOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    DotAccess {
        object: Box<Expr>,
        field: String,
        span: Span,
    },
    If {
        condition: Box<Expr>,
        then_block: Block,
        else_branch: Option<ElseBranch>,
        span: Span,
    },
    For {
        var: String,
        iterable: ForIterable,
        body: Block,
        span: Span,
    },
    While {
        condition: Box<Expr>,
        body: Block,
        span: Span,
    },
    Forever {
        body: Block,
        span: Span,
    },
    Block(Block),
    FnExpr {
        name: Option<String>,
        params: Vec<String>,
        body: Block,
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    Map {
        pairs: Vec<(MapKey, Expr)>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Number { span, .. }
            | Expr::Float { span, .. }
            | Expr::Bool { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::Nil { span }
            | Expr::Ident { span, .. }
            | Expr::BinOp { span, .. }
            | Expr::UnaryOp { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::DotAccess { span, .. }
            | Expr::If { span, .. }
            | Expr::For { span, .. }
            | Expr::While { span, .. }
            | Expr::Forever { span, .. }
            | Expr::FnExpr { span, .. }
            | Expr::Array { span, .. }
            | Expr::Map { span, .. } => span,
            Expr::Block(block) => &block.span,
        }
    }

    /// Whether this expression is a literal value (no names, no calls).
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Number { .. }
                | Expr::Float { .. }
                | Expr::Bool { .. }
                | Expr::StringLit { .. }
                | Expr::Nil { .. }
                | Expr::Array { .. }
                | Expr::Map { .. }
                | Expr::FnExpr { .. }
        )
    }
}

/// Map key: either an identifier or a string literal.
#[derive(Clone, Debug)]
pub enum MapKey {
    Ident(String),
    StringLit(String),
}

impl MapKey {
    pub fn as_str(&self) -> &str {
        match self {
            MapKey::Ident(s) | MapKey::StringLit(s) => s,
        }
    }
}

/// Else branch: either a block or a chained `if`.
#[derive(Clone, Debug)]
pub enum ElseBranch {
    Block(Block),
    If(Box<Expr>),
}

/// For-loop iterable: either a half-open range or an expression.
#[derive(Clone, Debug)]
pub enum ForIterable {
    Range { start: Box<Expr>, end: Box<Expr> },
    Expr(Box<Expr>),
}

/// Binary operators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}
