//! Recursive descent parser with Pratt expression parsing for cart script.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Deepest expression/block nesting the parser will descend into.
/// Sits above the compiler's own nesting limit so that limit reports first.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a complete source string into an AST Program.
///
/// ```
/// use cart_parser::parse_program;
///
/// let prog = parse_program("let x = 1 + 2").unwrap();
/// assert_eq!(prog.stmts.len(), 1);
/// ```
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.do_parse_program()
}

/// Parse a block source (including braces) into an AST Block.
///
/// ```
/// use cart_parser::parse_block;
///
/// let block = parse_block("{ let x = 1; x + 2 }").unwrap();
/// assert_eq!(block.stmts.len(), 2);
/// ```
pub fn parse_block(source: &str) -> Result<Block, ParseError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let block = parser.parse_block_inner()?;
    parser.expect(&TokenKind::Eof)?;
    Ok(block)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Runs `f` one nesting level deeper, failing instead of recursing past
    /// [`MAX_NESTING_DEPTH`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here(format!(
                "expression nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos];
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected `{}`, found `{}`",
                kind_name(kind),
                tok_display(self.peek())
            )))
        }
    }

    fn error_here(&self, message: String) -> ParseError {
        let tok = self.peek();
        ParseError::new(message, tok.span.line, tok.span.col)
    }

    fn span(&self) -> Span {
        self.peek().span.clone()
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Peek at the token N positions ahead (0 = current).
    fn lookahead(&self, n: usize) -> &TokenKind {
        let idx = self.pos + n;
        if idx < self.tokens.len() {
            &self.tokens[idx].kind
        } else {
            &TokenKind::Eof
        }
    }

    // ========================================================================
    // Program / Block
    // ========================================================================

    fn do_parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            self.eat(&TokenKind::Semicolon);
        }
        Ok(Program { stmts })
    }

    fn parse_block_inner(&mut self) -> Result<Block, ParseError> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> Result<Block, ParseError> {
        let sp = self.span();
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
            self.eat(&TokenKind::Semicolon);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Block { stmts, span: sp })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Let => self.parse_binding(true),
            TokenKind::Mut => self.parse_binding(false),
            TokenKind::Import => self.parse_import(),
            TokenKind::Fn => {
                // `fn <ident> (` is a declaration; anything else is a fn expression
                if matches!(self.lookahead(1), TokenKind::Ident)
                    && matches!(self.lookahead(2), TokenKind::LParen)
                {
                    self.parse_fn_decl()
                } else {
                    let expr = self.parse_expr()?;
                    self.try_parse_assignment(expr)
                }
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let sp = self.span();
                self.advance();
                Ok(Stmt::Break { span: sp })
            }
            TokenKind::Continue => {
                let sp = self.span();
                self.advance();
                Ok(Stmt::Continue { span: sp })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.try_parse_assignment(expr)
            }
        }
    }

    /// After parsing an expression, check if `=` follows to make it an assignment.
    fn try_parse_assignment(&mut self, expr: Expr) -> Result<Stmt, ParseError> {
        if self.at(&TokenKind::Assign) {
            let sp = expr.span().clone();
            self.advance();
            let value = self.parse_expr()?;
            Ok(Stmt::Assignment {
                target: expr,
                value,
                span: sp,
            })
        } else {
            Ok(Stmt::Expr(expr))
        }
    }

    fn parse_binding(&mut self, immutable: bool) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.advance(); // eat `let` / `mut`
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(if immutable {
            Stmt::LetDecl {
                name,
                value,
                span: sp,
            }
        } else {
            Stmt::MutDecl {
                name,
                value,
                span: sp,
            }
        })
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.advance(); // eat `import`
        let module = self.expect_ident()?;
        Ok(Stmt::Import { module, span: sp })
    }

    fn parse_fn_decl(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.advance(); // eat `fn`
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block_inner()?;
        Ok(Stmt::FnDecl {
            name,
            params,
            body,
            span: sp,
        })
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            params.push(self.expect_ident()?);
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RParen) {
                    break; // trailing comma
                }
                params.push(self.expect_ident()?);
            }
        }
        Ok(params)
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let sp = self.span();
        self.advance(); // eat `return`
        let value = if self.can_start_expr() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Return { value, span: sp })
    }

    /// Whether the current token can start an expression.
    fn can_start_expr(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Integer
                | TokenKind::Float
                | TokenKind::StringLit
                | TokenKind::Ident
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Not
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Forever
                | TokenKind::Fn
        )
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let tok = self.peek().clone();
        if tok.kind == TokenKind::Ident {
            self.advance();
            Ok(tok.lexeme)
        } else {
            Err(ParseError::new(
                format!("expected identifier, found `{}`", tok_display(&tok)),
                tok.span.line,
                tok.span.col,
            ))
        }
    }

    // ========================================================================
    // Expressions (Pratt parser)
    // ========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_expr_bp_body(min_bp))
    }

    fn parse_expr_bp_body(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        // Prefix
        let mut lhs = self.parse_prefix()?;

        // Infix / postfix loop
        loop {
            // Postfix: call, index, dot
            match self.peek_kind() {
                TokenKind::LParen => {
                    if 13 < min_bp {
                        break;
                    }
                    lhs = self.parse_call(lhs)?;
                    continue;
                }
                TokenKind::LBracket => {
                    if 13 < min_bp {
                        break;
                    }
                    lhs = self.parse_index(lhs)?;
                    continue;
                }
                TokenKind::Dot => {
                    if 13 < min_bp {
                        break;
                    }
                    lhs = self.parse_dot(lhs)?;
                    continue;
                }
                _ => {}
            }

            // Infix binary operators
            if let Some((l_bp, r_bp)) = infix_bp(self.peek_kind()) {
                if l_bp < min_bp {
                    break;
                }
                let op_kind = self.advance().kind.clone();
                let was_cmp = is_comparison(&op_kind);
                let op = token_to_binop(&op_kind);
                let rhs = self.parse_expr_bp(r_bp)?;
                let sp = lhs.span().clone();
                lhs = Expr::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span: sp,
                };
                // `a < b < c` is almost always a bug
                if was_cmp && is_comparison(self.peek_kind()) {
                    return Err(self.error_here(
                        "comparison operators cannot be chained; use `&&` to combine: `a < b && b < c`"
                            .into(),
                    ));
                }
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    // Unary chains recurse through `parse_expr_bp`, which does the counting.
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_atom(),
        };
        let sp = self.span();
        self.advance();
        let operand = self.parse_expr_bp(11)?; // prefix BP
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
            span: sp,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        match self.peek_kind().clone() {
            TokenKind::Integer => {
                let tok = self.advance().clone();
                Ok(Expr::Number {
                    value: tok.lexeme,
                    span: sp,
                })
            }
            TokenKind::Float => {
                let tok = self.advance().clone();
                Ok(Expr::Float {
                    value: tok.lexeme,
                    span: sp,
                })
            }
            TokenKind::StringLit => {
                let tok = self.advance().clone();
                Ok(Expr::StringLit {
                    value: tok.lexeme,
                    span: sp,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool {
                    value: true,
                    span: sp,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool {
                    value: false,
                    span: sp,
                })
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil { span: sp })
            }
            TokenKind::Ident => {
                let tok = self.advance().clone();
                Ok(Expr::Ident {
                    name: tok.lexeme,
                    span: sp,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_brace_expr(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Forever => self.parse_forever(),
            TokenKind::Fn => self.parse_fn_expr(),
            _ => Err(self.error_here(format!(
                "expected expression, found `{}`",
                tok_display(self.peek())
            ))),
        }
    }

    // ========================================================================
    // Postfix helpers
    // ========================================================================

    fn parse_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let sp = callee.span().clone();
        self.advance(); // eat `(`
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RParen) {
                    break; // trailing comma
                }
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span: sp,
        })
    }

    fn parse_index(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let sp = object.span().clone();
        self.advance(); // eat `[`
        let index = self.parse_expr()?;
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            span: sp,
        })
    }

    fn parse_dot(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let sp = object.span().clone();
        self.advance(); // eat `.`
        let field = self.expect_ident()?;
        Ok(Expr::DotAccess {
            object: Box::new(object),
            field,
            span: sp,
        })
    }

    // ========================================================================
    // Compound expressions
    // ========================================================================

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `[`
        let mut elements = Vec::new();
        if !self.at(&TokenKind::RBracket) {
            elements.push(self.parse_expr()?);
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RBracket) {
                    break; // trailing comma
                }
                elements.push(self.parse_expr()?);
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Array { elements, span: sp })
    }

    /// Disambiguate `{`: map literal or block.
    /// Map: `{ ident: expr, ... }`, `{ "str": expr, ... }` or `{}`
    /// Block: everything else
    fn parse_brace_expr(&mut self) -> Result<Expr, ParseError> {
        if self.is_map_literal() {
            self.parse_map()
        } else {
            let block = self.parse_block_inner()?;
            Ok(Expr::Block(block))
        }
    }

    fn is_map_literal(&self) -> bool {
        match self.lookahead(1) {
            TokenKind::Ident | TokenKind::StringLit => {
                matches!(self.lookahead(2), TokenKind::Colon)
            }
            TokenKind::RBrace => true,
            _ => false,
        }
    }

    fn parse_map(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `{`
        let mut pairs = Vec::new();
        if !self.at(&TokenKind::RBrace) {
            pairs.push(self.parse_map_pair()?);
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RBrace) {
                    break; // trailing comma
                }
                pairs.push(self.parse_map_pair()?);
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Map { pairs, span: sp })
    }

    fn parse_map_pair(&mut self) -> Result<(MapKey, Expr), ParseError> {
        let key = match self.peek_kind() {
            TokenKind::Ident => MapKey::Ident(self.advance().lexeme.clone()),
            TokenKind::StringLit => MapKey::StringLit(self.advance().lexeme.clone()),
            _ => {
                return Err(self.error_here(format!(
                    "expected map key (identifier or string), found `{}`",
                    tok_display(self.peek())
                )));
            }
        };
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok((key, value))
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `if`
        let condition = Box::new(self.parse_expr()?);
        let then_block = self.parse_block_inner()?;
        let else_branch = if self.eat(&TokenKind::Else) {
            if self.at(&TokenKind::If) {
                Some(ElseBranch::If(Box::new(self.parse_if()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block_inner()?))
            }
        } else {
            None
        };
        Ok(Expr::If {
            condition,
            then_block,
            else_branch,
            span: sp,
        })
    }

    fn parse_while(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `while`
        let condition = Box::new(self.parse_expr()?);
        let body = self.parse_block_inner()?;
        Ok(Expr::While {
            condition,
            body,
            span: sp,
        })
    }

    fn parse_for(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `for`
        let var = self.expect_ident()?;
        self.expect(&TokenKind::In)?;

        let first = self.parse_expr()?;
        let iterable = if self.eat(&TokenKind::DotDot) {
            let end = self.parse_expr()?;
            ForIterable::Range {
                start: Box::new(first),
                end: Box::new(end),
            }
        } else {
            ForIterable::Expr(Box::new(first))
        };

        let body = self.parse_block_inner()?;
        Ok(Expr::For {
            var,
            iterable,
            body,
            span: sp,
        })
    }

    fn parse_forever(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `forever`
        let body = self.parse_block_inner()?;
        Ok(Expr::Forever { body, span: sp })
    }

    fn parse_fn_expr(&mut self) -> Result<Expr, ParseError> {
        let sp = self.span();
        self.advance(); // eat `fn`
        let name = if self.at(&TokenKind::Ident) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block_inner()?;
        Ok(Expr::FnExpr {
            name,
            params,
            body,
            span: sp,
        })
    }
}

// ============================================================================
// Pratt precedence helpers
// ============================================================================

fn is_comparison(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eq | TokenKind::Neq | TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge
    )
}

/// Returns (left_bp, right_bp) for infix operators. None if not infix.
fn infix_bp(kind: &TokenKind) -> Option<(u8, u8)> {
    Some(match kind {
        TokenKind::Or => (1, 2),
        TokenKind::And => (3, 4),
        TokenKind::Eq
        | TokenKind::Neq
        | TokenKind::Lt
        | TokenKind::Le
        | TokenKind::Gt
        | TokenKind::Ge => (5, 6),
        TokenKind::Plus | TokenKind::Minus => (7, 8),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (9, 10),
        TokenKind::Caret => (12, 11), // right-associative
        _ => return None,
    })
}

fn token_to_binop(kind: &TokenKind) -> BinOp {
    match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::Caret => BinOp::Pow,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::Neq => BinOp::Neq,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::And => BinOp::And,
        TokenKind::Or => BinOp::Or,
        _ => unreachable!("not a binary operator: {kind:?}"),
    }
}

fn kind_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Integer => "integer",
        TokenKind::Float => "float",
        TokenKind::StringLit => "string",
        TokenKind::Let => "let",
        TokenKind::Mut => "mut",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::While => "while",
        TokenKind::For => "for",
        TokenKind::In => "in",
        TokenKind::Fn => "fn",
        TokenKind::Return => "return",
        TokenKind::Break => "break",
        TokenKind::Continue => "continue",
        TokenKind::Nil => "nil",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Forever => "forever",
        TokenKind::Import => "import",
        TokenKind::Ident => "identifier",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Caret => "^",
        TokenKind::Eq => "==",
        TokenKind::Neq => "!=",
        TokenKind::Lt => "<",
        TokenKind::Le => "<=",
        TokenKind::Gt => ">",
        TokenKind::Ge => ">=",
        TokenKind::And => "&&",
        TokenKind::Or => "||",
        TokenKind::Not => "!",
        TokenKind::Assign => "=",
        TokenKind::DotDot => "..",
        TokenKind::Dot => ".",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Colon => ":",
        TokenKind::Semicolon => ";",
        TokenKind::Eof => "end of file",
    }
}

fn tok_display(tok: &Token) -> String {
    if tok.kind == TokenKind::Eof {
        "end of file".to_string()
    } else if tok.lexeme.is_empty() {
        kind_name(&tok.kind).to_string()
    } else {
        tok.lexeme.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_parentheses_are_an_error_not_a_crash() {
        let n = 100_000;
        let src = format!("let x = {}1{}", "(".repeat(n), ")".repeat(n));
        let err = parse_program(&src).unwrap_err();
        assert!(err.message.contains("nested deeper"), "{}", err.message);
    }

    #[test]
    fn deep_prefix_chains_and_blocks_are_bounded() {
        let src = format!("let x = {}1", "-".repeat(100_000));
        assert!(parse_program(&src).is_err());
        let n = 100_000;
        let src = format!("fn f() {}{{}}{}", "{ if true ".repeat(n), "}".repeat(n));
        assert!(parse_program(&src).is_err());
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let n = 60;
        let src = format!("let x = {}1{}", "(".repeat(n), ")".repeat(n));
        parse_program(&src).unwrap();
    }

    #[test]
    fn parse_simple_number() {
        let prog = parse_program("42").unwrap();
        assert_eq!(prog.stmts.len(), 1);
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Number { value, .. }) => assert_eq!(value, "42"),
            other => panic!("expected Number, got {other:?}"),
        }
    }

    #[test]
    fn parse_float() {
        let prog = parse_program("0.5").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Float { value, .. }) => assert_eq!(value, "0.5"),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn parse_let_decl() {
        let prog = parse_program("let x = 5").unwrap();
        match &prog.stmts[0] {
            Stmt::LetDecl { name, value, .. } => {
                assert_eq!(name, "x");
                match value {
                    Expr::Number { value: v, .. } => assert_eq!(v, "5"),
                    other => panic!("expected Number, got {other:?}"),
                }
            }
            other => panic!("expected LetDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_mut_decl() {
        let prog = parse_program("mut x = 10").unwrap();
        match &prog.stmts[0] {
            Stmt::MutDecl { name, .. } => assert_eq!(name, "x"),
            other => panic!("expected MutDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_import() {
        let prog = parse_program("import math").unwrap();
        match &prog.stmts[0] {
            Stmt::Import { module, .. } => assert_eq!(module, "math"),
            other => panic!("expected Import, got {other:?}"),
        }
    }

    #[test]
    fn parse_fn_decl() {
        let prog = parse_program("fn add(a, b) { a + b }").unwrap();
        match &prog.stmts[0] {
            Stmt::FnDecl { name, params, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params, &["a", "b"]);
            }
            other => panic!("expected FnDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_fn_expr_anonymous() {
        let prog = parse_program("fn() { 1 }").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::FnExpr { name, params, .. }) => {
                assert!(name.is_none());
                assert!(params.is_empty());
            }
            other => panic!("expected FnExpr, got {other:?}"),
        }
    }

    #[test]
    fn parse_for_range_with_expressions() {
        let prog = parse_program("for i in 0..n + 1 { i }").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::For { var, iterable, .. }) => {
                assert_eq!(var, "i");
                match iterable {
                    ForIterable::Range { start, end } => {
                        assert!(matches!(start.as_ref(), Expr::Number { .. }));
                        assert!(matches!(end.as_ref(), Expr::BinOp { op: BinOp::Add, .. }));
                    }
                    other => panic!("expected Range, got {other:?}"),
                }
            }
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn parse_for_in_expr() {
        let prog = parse_program("for x in arr { x }").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::For { iterable, .. }) => match iterable {
                ForIterable::Expr(e) => match e.as_ref() {
                    Expr::Ident { name, .. } => assert_eq!(name, "arr"),
                    other => panic!("expected Ident, got {other:?}"),
                },
                other => panic!("expected Expr iterable, got {other:?}"),
            },
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn parse_index_assignment() {
        let prog = parse_program("grid[1] = 3").unwrap();
        match &prog.stmts[0] {
            Stmt::Assignment { target, .. } => {
                assert!(matches!(target, Expr::Index { .. }));
            }
            other => panic!("expected Assignment, got {other:?}"),
        }
    }

    #[test]
    fn parse_member_call() {
        let prog = parse_program("math.sin(1)").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Call { callee, args, .. }) => {
                assert_eq!(args.len(), 1);
                match callee.as_ref() {
                    Expr::DotAccess { field, .. } => assert_eq!(field, "sin"),
                    other => panic!("expected DotAccess, got {other:?}"),
                }
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parse_map_literal() {
        let prog = parse_program(r#"{ key: 1, "str_key": 2 }"#).unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::Map { pairs, .. }) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[1].0.as_str(), "str_key");
            }
            other => panic!("expected Map, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_braces_is_map() {
        let prog = parse_program("let m = {}").unwrap();
        match &prog.stmts[0] {
            Stmt::LetDecl { value, .. } => assert!(matches!(value, Expr::Map { .. })),
            other => panic!("expected LetDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_precedence() {
        let prog = parse_program("a + b * c").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::BinOp {
                op: BinOp::Add, rhs, ..
            }) => {
                assert!(matches!(rhs.as_ref(), Expr::BinOp { op: BinOp::Mul, .. }));
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn parse_right_assoc_pow() {
        let prog = parse_program("2^3^4").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::BinOp {
                op: BinOp::Pow, rhs, ..
            }) => {
                assert!(matches!(rhs.as_ref(), Expr::BinOp { op: BinOp::Pow, .. }));
            }
            other => panic!("expected Pow, got {other:?}"),
        }
    }

    #[test]
    fn reject_chained_comparisons() {
        assert!(parse_program("a < b < c").is_err());
        assert!(parse_program("a == b == c").is_err());
        assert!(parse_program("a < b").is_ok());
        assert!(parse_program("a < b && b < c").is_ok());
    }

    #[test]
    fn parse_return_without_value() {
        let prog = parse_program("fn f() { return }").unwrap();
        match &prog.stmts[0] {
            Stmt::FnDecl { body, .. } => {
                assert!(matches!(&body.stmts[0], Stmt::Return { value: None, .. }));
            }
            other => panic!("expected FnDecl, got {other:?}"),
        }
    }

    #[test]
    fn parse_else_if() {
        let prog = parse_program("if a { 1 } else if b { 2 } else { 3 }").unwrap();
        match &prog.stmts[0] {
            Stmt::Expr(Expr::If {
                else_branch: Some(ElseBranch::If(inner)),
                ..
            }) => {
                assert!(matches!(
                    inner.as_ref(),
                    Expr::If {
                        else_branch: Some(ElseBranch::Block(_)),
                        ..
                    }
                ));
            }
            other => panic!("expected If with else-if, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse_program("let x = \n  )").unwrap_err();
        assert!(err.message.contains("expected expression"));
        assert_eq!(err.line, 2);
        assert_eq!(err.col, 3);
    }

    #[test]
    fn parse_block_rejects_trailing_tokens() {
        assert!(parse_block("{ 1 } 2").is_err());
    }

    #[test]
    fn parse_semicolons() {
        let prog = parse_program("1; 2; 3").unwrap();
        assert_eq!(prog.stmts.len(), 3);
    }
}
