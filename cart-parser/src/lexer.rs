//! Single-pass O(n) lexer for cart script source.
use crate::ast::Span;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        };
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') => {
                    if self.peek2() == Some(b'/') {
                        // Line comment
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == b'\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else if self.peek2() == Some(b'*') {
                        // Block comment
                        let comment_line = self.line;
                        let comment_col = self.col;
                        self.advance();
                        self.advance();
                        let mut closed = false;
                        loop {
                            match self.peek() {
                                None => break,
                                Some(b'*') if self.peek2() == Some(b'/') => {
                                    self.advance();
                                    self.advance();
                                    closed = true;
                                    break;
                                }
                                _ => {
                                    self.advance();
                                }
                            }
                        }
                        if !closed {
                            return Err(ParseError::new(
                                "unterminated block comment",
                                comment_line,
                                comment_col,
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments()?;

        let sp = self.span();

        let Some(ch) = self.peek() else {
            return Ok(token(TokenKind::Eof, sp, ""));
        };

        // Numbers
        if ch.is_ascii_digit() {
            return Ok(self.lex_number(sp));
        }

        // Identifiers and keywords
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.lex_ident(sp));
        }

        // Strings
        if ch == b'"' {
            return self.lex_string(sp);
        }

        // Two-character operators share a first byte with a one-character one.
        let paired = match (ch, self.peek2()) {
            (b'=', Some(b'=')) => Some((TokenKind::Eq, "==")),
            (b'!', Some(b'=')) => Some((TokenKind::Neq, "!=")),
            (b'<', Some(b'=')) => Some((TokenKind::Le, "<=")),
            (b'>', Some(b'=')) => Some((TokenKind::Ge, ">=")),
            (b'&', Some(b'&')) => Some((TokenKind::And, "&&")),
            (b'|', Some(b'|')) => Some((TokenKind::Or, "||")),
            (b'.', Some(b'.')) => Some((TokenKind::DotDot, "..")),
            _ => None,
        };
        if let Some((kind, lexeme)) = paired {
            self.advance();
            self.advance();
            return Ok(token(kind, sp, lexeme));
        }

        // Single-character tokens
        let (kind, lexeme) = match ch {
            b'=' => (TokenKind::Assign, "="),
            b'!' => (TokenKind::Not, "!"),
            b'<' => (TokenKind::Lt, "<"),
            b'>' => (TokenKind::Gt, ">"),
            b'.' => (TokenKind::Dot, "."),
            b'+' => (TokenKind::Plus, "+"),
            b'-' => (TokenKind::Minus, "-"),
            b'*' => (TokenKind::Star, "*"),
            b'/' => (TokenKind::Slash, "/"),
            b'%' => (TokenKind::Percent, "%"),
            b'^' => (TokenKind::Caret, "^"),
            b'(' => (TokenKind::LParen, "("),
            b')' => (TokenKind::RParen, ")"),
            b'[' => (TokenKind::LBracket, "["),
            b']' => (TokenKind::RBracket, "]"),
            b'{' => (TokenKind::LBrace, "{"),
            b'}' => (TokenKind::RBrace, "}"),
            b',' => (TokenKind::Comma, ","),
            b':' => (TokenKind::Colon, ":"),
            b';' => (TokenKind::Semicolon, ";"),
            b'&' | b'|' => {
                return Err(ParseError::new(
                    format!("unexpected character `{}`", ch as char),
                    sp.line,
                    sp.col,
                ));
            }
            _ => {
                let shown = self.current_char().unwrap_or('?');
                return Err(ParseError::new(
                    format!("unexpected character `{shown}`"),
                    sp.line,
                    sp.col,
                ));
            }
        };
        self.advance();
        Ok(token(kind, sp, lexeme))
    }

    /// Decode the (possibly multi-byte) UTF-8 character at the cursor.
    fn current_char(&self) -> Option<char> {
        let first = self.peek()?;
        let width = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return None,
        };
        let end = self.pos + width;
        if end > self.source.len() {
            return None;
        }
        std::str::from_utf8(&self.source[self.pos..end])
            .ok()
            .and_then(|s| s.chars().next())
    }

    fn lex_number(&mut self, sp: Span) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.advance();
        }
        // `1.5` is a float, `0..8` is a range: only a digit after the dot counts.
        let is_float = self.peek() == Some(b'.')
            && matches!(self.peek2(), Some(ch) if ch.is_ascii_digit());
        if is_float {
            self.advance(); // consume '.'
            while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
                self.advance();
            }
            return Token {
                kind: TokenKind::Float,
                span: sp,
                lexeme: self.text(start),
            };
        }
        Token {
            kind: TokenKind::Integer,
            span: sp,
            lexeme: self.text(start),
        }
    }

    fn lex_ident(&mut self, sp: Span) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = self.text(start);
        let kind = match lexeme.as_str() {
            "let" => TokenKind::Let,
            "mut" => TokenKind::Mut,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "fn" => TokenKind::Fn,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "nil" => TokenKind::Nil,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "forever" => TokenKind::Forever,
            "import" => TokenKind::Import,
            _ => TokenKind::Ident,
        };
        Token {
            kind,
            span: sp,
            lexeme,
        }
    }

    fn lex_string(&mut self, sp: Span) -> Result<Token, ParseError> {
        self.advance(); // consume opening "
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        "unterminated string literal",
                        sp.line,
                        sp.col,
                    ));
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(esc @ (b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't')) => {
                            value.push('\\');
                            value.push(esc as char);
                            self.advance();
                        }
                        Some(ch) => {
                            let esc_sp = self.span();
                            return Err(ParseError::new(
                                format!("invalid escape sequence `\\{}`", ch as char),
                                esc_sp.line,
                                esc_sp.col,
                            ));
                        }
                        None => {
                            return Err(ParseError::new(
                                "unterminated string literal",
                                sp.line,
                                sp.col,
                            ));
                        }
                    }
                }
                Some(_) => match self.current_char() {
                    Some(c) => {
                        for _ in 0..c.len_utf8() {
                            self.advance();
                        }
                        value.push(c);
                    }
                    None => {
                        let byte_sp = self.span();
                        return Err(ParseError::new(
                            "invalid UTF-8 in string literal",
                            byte_sp.line,
                            byte_sp.col,
                        ));
                    }
                },
            }
        }
        Ok(Token {
            kind: TokenKind::StringLit,
            span: sp,
            lexeme: value,
        })
    }
}

fn token(kind: TokenKind, span: Span, lexeme: &str) -> Token {
    Token {
        kind,
        span,
        lexeme: lexeme.into(),
    }
}

/// Process escape sequences in a raw string literal value.
///
/// The lexer stores string contents with escapes unprocessed (e.g., `\n` as
/// literal backslash + `n`). The compiler calls this when it interns the
/// literal as a constant.
pub fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('/') => result.push('/'),
                Some('b') => result.push('\u{08}'),
                Some('f') => result.push('\u{0C}'),
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}
