//! Textual form of affine maps.
//!
//! Hand-rolled lexer and recursive-descent parser for the conventional
//! syntax, e.g. `(d0, d1)[s0] -> (d0 + d1 - s0 floordiv 2)`. Dimension and
//! symbol names are positional; any identifier list is accepted in the
//! domain, and result expressions may only reference declared names.

use snafu::Snafu;

use crate::context::Context;
use crate::expr::AffineExpr;
use crate::map::AffineMap;

#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum ParseError {
    #[snafu(display("unexpected character {ch:?} at offset {offset}"))]
    UnexpectedChar { ch: char, offset: usize },

    #[snafu(display("expected {expected} at offset {offset}"))]
    Expected { expected: &'static str, offset: usize },

    #[snafu(display("unknown identifier {name:?}"))]
    UnknownIdentifier { name: String },

    #[snafu(display("integer literal out of range at offset {offset}"))]
    IntOutOfRange { offset: usize },

    #[snafu(display("unexpected trailing input at offset {offset}"))]
    TrailingInput { offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Arrow,
    Plus,
    Minus,
    Star,
    Eof,
}

fn lex(input: &str) -> Result<Vec<(Tok, usize)>, ParseError> {
    let mut toks = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                toks.push((Tok::LParen, i));
                i += 1;
            }
            ')' => {
                toks.push((Tok::RParen, i));
                i += 1;
            }
            '[' => {
                toks.push((Tok::LBracket, i));
                i += 1;
            }
            ']' => {
                toks.push((Tok::RBracket, i));
                i += 1;
            }
            ',' => {
                toks.push((Tok::Comma, i));
                i += 1;
            }
            '+' => {
                toks.push((Tok::Plus, i));
                i += 1;
            }
            '*' => {
                toks.push((Tok::Star, i));
                i += 1;
            }
            '-' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    toks.push((Tok::Arrow, i));
                    i += 2;
                } else {
                    toks.push((Tok::Minus, i));
                    i += 1;
                }
            }
            '0'..='9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let value: i64 =
                    input[start..i].parse().map_err(|_| ParseError::IntOutOfRange { offset: start })?;
                toks.push((Tok::Int(value), start));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                toks.push((Tok::Ident(input[start..i].to_string()), start));
            }
            _ => return Err(ParseError::UnexpectedChar { ch: c, offset: i }),
        }
    }
    toks.push((Tok::Eof, input.len()));
    Ok(toks)
}

struct Parser<'a> {
    ctx: &'a Context,
    toks: Vec<(Tok, usize)>,
    pos: usize,
    dims: Vec<String>,
    syms: Vec<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos].0
    }

    fn offset(&self) -> usize {
        self.toks[self.pos].1
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].0.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: Tok, expected: &'static str) -> Result<(), ParseError> {
        if *self.peek() == tok {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::Expected { expected, offset: self.offset() })
        }
    }

    fn ident_list(&mut self, close: Tok, close_name: &'static str) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        if *self.peek() == close {
            self.bump();
            return Ok(names);
        }
        loop {
            match self.bump() {
                Tok::Ident(name) => names.push(name),
                _ => return Err(ParseError::Expected { expected: "identifier", offset: self.offset() }),
            }
            match self.bump() {
                Tok::Comma => continue,
                t if t == close => return Ok(names),
                _ => return Err(ParseError::Expected { expected: close_name, offset: self.offset() }),
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<AffineExpr, ParseError> {
        if let Some(i) = self.dims.iter().position(|d| d == name) {
            return Ok(self.ctx.dim(i as u32));
        }
        if let Some(i) = self.syms.iter().position(|s| s == name) {
            return Ok(self.ctx.symbol(i as u32));
        }
        Err(ParseError::UnknownIdentifier { name: name.to_string() })
    }

    // expr := term { ('+' | '-') term }
    fn expr(&mut self) -> Result<AffineExpr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Tok::Plus => {
                    self.bump();
                    let rhs = self.term()?;
                    lhs = self.ctx.add(lhs, rhs);
                }
                Tok::Minus => {
                    self.bump();
                    let rhs = self.term()?;
                    lhs = self.ctx.sub(lhs, rhs);
                }
                _ => return Ok(lhs),
            }
        }
    }

    // term := unary { ('*' | 'floordiv' | 'ceildiv' | 'mod') unary }
    fn term(&mut self) -> Result<AffineExpr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op: fn(&Context, AffineExpr, AffineExpr) -> AffineExpr = match self.peek() {
                Tok::Star => Context::mul,
                Tok::Ident(name) if name == "floordiv" => Context::floor_div,
                Tok::Ident(name) if name == "ceildiv" => Context::ceil_div,
                Tok::Ident(name) if name == "mod" => Context::rem,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = op(self.ctx, lhs, rhs);
        }
    }

    // unary := '-' unary | primary
    fn unary(&mut self) -> Result<AffineExpr, ParseError> {
        if *self.peek() == Tok::Minus {
            self.bump();
            let inner = self.unary()?;
            return Ok(self.ctx.mul(inner, self.ctx.constant(-1)));
        }
        self.primary()
    }

    // primary := integer | identifier | '(' expr ')'
    fn primary(&mut self) -> Result<AffineExpr, ParseError> {
        match self.bump() {
            Tok::Int(v) => Ok(self.ctx.constant(v)),
            Tok::Ident(name) => self.resolve(&name),
            Tok::LParen => {
                let e = self.expr()?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(e)
            }
            _ => Err(ParseError::Expected { expected: "expression", offset: self.offset() }),
        }
    }
}

/// Parse an affine map like `(d0, d1)[s0] -> (d0 + s0, d1)`.
pub fn parse_map(ctx: &Context, input: &str) -> Result<AffineMap, ParseError> {
    let toks = lex(input)?;
    let mut p = Parser { ctx, toks, pos: 0, dims: Vec::new(), syms: Vec::new() };

    p.expect(Tok::LParen, "`(`")?;
    p.dims = p.ident_list(Tok::RParen, "`)`")?;
    if *p.peek() == Tok::LBracket {
        p.bump();
        p.syms = p.ident_list(Tok::RBracket, "`]`")?;
    }
    p.expect(Tok::Arrow, "`->`")?;
    p.expect(Tok::LParen, "`(`")?;

    let mut results = Vec::new();
    if *p.peek() != Tok::RParen {
        loop {
            results.push(p.expr()?);
            match p.bump() {
                Tok::Comma => continue,
                Tok::RParen => break,
                _ => return Err(ParseError::Expected { expected: "`,` or `)`", offset: p.offset() }),
            }
        }
    } else {
        p.bump();
    }

    if *p.peek() != Tok::Eof {
        return Err(ParseError::TrailingInput { offset: p.offset() });
    }
    Ok(AffineMap::new(p.dims.len(), p.syms.len(), results))
}
