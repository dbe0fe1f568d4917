//! Expression tokenizer, parser and evaluator.
//!
//! Expressions are arithmetic over variable titles and numeric literals:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | IDENT | '(' expr ')'
//! ```
//!
//! Tokens keep their byte span in the source text, which is what lets a
//! rename rewrite one identifier without reformatting the rest of the
//! expression.

use std::collections::BTreeMap;

use forecast_core::{Expression, SegmentMethod, Variable, VariableId};

use crate::error::ExprError;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

/// A token and its byte range in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Plus => "+".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Percent => "%".into(),
            TokenKind::LParen => "(".into(),
            TokenKind::RParen => ")".into(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token { kind, start: pos, end: pos + 1 });
            continue;
        }

        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut end = pos;
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_ascii_digit() || ch == '.' {
                    end = i + ch.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &input[pos..end];
            let value: f64 = text.parse().map_err(|_| ExprError::BadNumber(text.to_string()))?;
            tokens.push(Token { kind: TokenKind::Number(value), start: pos, end });
        } else if is_ident_start(c) {
            let mut end = pos;
            while let Some(&(i, ch)) = chars.peek() {
                if is_ident_char(ch) {
                    end = i + ch.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(input[pos..end].to_string()),
                start: pos,
                end,
            });
        } else {
            return Err(ExprError::UnexpectedChar { ch: c, pos });
        }
    }

    Ok(tokens)
}

// ============================================================================
// AST + parser
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Number(f64),
    Ident(String),
    Neg(Box<Ast>),
    Binary(BinOp, Box<Ast>, Box<Ast>),
}

impl Ast {
    /// Identifier names in source order (duplicates included).
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Ast::Number(_) => {}
            Ast::Ident(name) => out.push(name),
            Ast::Neg(inner) => inner.collect_identifiers(out),
            Ast::Binary(_, left, right) => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_expr(&mut self) -> Result<Ast, ExprError> {
        let mut left = self.parse_term()?;
        while let Some(tok) = self.peek() {
            let op = match tok.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Ast::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Ast, ExprError> {
        let mut left = self.parse_unary()?;
        while let Some(tok) = self.peek() {
            let op = match tok.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Ast::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Ast, ExprError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                Ok(Ast::Neg(Box::new(self.parse_unary()?)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Ast, ExprError> {
        let tok = self.next().ok_or(ExprError::UnexpectedEnd)?;
        match &tok.kind {
            TokenKind::Number(n) => Ok(Ast::Number(*n)),
            TokenKind::Ident(name) => Ok(Ast::Ident(name.clone())),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                match self.next() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(ExprError::UnexpectedToken {
                        token: other.describe(),
                        pos: other.start,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            _ => Err(ExprError::UnexpectedToken { token: tok.describe(), pos: tok.start }),
        }
    }
}

/// Parse expression text into an AST.
pub fn parse(input: &str) -> Result<Ast, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let ast = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(ExprError::UnexpectedToken { token: tok.describe(), pos: tok.start });
    }
    Ok(ast)
}

/// Parse `text` and bind every identifier to the variable with that title.
pub fn parse_expression(text: &str, variables: &[Variable]) -> Result<Expression, ExprError> {
    let text = text.trim();
    let ast = parse(text)?;
    let mut references = BTreeMap::new();
    for name in ast.identifiers() {
        let var = variables
            .iter()
            .find(|v| v.title == name)
            .ok_or_else(|| ExprError::UnknownName(name.to_string()))?;
        references.insert(name.to_string(), var.id.clone());
    }
    Ok(Expression::new(text, references))
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluate with `lookup` resolving identifiers. `None` if any identifier
/// has no value or the result is not finite.
pub fn evaluate(ast: &Ast, lookup: &mut dyn FnMut(&str) -> Option<f64>) -> Option<f64> {
    let value = match ast {
        Ast::Number(n) => *n,
        Ast::Ident(name) => lookup(name)?,
        Ast::Neg(inner) => -evaluate(inner, lookup)?,
        Ast::Binary(op, left, right) => {
            let l = evaluate(left, lookup)?;
            let r = evaluate(right, lookup)?;
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Rem => l % r,
            }
        }
    };
    value.is_finite().then_some(value)
}

// ============================================================================
// Rename repair
// ============================================================================

/// Rewrite identifiers bound to `id` so they read `new_title`.
///
/// Only identifier spans change; spacing, literals and parentheses are kept.
/// Returns `None` when no identifier needed rewriting.
pub fn rename_identifier(
    expr: &Expression,
    id: &VariableId,
    new_title: &str,
) -> Result<Option<String>, ExprError> {
    let tokens = tokenize(&expr.text)?;
    let mut out = String::with_capacity(expr.text.len());
    let mut cursor = 0;
    let mut changed = false;

    for tok in &tokens {
        if let TokenKind::Ident(name) = &tok.kind {
            if name != new_title && expr.reference_for(name) == Some(id) {
                out.push_str(&expr.text[cursor..tok.start]);
                out.push_str(new_title);
                cursor = tok.end;
                changed = true;
            }
        }
    }

    if !changed {
        return Ok(None);
    }
    out.push_str(&expr.text[cursor..]);
    Ok(Some(out))
}

/// Update expressions that still refer to `renamed` by an old title.
///
/// `variables` is the sheet's variable list with `renamed` already carrying
/// its new title. Returns the variables whose expression text changed, with
/// the rewritten expressions re-parsed against `variables`.
pub fn repair_references(variables: &[Variable], renamed: &Variable) -> Vec<Variable> {
    let mut changed = Vec::new();

    for var in variables {
        let mut updated = var.clone();
        let mut touched = false;

        for seg in &mut updated.time_segments {
            let SegmentMethod::Expression { expression } = &mut seg.method else {
                continue;
            };
            if !expression.references(&renamed.id) {
                continue;
            }
            let text = match rename_identifier(expression, &renamed.id, &renamed.title) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping unparsable expression in '{}': {}", var.title, e);
                    continue;
                }
            };
            match parse_expression(&text, variables) {
                Ok(reparsed) => {
                    *expression = reparsed;
                    touched = true;
                }
                Err(e) => {
                    log::warn!("Repaired expression '{}' in '{}' no longer parses: {}", text, var.title, e);
                }
            }
        }

        if touched {
            changed.push(updated);
        }
    }

    changed
}
