//! Backtracking recursive-descent parser for the surface syntax.
//!
//! The parser works directly on source bytes with saved-position
//! backtracking. Whitespace discipline matters: newlines separate
//! statements in `do`-blocks and elements in `{ … }` lists, so only
//! spaces and tabs are skipped between the tokens of one expression,
//! while bracketed positions skip freely across lines.
//!
//! Comments: `#` to end of line, `/#` … `#/` blocks.

use duality_base::{Span, SpannedError};

use crate::ast::{
    Arg, AstContext, AstExpr, AstExprKind, AstExprMap, AstRecursion, AstTypeMap, DoBlock,
};

const KEYWORDS: &[&str] = &[
    "list", "try", "let", "choice", "String", "All", "Nothing", "rec", "do",
];

/// Parses a whole source file: a `do`-block body without braces.
pub fn parse_file<'a>(
    source: &'a str,
    ast: AstContext<'a>,
) -> Result<&'a DoBlock<'a>, SpannedError> {
    let mut parser = Parser {
        source,
        pos: 0,
        ast,
    };
    parser.skip_whitespace();
    let block = parser
        .do_block_body()
        .ok_or_else(|| parser.error("expected an expression"))?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(block)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    ast: AstContext<'a>,
}

impl<'a> Parser<'a> {
    // ------------------------------------------------------------------
    // Character-level helpers
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: &str) -> SpannedError {
        SpannedError::new(message, Span::new(self.pos, self.pos.min(self.source.len()) + 1))
    }

    /// Consumes `s` exactly, or leaves the position untouched.
    fn literal(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consumes a keyword: the literal must not be followed by a
    /// variable character.
    fn keyword(&mut self, s: &str) -> bool {
        let start = self.pos;
        if !self.literal(s) {
            return false;
        }
        if self.peek().is_some_and(is_variable_char) {
            self.pos = start;
            return false;
        }
        true
    }

    /// Skips spaces, tabs, newlines and comments.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => self.pos += 1,
                _ => {
                    if !self.skip_comment() {
                        return;
                    }
                }
            }
        }
    }

    /// Skips spaces, tabs and block comments, but stops at a newline:
    /// newlines are statement and list separators.
    fn skip_inline_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') => self.pos += 1,
                _ => {
                    if self.rest().starts_with("/#") {
                        if !self.skip_comment() {
                            return;
                        }
                    } else {
                        return;
                    }
                }
            }
        }
    }

    fn skip_comment(&mut self) -> bool {
        if self.literal("/#") {
            while !self.at_end() {
                if self.literal("#/") {
                    return true;
                }
                self.pos += 1;
            }
            return true;
        }
        if self.peek() == Some(b'#') {
            while let Some(c) = self.peek() {
                if c == b'\n' {
                    break;
                }
                self.pos += 1;
            }
            return true;
        }
        false
    }

    fn alloc(&self, start: usize, kind: AstExprKind<'a>) -> &'a AstExpr<'a> {
        self.ast.exprs.alloc(AstExpr {
            span: Span::new(start, self.pos),
            kind,
        })
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    fn variable(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_lowercase() => self.pos += 1,
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if !is_variable_char(c) {
                break;
            }
            // Leave "->" and "~>" for the infix level.
            if c == b'-' && self.source.as_bytes().get(self.pos + 1) == Some(&b'>') {
                break;
            }
            self.pos += 1;
        }
        let name = &self.source[start..self.pos];
        if KEYWORDS.contains(&name) {
            self.pos = start;
            return None;
        }
        Some(name)
    }

    fn string_lit(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if !self.literal("\"") {
            return None;
        }
        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'"' {
                let content = &self.source[content_start..self.pos];
                self.pos += 1;
                return Some(content);
            }
            self.pos += 1;
        }
        self.pos = start;
        None
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Full expression: the elimination level, loosest of the three.
    fn expr(&mut self) -> Option<&'a AstExpr<'a>> {
        let start = self.pos;
        let mut left = self.arrow_expr()?;
        loop {
            let before = self.pos;
            self.skip_inline_whitespace();
            if !self.literal("!") {
                self.pos = before;
                return Some(left);
            }
            self.skip_inline_whitespace();
            let Some(right) = self.arrow_expr() else {
                self.pos = before;
                return Some(left);
            };
            match &right.kind {
                AstExprKind::NegativeExprMap(map) => {
                    left = self.alloc(
                        start,
                        AstExprKind::ExprMapElim {
                            expr: left,
                            map: *map,
                        },
                    );
                }
                AstExprKind::NegativeTypeMap(map) => {
                    left = self.alloc(
                        start,
                        AstExprKind::TypeMapElim {
                            expr: left,
                            map: *map,
                        },
                    );
                }
                _ => {
                    // An elimination needs a negative map on its right.
                    self.pos = before;
                    return Some(left);
                }
            }
        }
    }

    /// The arrow level, right-associative.
    fn arrow_expr(&mut self) -> Option<&'a AstExpr<'a>> {
        let start = self.pos;
        let left = self.juxt_expr()?;
        let before = self.pos;
        self.skip_inline_whitespace();
        let (negative, implicit) = if self.literal("@->") {
            (false, true)
        } else if self.literal("@~>") {
            (true, true)
        } else if self.literal("->") {
            (false, false)
        } else if self.literal("~>") {
            (true, false)
        } else {
            self.pos = before;
            return Some(left);
        };
        self.skip_whitespace();
        let Some(right) = self.arrow_expr() else {
            self.pos = before;
            return Some(left);
        };
        let map = AstExprMap {
            e1: left,
            e2: right,
            is_implicit: implicit,
        };
        let kind = if negative {
            AstExprKind::NegativeExprMap(map)
        } else {
            AstExprKind::PositiveExprMap(map)
        };
        Some(self.alloc(start, kind))
    }

    /// Juxtaposition (application), left-associative and tightest.
    fn juxt_expr(&mut self) -> Option<&'a AstExpr<'a>> {
        let start = self.pos;
        let mut left = self.atom()?;
        loop {
            let before = self.pos;
            self.skip_inline_whitespace();
            let Some(right) = self.atom() else {
                self.pos = before;
                return Some(left);
            };
            left = self.alloc(start, AstExprKind::Juxtaposition { left, right });
        }
    }

    fn atom(&mut self) -> Option<&'a AstExpr<'a>> {
        let start = self.pos;

        if let Some(tm) = self.type_map(false) {
            return Some(self.alloc(start, tm));
        }
        if self.literal("@") {
            if let Some(tm) = self.type_map(true) {
                return Some(self.alloc(start, tm));
            }
            self.pos = start;
        }
        if let Some(rec) = self.recursion() {
            return Some(self.alloc(start, rec));
        }
        if let Some(kind) = self.compound("list") {
            return Some(self.alloc(start, AstExprKind::List(kind)));
        }
        if let Some(kind) = self.compound("choice") {
            return Some(self.alloc(start, AstExprKind::Choice(kind)));
        }
        if let Some(kind) = self.compound("try") {
            return Some(self.alloc(start, AstExprKind::TryBlock(kind)));
        }
        if let Some(block) = self.do_block() {
            return Some(self.alloc(start, AstExprKind::DoBlock(block)));
        }
        if self.literal("(") {
            self.skip_whitespace();
            let expr = self.expr();
            self.skip_whitespace();
            if expr.is_some() && self.literal(")") {
                return expr;
            }
            self.pos = start;
            return None;
        }
        if self.keyword("All") {
            return Some(self.alloc(start, AstExprKind::All));
        }
        if self.keyword("Nothing") {
            return Some(self.alloc(start, AstExprKind::Nothing));
        }
        if self.keyword("String") {
            return Some(self.alloc(start, AstExprKind::TypeString));
        }
        if let Some(name) = self.variable() {
            return Some(self.alloc(start, AstExprKind::Variable(name)));
        }
        if let Some(s) = self.string_lit() {
            return Some(self.alloc(start, AstExprKind::StringLit(s)));
        }
        None
    }

    /// `[x T] -> e` / `[x T] ~> e`; the leading `@` is consumed by the
    /// caller for the implicit forms.
    fn type_map(&mut self, implicit: bool) -> Option<AstExprKind<'a>> {
        let start = self.pos;
        let arg = self.arg()?;
        self.skip_whitespace();
        let negative = if self.literal("->") {
            false
        } else if self.literal("~>") {
            true
        } else {
            self.pos = start;
            return None;
        };
        self.skip_whitespace();
        let Some(expr) = self.expr() else {
            self.pos = start;
            return None;
        };
        let map = AstTypeMap {
            arg,
            expr,
            is_implicit: implicit,
        };
        Some(if negative {
            AstExprKind::NegativeTypeMap(map)
        } else {
            AstExprKind::PositiveTypeMap(map)
        })
    }

    fn recursion(&mut self) -> Option<AstExprKind<'a>> {
        let start = self.pos;
        if !self.keyword("rec") {
            return None;
        }
        self.skip_whitespace();
        let Some(arg) = self.arg() else {
            self.pos = start;
            return None;
        };
        self.skip_whitespace();
        let negative = if self.literal("->") {
            false
        } else if self.literal("~>") {
            true
        } else {
            self.pos = start;
            return None;
        };
        self.skip_whitespace();
        let Some(expr) = self.expr() else {
            self.pos = start;
            return None;
        };
        let rec = AstRecursion { arg, expr };
        Some(if negative {
            AstExprKind::NegativeRecursion(rec)
        } else {
            AstExprKind::PositiveRecursion(rec)
        })
    }

    /// `[name type]`, `[_ type]`, `[name]`, `[]`.
    fn arg(&mut self) -> Option<Arg<'a>> {
        let start = self.pos;
        if !self.literal("[") {
            return None;
        }
        self.skip_whitespace();
        if self.literal("]") {
            return Some(Arg {
                name: None,
                ty: None,
            });
        }
        let name = if self.literal("_") {
            None
        } else {
            match self.variable() {
                Some(name) => Some(name),
                None => {
                    self.pos = start;
                    return None;
                }
            }
        };
        self.skip_whitespace();
        let ty = self.expr();
        self.skip_whitespace();
        if !self.literal("]") {
            self.pos = start;
            return None;
        }
        Some(Arg { name, ty })
    }

    /// `list { … }`, `choice { … }`, `try { … }` with comma or newline
    /// separated elements.
    fn compound(&mut self, kw: &str) -> Option<Vec<&'a AstExpr<'a>>> {
        let start = self.pos;
        if !self.keyword(kw) {
            return None;
        }
        self.skip_whitespace();
        if !self.literal("{") {
            self.pos = start;
            return None;
        }
        self.skip_whitespace();
        let mut elements = Vec::new();
        loop {
            let Some(e) = self.expr() else {
                self.pos = start;
                return None;
            };
            elements.push(e);
            self.skip_inline_whitespace();
            if self.literal("}") {
                return Some(elements);
            }
            if self.literal(",") || self.literal("\r\n") || self.literal("\n") {
                self.skip_whitespace();
                if self.literal("}") {
                    return Some(elements);
                }
                continue;
            }
            self.pos = start;
            return None;
        }
    }

    fn do_block(&mut self) -> Option<&'a DoBlock<'a>> {
        let start = self.pos;
        if !self.keyword("do") {
            return None;
        }
        self.skip_whitespace();
        if !self.literal("{") {
            self.pos = start;
            return None;
        }
        self.skip_whitespace();
        let Some(body) = self.do_block_body() else {
            self.pos = start;
            return None;
        };
        self.skip_whitespace();
        if !self.literal("}") {
            self.pos = start;
            return None;
        }
        Some(body)
    }

    fn do_block_body(&mut self) -> Option<&'a DoBlock<'a>> {
        if let Some(block) = self.do_block_let() {
            return Some(block);
        }
        if let Some(block) = self.do_block_equality() {
            return Some(block);
        }
        // An expression: either followed by more statements, or the end.
        let start = self.pos;
        let expr = self.expr()?;
        if self.statement_separator() {
            if let Some(rest) = self.do_block_body() {
                return Some(self.ast.blocks.alloc(DoBlock::Ignored { expr, rest }));
            }
        }
        self.pos = start;
        let expr = self.expr()?;
        Some(self.ast.blocks.alloc(DoBlock::EndExpr(expr)))
    }

    fn do_block_let(&mut self) -> Option<&'a DoBlock<'a>> {
        let start = self.pos;
        if !self.keyword("let") {
            return None;
        }
        self.skip_inline_whitespace();
        let Some(name) = self.variable() else {
            self.pos = start;
            return None;
        };
        self.skip_inline_whitespace();
        if !self.literal("=") {
            self.pos = start;
            return None;
        }
        self.skip_inline_whitespace();
        let Some(expr) = self.expr() else {
            self.pos = start;
            return None;
        };
        if !self.statement_separator() {
            self.pos = start;
            return None;
        }
        let Some(rest) = self.do_block_body() else {
            self.pos = start;
            return None;
        };
        Some(self.ast.blocks.alloc(DoBlock::Let { name, expr, rest }))
    }

    fn do_block_equality(&mut self) -> Option<&'a DoBlock<'a>> {
        let start = self.pos;
        let e1 = self.expr()?;
        self.skip_inline_whitespace();
        if !self.literal("=") {
            self.pos = start;
            return None;
        }
        self.skip_inline_whitespace();
        let Some(e2) = self.expr() else {
            self.pos = start;
            return None;
        };
        if !self.statement_separator() {
            self.pos = start;
            return None;
        }
        let Some(rest) = self.do_block_body() else {
            self.pos = start;
            return None;
        };
        Some(self.ast.blocks.alloc(DoBlock::Equality { e1, e2, rest }))
    }

    /// `;` or a newline, then any amount of whitespace.
    fn statement_separator(&mut self) -> bool {
        let start = self.pos;
        self.skip_inline_whitespace();
        if self.literal(";") || self.literal("\r\n") || self.literal("\n") {
            self.skip_whitespace();
            true
        } else {
            self.pos = start;
            false
        }
    }
}

fn is_variable_char(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == b'-' || c == b'?'
}
