//! Abstract syntax for the surface language.
//!
//! AST nodes are arena-allocated; the `'a` lifetime tracks the arenas'
//! scope. Every expression carries the byte span it was parsed from,
//! which elaboration forwards into the text-range map.

use duality_base::{Arena, Span};

/// The arenas AST nodes are allocated from.
///
/// `Copy` so the parser can thread it freely.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    pub exprs: &'a Arena<AstExpr<'a>>,
    pub blocks: &'a Arena<DoBlock<'a>>,
}

impl<'a> AstContext<'a> {
    pub fn new(exprs: &'a Arena<AstExpr<'a>>, blocks: &'a Arena<DoBlock<'a>>) -> Self {
        AstContext { exprs, blocks }
    }
}

/// A binder argument `[name type]`; both parts are optional (`[_ T]`,
/// `[x]`, `[]`).
#[derive(Clone, Copy)]
pub struct Arg<'a> {
    pub name: Option<&'a str>,
    pub ty: Option<&'a AstExpr<'a>>,
}

/// A map between two expressions, `e1 -> e2` or `e1 ~> e2`.
#[derive(Clone, Copy)]
pub struct AstExprMap<'a> {
    pub e1: &'a AstExpr<'a>,
    pub e2: &'a AstExpr<'a>,
    pub is_implicit: bool,
}

/// A binder map, `[x T] -> e` or `[x T] ~> e`.
#[derive(Clone, Copy)]
pub struct AstTypeMap<'a> {
    pub arg: Arg<'a>,
    pub expr: &'a AstExpr<'a>,
    pub is_implicit: bool,
}

/// `rec [x T] -> e` or `rec [x T] ~> e`.
#[derive(Clone, Copy)]
pub struct AstRecursion<'a> {
    pub arg: Arg<'a>,
    pub expr: &'a AstExpr<'a>,
}

/// One statement layer of a `do`-block.
pub enum DoBlock<'a> {
    /// The block's final expression.
    EndExpr(&'a AstExpr<'a>),
    /// `let x = e` followed by the rest of the block.
    Let {
        name: &'a str,
        expr: &'a AstExpr<'a>,
        rest: &'a DoBlock<'a>,
    },
    /// `e1 = e2`, an equality assertion, followed by the rest.
    Equality {
        e1: &'a AstExpr<'a>,
        e2: &'a AstExpr<'a>,
        rest: &'a DoBlock<'a>,
    },
    /// An expression evaluated for its effect, followed by the rest.
    Ignored {
        expr: &'a AstExpr<'a>,
        rest: &'a DoBlock<'a>,
    },
}

pub enum AstExprKind<'a> {
    Variable(&'a str),
    StringLit(&'a str),
    TypeString,
    All,
    Nothing,
    PositiveExprMap(AstExprMap<'a>),
    NegativeExprMap(AstExprMap<'a>),
    PositiveTypeMap(AstTypeMap<'a>),
    NegativeTypeMap(AstTypeMap<'a>),
    ExprMapElim {
        expr: &'a AstExpr<'a>,
        map: AstExprMap<'a>,
    },
    TypeMapElim {
        expr: &'a AstExpr<'a>,
        map: AstTypeMap<'a>,
    },
    List(Vec<&'a AstExpr<'a>>),
    Choice(Vec<&'a AstExpr<'a>>),
    TryBlock(Vec<&'a AstExpr<'a>>),
    DoBlock(&'a DoBlock<'a>),
    Juxtaposition {
        left: &'a AstExpr<'a>,
        right: &'a AstExpr<'a>,
    },
    PositiveRecursion(AstRecursion<'a>),
    NegativeRecursion(AstRecursion<'a>),
}

/// A surface expression with its source span.
pub struct AstExpr<'a> {
    pub span: Span,
    pub kind: AstExprKind<'a>,
}
