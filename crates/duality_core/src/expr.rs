//! The Core expression algebra.
//!
//! A Core expression is a tagged sum over thirteen variants. Polarity is a
//! syntactic attribute carried by maps, `both` connectives and the `end`
//! literals; it is never inferred. Sub-expressions are shared through
//! reference-counted handles ([`ExprRef`]): cloning a handle is the retain,
//! dropping it is the release. A recursion body refers to its binder via an
//! [`Unknown`] carrying the binder id, never via a handle to the enclosing
//! node, so the heap graph stays acyclic.

use std::fmt;
use std::sync::Arc;

use crate::ctx::Ctx;

/// A shared handle to a Core expression.
pub type ExprRef = Arc<Expr>;

/// Positive denotes introduction / supply; negative denotes elimination /
/// demand. `end(positive)` is the top `All`, `end(negative)` the bottom
/// `Nothing`; a positive `both` is an intersection, a negative one a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn flip(self) -> Polarity {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

/// A dependent map whose domain is a specific *value*, not a type.
///
/// At positive polarity this is the singleton function `{e1 ↦ e2}`; at
/// negative polarity it is the demand "consumes `e1`, yields `e2`".
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMap {
    pub e1: ExprRef,
    pub e2: ExprRef,
    pub polarity: Polarity,
    pub is_implicit: bool,
}

/// A dependent map whose domain is a type: positive is a universal
/// producer (function), negative an existential consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMap {
    pub arg_id: usize,
    pub arg_type: ExprRef,
    pub expr: ExprRef,
    pub polarity: Polarity,
    pub is_implicit: bool,
}

/// Application by value pattern: `expr ! e1 ~> e2`.
///
/// The `id` is the elimination's own identifier, used by the checker's
/// elim cache; it is distinct from any binder in the eliminand's type.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMapElim {
    pub id: usize,
    pub expr: ExprRef,
    pub map: ExprMap,
}

/// Application by type/binding pattern: `expr ! x [T] ~> body`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapElim {
    pub id: usize,
    pub expr: ExprRef,
    pub map: TypeMap,
}

/// Positive: intersection/pair. Negative: union/choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Both {
    pub e1: ExprRef,
    pub e2: ExprRef,
    pub polarity: Polarity,
}

/// Exception-like choice: try `first`; on failure, `second`.
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf {
    pub first: ExprRef,
    pub second: ExprRef,
}

/// A variable. Two unknowns are the same variable iff their ids match.
/// When `is_inference_var` is set, the variable participates in
/// constraint solving.
#[derive(Debug, Clone, PartialEq)]
pub struct Unknown {
    pub id: usize,
    pub ty: ExprRef,
    pub is_inference_var: bool,
}

/// Explicit existential scope for an inference variable.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceCtx {
    pub id: usize,
    pub ty: ExprRef,
    pub expr: ExprRef,
    pub polarity: Polarity,
}

/// μ-binder admitting self-reference through the binder id.
#[derive(Debug, Clone, PartialEq)]
pub struct Recursion {
    pub id: usize,
    pub ty: ExprRef,
    pub expr: ExprRef,
    pub polarity: Polarity,
}

/// A Core expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    ExprMap(ExprMap),
    TypeMap(TypeMap),
    ExprMapElim(ExprMapElim),
    TypeMapElim(TypeMapElim),
    Both(Both),
    OneOf(OneOf),
    Unknown(Unknown),
    End(Polarity),
    InferenceCtx(InferenceCtx),
    Recursion(Recursion),
    Str(String),
    StringType,
    Print,
}

impl Expr {
    /// Moves the expression into a shared handle.
    pub fn share(self) -> ExprRef {
        Arc::new(self)
    }
}

// Constructors. These keep the algorithm code free of `Arc::new` noise.

/// `All`, the unique top.
pub fn all() -> ExprRef {
    Expr::End(Polarity::Positive).share()
}

/// `Nothing`, the unique bottom.
pub fn nothing() -> ExprRef {
    Expr::End(Polarity::Negative).share()
}

/// A string literal value.
pub fn str_lit(s: impl Into<String>) -> ExprRef {
    Expr::Str(s.into()).share()
}

/// The singleton type of string literals.
pub fn string_type() -> ExprRef {
    Expr::StringType.share()
}

/// The built-in `String → String` printer.
pub fn print() -> ExprRef {
    Expr::Print.share()
}

pub fn unknown(id: usize, ty: ExprRef, is_inference_var: bool) -> ExprRef {
    Expr::Unknown(Unknown {
        id,
        ty,
        is_inference_var,
    })
    .share()
}

pub fn expr_map(e1: ExprRef, e2: ExprRef, polarity: Polarity, is_implicit: bool) -> ExprRef {
    Expr::ExprMap(ExprMap {
        e1,
        e2,
        polarity,
        is_implicit,
    })
    .share()
}

pub fn type_map(
    arg_id: usize,
    arg_type: ExprRef,
    expr: ExprRef,
    polarity: Polarity,
    is_implicit: bool,
) -> ExprRef {
    Expr::TypeMap(TypeMap {
        arg_id,
        arg_type,
        expr,
        polarity,
        is_implicit,
    })
    .share()
}

pub fn expr_map_elim(id: usize, expr: ExprRef, map: ExprMap) -> ExprRef {
    Expr::ExprMapElim(ExprMapElim { id, expr, map }).share()
}

pub fn type_map_elim(id: usize, expr: ExprRef, map: TypeMap) -> ExprRef {
    Expr::TypeMapElim(TypeMapElim { id, expr, map }).share()
}

pub fn both(e1: ExprRef, e2: ExprRef, polarity: Polarity) -> ExprRef {
    Expr::Both(Both { e1, e2, polarity }).share()
}

pub fn one_of(first: ExprRef, second: ExprRef) -> ExprRef {
    Expr::OneOf(OneOf { first, second }).share()
}

pub fn inference_ctx(id: usize, ty: ExprRef, expr: ExprRef, polarity: Polarity) -> ExprRef {
    Expr::InferenceCtx(InferenceCtx {
        id,
        ty,
        expr,
        polarity,
    })
    .share()
}

pub fn recursion(id: usize, ty: ExprRef, expr: ExprRef, polarity: Polarity) -> ExprRef {
    Expr::Recursion(Recursion {
        id,
        ty,
        expr,
        polarity,
    })
    .share()
}

/// Does the expression still have a reduction rule of its own?
///
/// Eliminations, `one_of` and recursion unfold; everything else is a
/// literal, a binder or a type and stands for itself.
pub fn is_computation(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::ExprMapElim(_)
            | Expr::TypeMapElim(_)
            | Expr::OneOf(_)
            | Expr::Recursion(_)
            | Expr::InferenceCtx(_)
    )
}

/// Negation of [`is_computation`].
pub fn is_value(expr: &Expr) -> bool {
    !is_computation(expr)
}

/// Does any *free* occurrence of `id` appear in `expr`?
///
/// Occurrences under a binder of the same id are shadowed and do not count.
pub fn is_bound(id: usize, expr: &Expr) -> bool {
    match expr {
        Expr::Unknown(u) => u.id == id || is_bound(id, &u.ty),
        Expr::ExprMap(m) => is_bound(id, &m.e1) || is_bound(id, &m.e2),
        Expr::TypeMap(t) => {
            is_bound(id, &t.arg_type) || (t.arg_id != id && is_bound(id, &t.expr))
        }
        Expr::ExprMapElim(e) => {
            is_bound(id, &e.expr) || is_bound(id, &e.map.e1) || is_bound(id, &e.map.e2)
        }
        Expr::TypeMapElim(e) => {
            is_bound(id, &e.expr)
                || is_bound(id, &e.map.arg_type)
                || (e.map.arg_id != id && is_bound(id, &e.map.expr))
        }
        Expr::Both(b) => is_bound(id, &b.e1) || is_bound(id, &b.e2),
        Expr::OneOf(o) => is_bound(id, &o.first) || is_bound(id, &o.second),
        Expr::InferenceCtx(c) => {
            is_bound(id, &c.ty) || (c.id != id && is_bound(id, &c.expr))
        }
        Expr::Recursion(r) => is_bound(id, &r.ty) || (r.id != id && is_bound(id, &r.expr)),
        Expr::End(_) | Expr::Str(_) | Expr::StringType | Expr::Print => false,
    }
}

/// Collects the ids of all free variables into `acc`.
pub fn free_ids(expr: &Expr, acc: &mut Vec<usize>) {
    fn walk(expr: &Expr, bound: &mut Vec<usize>, acc: &mut Vec<usize>) {
        match expr {
            Expr::Unknown(u) => {
                if !bound.contains(&u.id) && !acc.contains(&u.id) {
                    acc.push(u.id);
                }
                walk(&u.ty, bound, acc);
            }
            Expr::ExprMap(m) => {
                walk(&m.e1, bound, acc);
                walk(&m.e2, bound, acc);
            }
            Expr::TypeMap(t) => {
                walk(&t.arg_type, bound, acc);
                bound.push(t.arg_id);
                walk(&t.expr, bound, acc);
                bound.pop();
            }
            Expr::ExprMapElim(e) => {
                walk(&e.expr, bound, acc);
                walk(&e.map.e1, bound, acc);
                walk(&e.map.e2, bound, acc);
            }
            Expr::TypeMapElim(e) => {
                walk(&e.expr, bound, acc);
                walk(&e.map.arg_type, bound, acc);
                bound.push(e.map.arg_id);
                walk(&e.map.expr, bound, acc);
                bound.pop();
            }
            Expr::Both(b) => {
                walk(&b.e1, bound, acc);
                walk(&b.e2, bound, acc);
            }
            Expr::OneOf(o) => {
                walk(&o.first, bound, acc);
                walk(&o.second, bound, acc);
            }
            Expr::InferenceCtx(c) => {
                walk(&c.ty, bound, acc);
                bound.push(c.id);
                walk(&c.expr, bound, acc);
                bound.pop();
            }
            Expr::Recursion(r) => {
                walk(&r.ty, bound, acc);
                bound.push(r.id);
                walk(&r.expr, bound, acc);
                bound.pop();
            }
            Expr::End(_) | Expr::Str(_) | Expr::StringType | Expr::Print => {}
        }
    }
    walk(expr, &mut Vec::new(), acc);
}

/// Capture-avoiding substitution of `replacement` for free occurrences of
/// `id` in `expr`.
///
/// Only the evaluator calls this, on β-reduction. A binder matching `id`
/// shadows it; a binder that occurs free in `replacement` is renamed to a
/// fresh id first.
pub fn substitute(ctx: &mut Ctx, id: usize, replacement: &ExprRef, expr: &ExprRef) -> ExprRef {
    match expr.as_ref() {
        Expr::Unknown(u) => {
            if u.id == id {
                replacement.clone()
            } else {
                unknown(
                    u.id,
                    substitute(ctx, id, replacement, &u.ty),
                    u.is_inference_var,
                )
            }
        }
        Expr::ExprMap(m) => expr_map(
            substitute(ctx, id, replacement, &m.e1),
            substitute(ctx, id, replacement, &m.e2),
            m.polarity,
            m.is_implicit,
        ),
        Expr::TypeMap(t) => {
            let (arg_id, body) =
                subst_under_binder(ctx, id, replacement, t.arg_id, &t.arg_type, &t.expr);
            type_map(
                arg_id,
                substitute(ctx, id, replacement, &t.arg_type),
                body,
                t.polarity,
                t.is_implicit,
            )
        }
        Expr::ExprMapElim(e) => expr_map_elim(
            e.id,
            substitute(ctx, id, replacement, &e.expr),
            ExprMap {
                e1: substitute(ctx, id, replacement, &e.map.e1),
                e2: substitute(ctx, id, replacement, &e.map.e2),
                polarity: e.map.polarity,
                is_implicit: e.map.is_implicit,
            },
        ),
        Expr::TypeMapElim(e) => {
            let (arg_id, body) = subst_under_binder(
                ctx,
                id,
                replacement,
                e.map.arg_id,
                &e.map.arg_type,
                &e.map.expr,
            );
            type_map_elim(
                e.id,
                substitute(ctx, id, replacement, &e.expr),
                TypeMap {
                    arg_id,
                    arg_type: substitute(ctx, id, replacement, &e.map.arg_type),
                    expr: body,
                    polarity: e.map.polarity,
                    is_implicit: e.map.is_implicit,
                },
            )
        }
        Expr::Both(b) => both(
            substitute(ctx, id, replacement, &b.e1),
            substitute(ctx, id, replacement, &b.e2),
            b.polarity,
        ),
        Expr::OneOf(o) => one_of(
            substitute(ctx, id, replacement, &o.first),
            substitute(ctx, id, replacement, &o.second),
        ),
        Expr::InferenceCtx(c) => {
            let (ctx_id, body) = subst_under_binder(ctx, id, replacement, c.id, &c.ty, &c.expr);
            inference_ctx(
                ctx_id,
                substitute(ctx, id, replacement, &c.ty),
                body,
                c.polarity,
            )
        }
        Expr::Recursion(r) => {
            let (rec_id, body) = subst_under_binder(ctx, id, replacement, r.id, &r.ty, &r.expr);
            recursion(
                rec_id,
                substitute(ctx, id, replacement, &r.ty),
                body,
                r.polarity,
            )
        }
        Expr::End(_) | Expr::Str(_) | Expr::StringType | Expr::Print => expr.clone(),
    }
}

/// Substitutes inside the body of a binder, renaming the binder to a fresh
/// id when it would capture a free variable of the replacement. Renamed
/// occurrences keep the binder's declared type; the outer substitution
/// then reaches into that type like any other position.
fn subst_under_binder(
    ctx: &mut Ctx,
    id: usize,
    replacement: &ExprRef,
    binder: usize,
    binder_type: &ExprRef,
    body: &ExprRef,
) -> (usize, ExprRef) {
    if binder == id {
        // Shadowed: the substitution does not reach into the body.
        return (binder, body.clone());
    }
    if is_bound(binder, replacement) {
        let fresh = ctx.fresh_id();
        let fresh_var = unknown(fresh, binder_type.clone(), false);
        let renamed = substitute(ctx, binder, &fresh_var, body);
        (fresh, substitute(ctx, id, replacement, &renamed))
    } else {
        (binder, substitute(ctx, id, replacement, body))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::ExprMap(m) => {
                write!(f, "(")?;
                if m.is_implicit {
                    write!(f, "@")?;
                }
                write!(f, "{} {} {})", m.e1, arrow(m.polarity), m.e2)
            }
            Expr::TypeMap(t) => {
                write!(f, "(")?;
                if t.is_implicit {
                    write!(f, "@")?;
                }
                write!(
                    f,
                    "[{} {}] {} {})",
                    t.arg_id,
                    t.arg_type,
                    arrow(t.polarity),
                    t.expr
                )
            }
            Expr::InferenceCtx(c) => write!(
                f,
                "(?[{} {}] {} {})",
                c.id,
                c.ty,
                arrow(c.polarity),
                c.expr
            ),
            Expr::ExprMapElim(e) => {
                write!(f, "{} ! ", e.expr)?;
                if e.map.is_implicit {
                    write!(f, "@")?;
                }
                write!(f, "{} ~> {}", e.map.e1, e.map.e2)
            }
            Expr::TypeMapElim(e) => write!(
                f,
                "{} ! {} [{}] ~> {}",
                e.expr, e.map.arg_id, e.map.arg_type, e.map.expr
            ),
            Expr::Both(b) => {
                let op = match b.polarity {
                    Polarity::Positive => "and",
                    Polarity::Negative => "or",
                };
                write!(f, "{} {} {}", b.e1, op, b.e2)
            }
            Expr::OneOf(o) => write!(f, "{} else {}", o.first, o.second),
            Expr::Unknown(u) => {
                if u.is_inference_var {
                    write!(f, "?")?;
                }
                write!(f, "{}", u.id)
            }
            Expr::End(Polarity::Positive) => write!(f, "All"),
            Expr::End(Polarity::Negative) => write!(f, "Nothing"),
            Expr::Recursion(r) => write!(
                f,
                "(rec [{} {}] {} {})",
                r.id,
                r.ty,
                arrow(r.polarity),
                r.expr
            ),
            Expr::Str(s) => write!(f, "\"{}\"", s),
            Expr::StringType => write!(f, "String"),
            Expr::Print => write!(f, "print"),
        }
    }
}

fn arrow(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "->",
        Polarity::Negative => "~>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_positive_expr_map() {
        let map = expr_map(str_lit("s"), str_lit("s"), Polarity::Positive, false);
        assert_eq!(map.to_string(), "(\"s\" -> \"s\")");
    }

    #[test]
    fn display_expr_map_elim() {
        let target = expr_map(str_lit("s"), str_lit("s"), Polarity::Positive, false);
        let elim = expr_map_elim(
            0,
            target,
            ExprMap {
                e1: str_lit("s"),
                e2: string_type(),
                polarity: Polarity::Negative,
                is_implicit: false,
            },
        );
        assert_eq!(elim.to_string(), "(\"s\" -> \"s\") ! \"s\" ~> String");
    }

    #[test]
    fn display_ends_and_both() {
        assert_eq!(all().to_string(), "All");
        assert_eq!(nothing().to_string(), "Nothing");
        let pair = both(str_lit("a"), str_lit("b"), Polarity::Positive);
        assert_eq!(pair.to_string(), "\"a\" and \"b\"");
        let choice = both(str_lit("a"), str_lit("b"), Polarity::Negative);
        assert_eq!(choice.to_string(), "\"a\" or \"b\"");
    }

    #[test]
    fn display_one_of_and_type_map() {
        let t = one_of(str_lit("a"), str_lit("b"));
        assert_eq!(t.to_string(), "\"a\" else \"b\"");
        let tm = type_map(3, all(), unknown(3, all(), false), Polarity::Positive, false);
        assert_eq!(tm.to_string(), "([3 All] -> 3)");
    }

    #[test]
    fn is_bound_respects_shadowing() {
        let body = unknown(1, all(), false);
        let shadowing = type_map(1, all(), body.clone(), Polarity::Positive, false);
        assert!(!is_bound(1, &shadowing));
        let open = type_map(2, all(), body, Polarity::Positive, false);
        assert!(is_bound(1, &open));
    }

    #[test]
    fn substitute_replaces_free_occurrences() {
        let mut ctx = Ctx::new();
        let body = unknown(1, all(), false);
        let result = substitute(&mut ctx, 1, &str_lit("x"), &body);
        assert_eq!(result.to_string(), "\"x\"");
    }

    #[test]
    fn substitute_stops_at_shadowing_binder() {
        let mut ctx = Ctx::new();
        let inner = unknown(1, all(), false);
        let shadowing = type_map(1, all(), inner, Polarity::Positive, false);
        let result = substitute(&mut ctx, 1, &str_lit("x"), &shadowing);
        assert_eq!(result.to_string(), "([1 All] -> 1)");
    }

    #[test]
    fn substitute_avoids_capture() {
        let mut ctx = Ctx::with_running_id(10);
        // ([2 All] -> 1)[1 := 2] must not capture the binder 2.
        let body = type_map(2, all(), unknown(1, all(), false), Polarity::Positive, false);
        let replacement = unknown(2, all(), false);
        let result = substitute(&mut ctx, 1, &replacement, &body);
        match result.as_ref() {
            Expr::TypeMap(t) => {
                assert_ne!(t.arg_id, 2, "binder must be renamed");
                assert!(is_bound(2, &result), "free 2 must survive");
            }
            other => panic!("expected type map, got {}", other),
        }
    }

    #[test]
    fn renamed_binder_occurrences_keep_the_declared_type() {
        let mut ctx = Ctx::with_running_id(10);
        // ([2 String] -> 1 and 2)[1 := 2]: the binder is renamed; its
        // surviving occurrence must still carry String.
        let body = type_map(
            2,
            string_type(),
            both(
                unknown(1, all(), false),
                unknown(2, string_type(), false),
                Polarity::Positive,
            ),
            Polarity::Positive,
            false,
        );
        let replacement = unknown(2, all(), false);
        let result = substitute(&mut ctx, 1, &replacement, &body);
        match result.as_ref() {
            Expr::TypeMap(t) => match t.expr.as_ref() {
                Expr::Both(b) => match b.e2.as_ref() {
                    Expr::Unknown(u) => {
                        assert_eq!(u.id, t.arg_id, "occurrence must follow the rename");
                        assert!(
                            matches!(u.ty.as_ref(), Expr::StringType),
                            "occurrence type must stay String, got {}",
                            u.ty
                        );
                    }
                    other => panic!("expected the renamed binder use, got {}", other),
                },
                other => panic!("expected both, got {}", other),
            },
            other => panic!("expected type map, got {}", other),
        }
    }

    #[test]
    fn free_ids_ignores_bound_variables() {
        let body = both(
            unknown(1, all(), false),
            type_map(2, all(), unknown(2, all(), false), Polarity::Positive, false),
            Polarity::Positive,
        );
        let mut acc = Vec::new();
        free_ids(&body, &mut acc);
        assert_eq!(acc, vec![1]);
    }
}
