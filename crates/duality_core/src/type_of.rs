//! Syntactic type synthesis.
//!
//! `type_of` is total on well-formed Core: it computes the type of an
//! expression without checking it. Synthesised types always come out at
//! positive polarity. `inference_ctx` has no synthesised type; the
//! elaborator guarantees it never sits in a synthesisable position.

use crate::ctx::Ctx;
use crate::expr::{
    all, is_bound, is_computation, string_type, Both, Expr, ExprMap, ExprRef, Polarity,
    Recursion, TypeMap,
};

/// Computes the type of a well-formed expression.
pub fn type_of(ctx: &mut Ctx, expr: &ExprRef) -> ExprRef {
    match expr.as_ref() {
        Expr::ExprMap(m) => {
            if is_computation(&m.e1) {
                // The domain is still reducible; generalise over it.
                Expr::TypeMap(TypeMap {
                    arg_id: ctx.fresh_id(),
                    arg_type: type_of(ctx, &m.e1),
                    expr: type_of(ctx, &m.e2),
                    polarity: Polarity::Positive,
                    is_implicit: m.is_implicit,
                })
                .share()
            } else {
                Expr::ExprMap(ExprMap {
                    e1: m.e1.clone(),
                    e2: type_of(ctx, &m.e2),
                    polarity: Polarity::Positive,
                    is_implicit: m.is_implicit,
                })
                .share()
            }
        }
        Expr::TypeMap(t) => Expr::TypeMap(TypeMap {
            arg_id: t.arg_id,
            arg_type: t.arg_type.clone(),
            expr: type_of(ctx, &t.expr),
            polarity: Polarity::Positive,
            is_implicit: t.is_implicit,
        })
        .share(),
        Expr::ExprMapElim(e) => e.map.e2.clone(),
        Expr::TypeMapElim(e) => e.map.expr.clone(),
        Expr::Both(b) => Expr::Both(Both {
            e1: type_of(ctx, &b.e1),
            e2: type_of(ctx, &b.e2),
            polarity: Polarity::Positive,
        })
        .share(),
        Expr::OneOf(o) => Expr::Both(Both {
            e1: type_of(ctx, &o.first),
            e2: type_of(ctx, &o.second),
            polarity: Polarity::Negative,
        })
        .share(),
        Expr::Unknown(u) => u.ty.clone(),
        Expr::InferenceCtx(_) => {
            // Invariant: never reached on elaborator output.
            debug_assert!(false, "type_of on inference ctx");
            all()
        }
        Expr::Recursion(r) => {
            let body_type = type_of(ctx, &r.expr);
            if is_bound(r.id, &body_type) {
                Expr::Recursion(Recursion {
                    id: r.id,
                    ty: r.ty.clone(),
                    expr: body_type,
                    polarity: Polarity::Positive,
                })
                .share()
            } else {
                body_type
            }
        }
        Expr::Str(_) => string_type(),
        Expr::End(_) | Expr::StringType => all(),
        Expr::Print => Expr::TypeMap(TypeMap {
            arg_id: ctx.fresh_id(),
            arg_type: string_type(),
            expr: string_type(),
            polarity: Polarity::Positive,
            is_implicit: false,
        })
        .share(),
    }
}
