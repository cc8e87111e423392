//! Small-step normalisation.
//!
//! Call-by-value in the argument of an elimination, normal-order on the
//! outer reduction. The verdict is three-valued: `Yes` with the value,
//! `No` when a redex definitely cannot fire (an exact-match failure, an
//! argument outside the demanded type), or `Maybe` when reduction is
//! blocked on something only the solver could pin down — the expression
//! is then returned in its partially reduced, symbolic form.
//!
//! Recursion unfolds only when immediately consumed, and only when its
//! body head can make progress. On top of that guard a per-run unfolding
//! budget keeps degenerate self-consuming binders from looping; an
//! exhausted budget leaves the elimination symbolic.

use crate::ctx::Ctx;
use crate::equality::are_equal;
use crate::expr::{
    both, expr_map_elim, substitute, type_map_elim, Expr, ExprMap, ExprMapElim, ExprRef,
    Polarity, TypeMapElim,
};
use crate::subtype::{is_subtype_no_transformation, unfold_guarded};
use crate::ternary::Ternary;
use crate::type_of::type_of;

/// Total recursion unfoldings allowed per evaluation run.
const UNFOLD_FUEL: u32 = 64;

/// Normalises an expression to a value.
pub fn eval(ctx: &mut Ctx, expr: &ExprRef) -> (Ternary, ExprRef) {
    let mut fuel = UNFOLD_FUEL;
    eval_in(ctx, expr, &mut fuel)
}

fn eval_in(ctx: &mut Ctx, expr: &ExprRef, fuel: &mut u32) -> (Ternary, ExprRef) {
    match expr.as_ref() {
        // Values stand for themselves.
        Expr::End(_)
        | Expr::Unknown(_)
        | Expr::Str(_)
        | Expr::StringType
        | Expr::Print
        | Expr::ExprMap(_)
        | Expr::TypeMap(_)
        | Expr::Recursion(_) => (Ternary::Yes, expr.clone()),

        // Pairs and choices evaluate their components.
        Expr::Both(b) => {
            let (t1, e1) = eval_in(ctx, &b.e1, fuel);
            if t1 == Ternary::No {
                return (Ternary::No, expr.clone());
            }
            let (t2, e2) = eval_in(ctx, &b.e2, fuel);
            if t2 == Ternary::No {
                return (Ternary::No, expr.clone());
            }
            (t1.conjunction(t2), both(e1, e2, b.polarity))
        }

        Expr::OneOf(o) => {
            let (t1, v1) = eval_in(ctx, &o.first, fuel);
            match t1 {
                Ternary::Yes => (Ternary::Yes, v1),
                Ternary::No => eval_in(ctx, &o.second, fuel),
                Ternary::Maybe => (Ternary::Maybe, expr.clone()),
            }
        }

        // The checker either solves an inference scope away or leaves it
        // because nothing pinned the variable; then we cannot decide.
        Expr::InferenceCtx(_) => (Ternary::Maybe, expr.clone()),

        Expr::ExprMapElim(e) => eval_expr_map_elim(ctx, e, expr, fuel),

        Expr::TypeMapElim(e) => eval_type_map_elim(ctx, e, expr, fuel),
    }
}

fn eval_expr_map_elim(
    ctx: &mut Ctx,
    elim: &ExprMapElim,
    original: &ExprRef,
    fuel: &mut u32,
) -> (Ternary, ExprRef) {
    let (tt, target) = eval_in(ctx, &elim.expr, fuel);
    if tt == Ternary::No {
        return (Ternary::No, original.clone());
    }
    // Strict in the argument.
    let (ta, arg) = eval_in(ctx, &elim.map.e1, fuel);
    if ta == Ternary::No {
        return (Ternary::No, original.clone());
    }
    if tt == Ternary::Maybe || ta == Ternary::Maybe {
        return (Ternary::Maybe, residual_expr_elim(elim, target, arg));
    }
    apply(ctx, &target, &arg, elim, original, fuel)
}

/// Dispatches an elimination on the evaluated target.
fn apply(
    ctx: &mut Ctx,
    target: &ExprRef,
    arg: &ExprRef,
    elim: &ExprMapElim,
    original: &ExprRef,
    fuel: &mut u32,
) -> (Ternary, ExprRef) {
    match target.as_ref() {
        // A singleton function fires on an exact value match.
        Expr::ExprMap(m) if m.polarity == Polarity::Positive => match are_equal(arg, &m.e1) {
            Ternary::Yes => eval_in(ctx, &m.e2, fuel),
            Ternary::No => (Ternary::No, original.clone()),
            Ternary::Maybe => (
                Ternary::Maybe,
                residual_expr_elim(elim, target.clone(), arg.clone()),
            ),
        },

        // A universal producer takes any argument of its domain type.
        Expr::TypeMap(t) if t.polarity == Polarity::Positive => {
            let arg_type = type_of(ctx, arg);
            let (verdict, _) = is_subtype_no_transformation(ctx, &arg_type, &t.arg_type);
            match verdict {
                Ternary::No => (Ternary::No, original.clone()),
                Ternary::Maybe => (
                    Ternary::Maybe,
                    residual_expr_elim(elim, target.clone(), arg.clone()),
                ),
                Ternary::Yes => {
                    let body = substitute(ctx, t.arg_id, arg, &t.expr);
                    eval_in(ctx, &body, fuel)
                }
            }
        }

        // A pair eliminates through whichever component accepts.
        Expr::Both(b) if b.polarity == Polarity::Positive => {
            let (v1, r1) = apply(ctx, &b.e1, arg, elim, original, fuel);
            if v1 == Ternary::Yes {
                return (Ternary::Yes, r1);
            }
            let (v2, r2) = apply(ctx, &b.e2, arg, elim, original, fuel);
            if v2 == Ternary::Yes {
                return (Ternary::Yes, r2);
            }
            if v1 == Ternary::No && v2 == Ternary::No {
                (Ternary::No, original.clone())
            } else {
                (
                    Ternary::Maybe,
                    residual_expr_elim(elim, target.clone(), arg.clone()),
                )
            }
        }

        Expr::Print => match arg.as_ref() {
            Expr::Str(s) => {
                ctx.write_line(s);
                (Ternary::Yes, arg.clone())
            }
            Expr::Unknown(_) => (
                Ternary::Maybe,
                residual_expr_elim(elim, target.clone(), arg.clone()),
            ),
            _ => (Ternary::No, original.clone()),
        },

        // Unfold a μ-binder once, but only when the unfolding is
        // immediately consumed here and the body can make progress.
        Expr::Recursion(r) => {
            if *fuel == 0 {
                return (
                    Ternary::Maybe,
                    residual_expr_elim(elim, target.clone(), arg.clone()),
                );
            }
            *fuel -= 1;
            match unfold_guarded(ctx, r, target) {
                Some(unfolded) => {
                    let (tv, unfolded_value) = eval_in(ctx, &unfolded, fuel);
                    if tv == Ternary::No {
                        return (Ternary::No, original.clone());
                    }
                    if tv == Ternary::Maybe {
                        return (
                            Ternary::Maybe,
                            residual_expr_elim(elim, unfolded_value, arg.clone()),
                        );
                    }
                    apply(ctx, &unfolded_value, arg, elim, original, fuel)
                }
                None => (
                    Ternary::Maybe,
                    residual_expr_elim(elim, target.clone(), arg.clone()),
                ),
            }
        }

        Expr::Unknown(_) => (
            Ternary::Maybe,
            residual_expr_elim(elim, target.clone(), arg.clone()),
        ),

        _ => (Ternary::No, original.clone()),
    }
}

fn eval_type_map_elim(
    ctx: &mut Ctx,
    elim: &TypeMapElim,
    original: &ExprRef,
    fuel: &mut u32,
) -> (Ternary, ExprRef) {
    let (tt, target) = eval_in(ctx, &elim.expr, fuel);
    if tt == Ternary::No {
        return (Ternary::No, original.clone());
    }
    if tt == Ternary::Maybe {
        return (
            Ternary::Maybe,
            type_map_elim(elim.id, target, elim.map.clone()),
        );
    }
    // The consumed value must inhabit the binder's type.
    let target_type = type_of(ctx, &target);
    let (verdict, _) = is_subtype_no_transformation(ctx, &target_type, &elim.map.arg_type);
    match verdict {
        Ternary::No => (Ternary::No, original.clone()),
        Ternary::Maybe => (
            Ternary::Maybe,
            type_map_elim(elim.id, target, elim.map.clone()),
        ),
        Ternary::Yes => {
            let body = substitute(ctx, elim.map.arg_id, &target, &elim.map.expr);
            eval_in(ctx, &body, fuel)
        }
    }
}

/// The symbolic residual of a blocked elimination.
fn residual_expr_elim(elim: &ExprMapElim, target: ExprRef, arg: ExprRef) -> ExprRef {
    expr_map_elim(
        elim.id,
        target,
        ExprMap {
            e1: arg,
            e2: elim.map.e2.clone(),
            polarity: elim.map.polarity,
            is_implicit: elim.map.is_implicit,
        },
    )
}
