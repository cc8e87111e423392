//! The bidirectional checker.
//!
//! A single top-down pass. Introductions are checked recursively and
//! their constraints threaded with the polarity of the node; at every
//! elimination the target's type is synthesised and driven against the
//! shape the elimination demands, substituting the coerced target back
//! in. `inference_ctx` scopes are solved here: the collected range either
//! pins the variable (which is then substituted away), is unsatisfiable
//! (fatal), or stays open (the binder is kept).
//!
//! Failures are fatal at the point of detection; a failing check returns
//! no expression at all.

use crate::constraint::{collect, Constraint};
use crate::ctx::Ctx;
use crate::equality::are_equal;
use crate::error::{CoreError, CoreResult};
use crate::expr::{
    expr_map, expr_map_elim, free_ids, inference_ctx, one_of, recursion, substitute, type_map,
    type_map_elim, both, Expr, ExprMap, ExprRef, InferenceCtx as InferenceCtxNode, Polarity,
    TypeMap,
};
use crate::subtype::{is_subtype, is_subtype_no_transformation};
use crate::ternary::Ternary;
use crate::type_of::type_of;

/// Checks an expression, returning its (possibly coerced) form and the
/// constraint it imposes on inference variables still in scope.
pub fn check(ctx: &mut Ctx, expr: &ExprRef) -> CoreResult<(ExprRef, Option<Constraint>)> {
    match expr.as_ref() {
        Expr::Unknown(_) | Expr::End(_) | Expr::Str(_) | Expr::StringType | Expr::Print => {
            Ok((expr.clone(), None))
        }

        Expr::ExprMap(m) => {
            let (e1, c1) = check(ctx, &m.e1)?;
            let (e2, c2) = check(ctx, &m.e2)?;
            Ok((
                expr_map(e1, e2, m.polarity, m.is_implicit),
                Constraint::conjoin(c1, c2, Polarity::Positive),
            ))
        }

        Expr::TypeMap(t) => {
            let (arg_type, c1) = check(ctx, &t.arg_type)?;
            let depth = ctx.push_binder(t.arg_id, arg_type.clone());
            let body = check(ctx, &t.expr);
            ctx.truncate_binders(depth);
            let (body, c2) = body?;
            Ok((
                type_map(t.arg_id, arg_type, body, t.polarity, t.is_implicit),
                Constraint::conjoin(c1, c2, Polarity::Positive),
            ))
        }

        Expr::ExprMapElim(e) => {
            let (target, c1) = check(ctx, &e.expr)?;
            let (e1, c2) = check(ctx, &e.map.e1)?;
            let (e2, c3) = check(ctx, &e.map.e2)?;
            let map = ExprMap {
                e1,
                e2,
                polarity: Polarity::Negative,
                is_implicit: e.map.is_implicit,
            };
            let pre = Constraint::conjoin(
                Constraint::conjoin(c1, c2, Polarity::Positive),
                c3,
                Polarity::Positive,
            );

            if ctx.successful_elims.contains(&e.id) {
                return Ok((expr_map_elim(e.id, target, map), pre));
            }

            let target_type = type_of(ctx, &target);
            let demand = Expr::ExprMap(map.clone()).share();
            let out = is_subtype(ctx, &target_type, &demand, &target);
            match out.verdict {
                Ternary::No => Err(CoreError::NotASubtype {
                    subtype: target_type,
                    supertype: demand,
                }),
                verdict => {
                    if verdict == Ternary::Yes {
                        ctx.successful_elims.insert(e.id);
                    }
                    Ok((
                        expr_map_elim(e.id, out.coerced, map),
                        Constraint::conjoin(pre, out.constraint, Polarity::Positive),
                    ))
                }
            }
        }

        Expr::TypeMapElim(e) => {
            let (target, c1) = check(ctx, &e.expr)?;
            let (arg_type, c2) = check(ctx, &e.map.arg_type)?;
            let depth = ctx.push_binder(e.map.arg_id, arg_type.clone());
            let body = check(ctx, &e.map.expr);
            ctx.truncate_binders(depth);
            let (body, c3) = body?;
            let map = TypeMap {
                arg_id: e.map.arg_id,
                arg_type: arg_type.clone(),
                expr: body,
                polarity: Polarity::Negative,
                is_implicit: e.map.is_implicit,
            };
            let pre = Constraint::conjoin(
                Constraint::conjoin(c1, c2, Polarity::Positive),
                c3,
                Polarity::Positive,
            );

            if ctx.successful_elims.contains(&e.id) {
                return Ok((type_map_elim(e.id, target, map), pre));
            }

            // The consumed value's type must fit the binder's type.
            let target_type = type_of(ctx, &target);
            let out = is_subtype(ctx, &target_type, &arg_type, &target);
            match out.verdict {
                Ternary::No => Err(CoreError::NotASubtype {
                    subtype: target_type,
                    supertype: arg_type,
                }),
                verdict => {
                    if verdict == Ternary::Yes {
                        ctx.successful_elims.insert(e.id);
                    }
                    Ok((
                        type_map_elim(e.id, out.coerced, map),
                        Constraint::conjoin(pre, out.constraint, Polarity::Positive),
                    ))
                }
            }
        }

        Expr::Both(b) => {
            let (e1, c1) = check(ctx, &b.e1)?;
            let (e2, c2) = check(ctx, &b.e2)?;
            Ok((
                both(e1, e2, b.polarity),
                Constraint::conjoin(c1, c2, b.polarity),
            ))
        }

        Expr::OneOf(o) => {
            let (first, c1) = check(ctx, &o.first)?;
            let (second, c2) = check(ctx, &o.second)?;
            Ok((
                one_of(first, second),
                Constraint::conjoin(c1, c2, Polarity::Negative),
            ))
        }

        Expr::Recursion(r) => {
            let depth = ctx.push_binder(r.id, r.ty.clone());
            let body = check(ctx, &r.expr);
            ctx.truncate_binders(depth);
            let (body, c1) = body?;

            let body_type = type_of(ctx, &body);
            let (verdict, c2) = is_subtype_no_transformation(ctx, &body_type, &r.ty);
            if verdict == Ternary::No {
                return Err(CoreError::RecursionKindMismatch { id: r.id });
            }
            Ok((
                recursion(r.id, r.ty.clone(), body, r.polarity),
                Constraint::conjoin(c1, c2, Polarity::Positive),
            ))
        }

        Expr::InferenceCtx(c) => check_inference_ctx(ctx, c),
    }
}

fn check_inference_ctx(
    ctx: &mut Ctx,
    node: &InferenceCtxNode,
) -> CoreResult<(ExprRef, Option<Constraint>)> {
    let depth = ctx.push_binder(node.id, node.ty.clone());
    let body = check(ctx, &node.expr);
    ctx.truncate_binders(depth);
    let (body, constraint) = body?;

    let Some(constraint) = constraint else {
        // Nothing was learned about the variable; keep its scope.
        return Ok((
            inference_ctx(node.id, node.ty.clone(), body, node.polarity),
            None,
        ));
    };

    let range = collect(&constraint, node.id);
    if let (Some(lower), Some(upper)) = (&range.lower, &range.upper) {
        let (verdict, _) = is_subtype_no_transformation(ctx, lower, upper);
        if verdict == Ternary::No {
            return Err(CoreError::UnsatisfiableConstraint {
                id: node.id,
                lower: lower.clone(),
                upper: upper.clone(),
            });
        }
    }

    // Solve to the tightest bound available: equal bounds pin the
    // variable exactly, a lower bound alone is the least solution, an
    // upper bound alone the greatest.
    let solution = match (&range.lower, &range.upper) {
        (Some(lower), Some(upper)) if are_equal(lower, upper) == Ternary::Yes => {
            Some(lower.clone())
        }
        (Some(lower), _) => Some(lower.clone()),
        (None, Some(upper)) => Some(upper.clone()),
        (None, None) => None,
    };

    match solution {
        Some(solution) => {
            ensure_in_scope(ctx, node.id, &solution)?;
            let solved = substitute(ctx, node.id, &solution, &body);
            Ok((solved, constraint.without(node.id)))
        }
        None => Ok((
            inference_ctx(node.id, node.ty.clone(), body, node.polarity),
            constraint.without(node.id),
        )),
    }
}

/// An inference variable may only be solved in terms of identifiers that
/// dominate its introduction.
fn ensure_in_scope(ctx: &Ctx, id: usize, solution: &ExprRef) -> CoreResult<()> {
    let mut ids = Vec::new();
    free_ids(solution, &mut ids);
    for escapee in ids {
        if !ctx.binder_in_scope(escapee) {
            return Err(CoreError::IllScoped { id, escapee });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{all, str_lit, string_type, unknown};

    fn negative_map(e1: ExprRef, e2: ExprRef) -> ExprMap {
        ExprMap {
            e1,
            e2,
            polarity: Polarity::Negative,
            is_implicit: false,
        }
    }

    #[test]
    fn literals_check_unchanged() {
        let mut ctx = Ctx::new();
        for e in [str_lit("s"), string_type(), all(), crate::expr::print()] {
            let (checked, constraint) = check(&mut ctx, &e).expect("literal must check");
            assert_eq!(are_equal(&checked, &e), Ternary::Yes);
            assert!(constraint.is_none());
        }
    }

    #[test]
    fn exact_elimination_checks() {
        let mut ctx = Ctx::with_running_id(10);
        let target = expr_map(str_lit("s"), str_lit("s"), Polarity::Positive, false);
        let elim = expr_map_elim(0, target, negative_map(str_lit("s"), string_type()));
        let (_, constraint) = check(&mut ctx, &elim).expect("elim must check");
        assert!(constraint.is_none());
        assert!(ctx.successful_elims.contains(&0));
    }

    #[test]
    fn elim_cache_skips_rechecks() {
        let mut ctx = Ctx::with_running_id(10);
        ctx.successful_elims.insert(0);
        // Deliberately ill-typed; the cache says it was already discharged.
        let elim = expr_map_elim(
            0,
            str_lit("not-a-map"),
            negative_map(str_lit("s"), string_type()),
        );
        assert!(check(&mut ctx, &elim).is_ok());
    }

    #[test]
    fn mismatched_literal_elimination_still_checks() {
        // ("a" -> "b") ! "c" ~> String: "c" is well-typed for a map over
        // strings, so the checker accepts; the exact-match failure is the
        // evaluator's verdict.
        let mut ctx = Ctx::with_running_id(10);
        let target = expr_map(str_lit("a"), str_lit("b"), Polarity::Positive, false);
        let elim = expr_map_elim(0, target, negative_map(str_lit("c"), string_type()));
        assert!(check(&mut ctx, &elim).is_ok());
    }

    #[test]
    fn ill_typed_elimination_fails_with_not_a_subtype() {
        let mut ctx = Ctx::with_running_id(10);
        let target = expr_map(str_lit("a"), str_lit("b"), Polarity::Positive, false);
        // The demanded argument is a type, not a string value.
        let elim = expr_map_elim(0, target, negative_map(string_type(), string_type()));
        match check(&mut ctx, &elim) {
            Err(CoreError::NotASubtype { .. }) => {}
            other => panic!("expected NotASubtype, got {:?}", other.map(|(e, _)| e.to_string())),
        }
    }

    #[test]
    fn type_map_elim_binds_the_value() {
        let mut ctx = Ctx::with_running_id(10);
        // String ! 0 [All] ~> 0
        let elim = type_map_elim(
            5,
            string_type(),
            TypeMap {
                arg_id: 0,
                arg_type: all(),
                expr: unknown(0, all(), false),
                polarity: Polarity::Negative,
                is_implicit: false,
            },
        );
        let (_, constraint) = check(&mut ctx, &elim).expect("type map elim checks");
        assert!(constraint.is_none());
    }

    #[test]
    fn recursion_body_must_fit_binder_type() {
        let mut ctx = Ctx::with_running_id(10);
        let bad = recursion(1, crate::expr::nothing(), str_lit("s"), Polarity::Positive);
        match check(&mut ctx, &bad) {
            Err(CoreError::RecursionKindMismatch { id: 1 }) => {}
            other => panic!("expected kind mismatch, got {:?}", other.map(|(e, _)| e.to_string())),
        }
    }

    #[test]
    fn recursion_with_fitting_body_checks() {
        let mut ctx = Ctx::with_running_id(10);
        let rec = recursion(1, string_type(), str_lit("s"), Polarity::Positive);
        assert!(check(&mut ctx, &rec).is_ok());
    }

    #[test]
    fn solved_inference_ctx_substitutes_and_drops_binder() {
        let mut ctx = Ctx::with_running_id(100);
        // inference_ctx a. (("s" -> "s") ! "s" ~> a): the elimination
        // bounds a from below by String; the solver pins it and drops the
        // binder.
        let var = unknown(50, all(), true);
        let target = expr_map(str_lit("s"), str_lit("s"), Polarity::Positive, false);
        let elim = expr_map_elim(60, target, negative_map(str_lit("s"), var.clone()));
        let scoped = inference_ctx(50, all(), elim, Polarity::Negative);
        let (checked, constraint) = check(&mut ctx, &scoped).expect("must check");
        assert!(constraint.is_none());
        assert!(
            !matches!(checked.as_ref(), Expr::InferenceCtx(_)),
            "binder must be gone, got {}",
            checked
        );
        assert!(
            !crate::expr::is_bound(50, &checked),
            "solution must be substituted in"
        );
    }

    #[test]
    fn unconstrained_inference_ctx_keeps_binder() {
        let mut ctx = Ctx::with_running_id(100);
        let scoped = inference_ctx(50, all(), str_lit("s"), Polarity::Negative);
        let (checked, constraint) = check(&mut ctx, &scoped).expect("must check");
        assert!(constraint.is_none());
        assert!(matches!(checked.as_ref(), Expr::InferenceCtx(_)));
    }

    #[test]
    fn unsatisfiable_range_is_fatal() {
        let mut ctx = Ctx::with_running_id(100);
        // One elimination bounds a from below by String, another from
        // above by a demand String cannot meet.
        let var = unknown(50, all(), true);
        let target = expr_map(str_lit("s"), str_lit("s"), Polarity::Positive, false);
        let lower_site = expr_map_elim(60, target, negative_map(str_lit("s"), var.clone()));
        let carrier = unknown(55, var.clone(), false);
        let upper_site = expr_map_elim(61, carrier, negative_map(str_lit("s"), string_type()));
        let body = both(lower_site, upper_site, Polarity::Positive);
        let scoped = inference_ctx(50, all(), body, Polarity::Positive);
        match check(&mut ctx, &scoped) {
            Err(CoreError::UnsatisfiableConstraint { id: 50, .. }) => {}
            other => panic!(
                "expected unsatisfiable constraint, got {:?}",
                other.map(|(e, _)| e.to_string())
            ),
        }
    }
}
