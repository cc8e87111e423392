//! Subtyping with coercion generation.
//!
//! `is_subtype(sub, sup, subject)` decides the relation and, where the
//! representation has to change, rewrites `subject` (a term of type `sub`)
//! into a term of type `sup`. Maps are compared contravariantly in their
//! domains and covariantly in their ranges; coercions on positive maps are
//! η-expansions around the subject. Inference variables never get pinned
//! here — meeting one emits a range constraint and answers `Maybe`.
//!
//! Recursion is handled coinductively: each `(sub, sup)` pair of μ-binders
//! entered is assumed for the comparison of the bodies, which terminates
//! the otherwise infinite unfolding.

use crate::constraint::Constraint;
use crate::ctx::Ctx;
use crate::equality::are_equal;
use crate::expr::{
    all, both, expr_map, expr_map_elim, free_ids, substitute, type_map, unknown, Expr, ExprMap,
    ExprRef, Polarity, Recursion, TypeMap,
};
use crate::ternary::Ternary;
use crate::type_of::type_of;

/// Result of a subtype query.
pub struct SubtypeOutcome {
    pub verdict: Ternary,
    pub constraint: Option<Constraint>,
    /// The subject, rewritten to inhabit the supertype. Meaningless when
    /// the verdict is `No`.
    pub coerced: ExprRef,
}

impl SubtypeOutcome {
    fn yes(subject: &ExprRef) -> Self {
        SubtypeOutcome {
            verdict: Ternary::Yes,
            constraint: None,
            coerced: subject.clone(),
        }
    }

    fn no(subject: &ExprRef) -> Self {
        SubtypeOutcome {
            verdict: Ternary::No,
            constraint: None,
            coerced: subject.clone(),
        }
    }

    fn maybe(subject: &ExprRef, constraint: Option<Constraint>) -> Self {
        SubtypeOutcome {
            verdict: Ternary::Maybe,
            constraint,
            coerced: subject.clone(),
        }
    }
}

/// Decides `sub ≤ sup` and coerces `subject` accordingly.
pub fn is_subtype(ctx: &mut Ctx, sub: &ExprRef, sup: &ExprRef, subject: &ExprRef) -> SubtypeOutcome {
    subtype_in(ctx, &mut Vec::new(), sub, sup, subject)
}

/// The verdict-and-constraint-only form, for checks whose subject is
/// irrelevant (commuting conversions, recursion kinds, eval guards).
pub fn is_subtype_no_transformation(
    ctx: &mut Ctx,
    sub: &ExprRef,
    sup: &ExprRef,
) -> (Ternary, Option<Constraint>) {
    let dummy = all();
    let out = subtype_in(ctx, &mut Vec::new(), sub, sup, &dummy);
    (out.verdict, out.constraint)
}

fn subtype_in(
    ctx: &mut Ctx,
    assumptions: &mut Vec<(usize, usize)>,
    sub: &ExprRef,
    sup: &ExprRef,
    subject: &ExprRef,
) -> SubtypeOutcome {
    // Identity.
    if are_equal(sub, sup) == Ternary::Yes {
        return SubtypeOutcome::yes(subject);
    }

    // Top and bottom.
    if matches!(sup.as_ref(), Expr::End(Polarity::Positive)) {
        return SubtypeOutcome::yes(subject);
    }
    if matches!(sub.as_ref(), Expr::End(Polarity::Negative)) {
        return SubtypeOutcome::yes(subject);
    }

    // Inference variables: record a bound, commit to nothing.
    if let Expr::Unknown(u) = sub.as_ref() {
        if u.is_inference_var {
            record_dependencies(ctx, u.id, sup);
            return SubtypeOutcome::maybe(subject, Some(Constraint::upper_bound(u.id, sup.clone())));
        }
    }
    if let Expr::Unknown(u) = sup.as_ref() {
        if u.is_inference_var {
            record_dependencies(ctx, u.id, sub);
            return SubtypeOutcome::maybe(subject, Some(Constraint::lower_bound(u.id, sub.clone())));
        }
    }

    // Recursion, coinductively.
    if let (Expr::Recursion(r1), Expr::Recursion(r2)) = (sub.as_ref(), sup.as_ref()) {
        if assumptions.contains(&(r1.id, r2.id)) {
            return SubtypeOutcome::yes(subject);
        }
        assumptions.push((r1.id, r2.id));
        let aligned = substitute(ctx, r2.id, &unknown(r1.id, r1.ty.clone(), false), &r2.expr);
        let out = subtype_in(ctx, assumptions, &r1.expr, &aligned, subject);
        assumptions.pop();
        return out;
    }
    // Single-sided unfolding also goes through the assumption set so a
    // μ-binder resurfacing from its own unfolding cannot loop.
    if let Expr::Recursion(r) = sub.as_ref() {
        if assumptions.contains(&(r.id, usize::MAX)) {
            return SubtypeOutcome::maybe(subject, None);
        }
        return match unfold_guarded(ctx, r, sub) {
            Some(unfolded) => {
                assumptions.push((r.id, usize::MAX));
                let out = subtype_in(ctx, assumptions, &unfolded, sup, subject);
                assumptions.pop();
                out
            }
            None => SubtypeOutcome::maybe(subject, None),
        };
    }
    if let Expr::Recursion(r) = sup.as_ref() {
        if assumptions.contains(&(usize::MAX, r.id)) {
            return SubtypeOutcome::maybe(subject, None);
        }
        return match unfold_guarded(ctx, r, sup) {
            Some(unfolded) => {
                assumptions.push((usize::MAX, r.id));
                let out = subtype_in(ctx, assumptions, sub, &unfolded, subject);
                assumptions.pop();
                out
            }
            None => SubtypeOutcome::maybe(subject, None),
        };
    }

    match (sub.as_ref(), sup.as_ref()) {
        // Intersection on the right: the subject must fit every component.
        (_, Expr::Both(b)) if b.polarity == Polarity::Positive => {
            let l = subtype_in(ctx, assumptions, sub, &b.e1, subject);
            if l.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            let r = subtype_in(ctx, assumptions, sub, &b.e2, subject);
            if r.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            SubtypeOutcome {
                verdict: l.verdict.conjunction(r.verdict),
                constraint: Constraint::conjoin(l.constraint, r.constraint, Polarity::Positive),
                coerced: both(l.coerced, r.coerced, Polarity::Positive),
            }
        }

        // Union on the left: every component must fit; the subject's
        // representation is unchanged (unions are untagged).
        (Expr::Both(b), _) if b.polarity == Polarity::Negative => {
            let l = subtype_in(ctx, assumptions, &b.e1, sup, subject);
            if l.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            let r = subtype_in(ctx, assumptions, &b.e2, sup, subject);
            if r.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            SubtypeOutcome {
                verdict: l.verdict.conjunction(r.verdict),
                constraint: Constraint::conjoin(l.constraint, r.constraint, Polarity::Positive),
                coerced: subject.clone(),
            }
        }

        // Intersection on the left: the branch that succeeds carries the
        // subject over.
        (Expr::Both(b), _) if b.polarity == Polarity::Positive => {
            choose_branch(ctx, assumptions, &b.e1, &b.e2, sup, subject, BranchSide::Sub)
        }

        // Union on the right: inject into whichever side admits the subject.
        (_, Expr::Both(b)) if b.polarity == Polarity::Negative => {
            choose_branch(ctx, assumptions, &b.e1, &b.e2, sub, subject, BranchSide::Sup)
        }

        (Expr::ExprMap(m1), Expr::ExprMap(m2)) => {
            expr_maps(ctx, assumptions, m1, m2, subject)
        }

        (Expr::TypeMap(t1), Expr::TypeMap(t2)) => {
            type_maps(ctx, assumptions, t1, t2, subject)
        }

        // A universal producer fed a concrete value satisfies the demand.
        (Expr::TypeMap(t), Expr::ExprMap(m))
            if t.polarity == Polarity::Positive && m.polarity == Polarity::Negative =>
        {
            type_map_against_demand(ctx, assumptions, t, m, subject)
        }

        // Singleton widening: a string literal inhabits String.
        (Expr::Str(_), Expr::StringType) => SubtypeOutcome::yes(subject),

        _ => {
            if is_flexible(sub) || is_flexible(sup) {
                SubtypeOutcome::maybe(subject, None)
            } else {
                SubtypeOutcome::no(subject)
            }
        }
    }
}

#[derive(Clone, Copy)]
enum BranchSide {
    /// Decomposing the subtype: goals are `eᵢ ≤ other`.
    Sub,
    /// Decomposing the supertype: goals are `other ≤ eᵢ`.
    Sup,
}

fn choose_branch(
    ctx: &mut Ctx,
    assumptions: &mut Vec<(usize, usize)>,
    e1: &ExprRef,
    e2: &ExprRef,
    other: &ExprRef,
    subject: &ExprRef,
    side: BranchSide,
) -> SubtypeOutcome {
    let goal = |ctx: &mut Ctx, assumptions: &mut Vec<(usize, usize)>, e: &ExprRef| match side {
        BranchSide::Sub => subtype_in(ctx, assumptions, e, other, subject),
        BranchSide::Sup => subtype_in(ctx, assumptions, other, e, subject),
    };
    let l = goal(ctx, assumptions, e1);
    if l.verdict == Ternary::Yes {
        return l;
    }
    let r = goal(ctx, assumptions, e2);
    if r.verdict == Ternary::Yes {
        return r;
    }
    if l.verdict == Ternary::No && r.verdict == Ternary::No {
        return SubtypeOutcome::no(subject);
    }
    SubtypeOutcome::maybe(
        subject,
        Constraint::conjoin(l.constraint, r.constraint, Polarity::Negative),
    )
}

fn expr_maps(
    ctx: &mut Ctx,
    assumptions: &mut Vec<(usize, usize)>,
    m1: &ExprMap,
    m2: &ExprMap,
    subject: &ExprRef,
) -> SubtypeOutcome {
    if m1.is_implicit != m2.is_implicit {
        return SubtypeOutcome::no(subject);
    }
    match (m1.polarity, m2.polarity) {
        (Polarity::Positive, Polarity::Positive) => {
            let dom = subtype_in(ctx, assumptions, &m2.e1, &m1.e1, &m2.e1);
            if dom.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            // η-expand: the coerced subject maps m2's domain value to the
            // coerced result of eliminating the original subject with it.
            let inner = expr_map_elim(
                ctx.fresh_id(),
                subject.clone(),
                ExprMap {
                    e1: m2.e1.clone(),
                    e2: m1.e2.clone(),
                    polarity: Polarity::Negative,
                    is_implicit: m1.is_implicit,
                },
            );
            let rng = subtype_in(ctx, assumptions, &m1.e2, &m2.e2, &inner);
            if rng.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            SubtypeOutcome {
                verdict: dom.verdict.conjunction(rng.verdict),
                constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
                coerced: expr_map(
                    m2.e1.clone(),
                    rng.coerced,
                    Polarity::Positive,
                    m2.is_implicit,
                ),
            }
        }
        (Polarity::Negative, Polarity::Negative) => {
            let dom = subtype_in(ctx, assumptions, &m2.e1, &m1.e1, &m2.e1);
            if dom.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            let rng = subtype_in(ctx, assumptions, &m1.e2, &m2.e2, subject);
            if rng.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            SubtypeOutcome {
                verdict: dom.verdict.conjunction(rng.verdict),
                constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
                coerced: subject.clone(),
            }
        }
        // A singleton function against a demand: the demanded argument
        // must be well-typed for the function's domain (an exact-match
        // failure is the evaluator's verdict, not a check error), and
        // the range must meet the expectation.
        (Polarity::Positive, Polarity::Negative) => {
            let arg_type = type_of(ctx, &m2.e1);
            let dom_type = type_of(ctx, &m1.e1);
            let dom = subtype_in(ctx, assumptions, &arg_type, &dom_type, &m2.e1);
            if dom.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            let rng = subtype_in(ctx, assumptions, &m1.e2, &m2.e2, subject);
            if rng.verdict == Ternary::No {
                return SubtypeOutcome::no(subject);
            }
            SubtypeOutcome {
                verdict: dom.verdict.conjunction(rng.verdict),
                constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
                coerced: subject.clone(),
            }
        }
        (Polarity::Negative, Polarity::Positive) => SubtypeOutcome::no(subject),
    }
}

fn type_maps(
    ctx: &mut Ctx,
    assumptions: &mut Vec<(usize, usize)>,
    t1: &TypeMap,
    t2: &TypeMap,
    subject: &ExprRef,
) -> SubtypeOutcome {
    if t1.is_implicit != t2.is_implicit || t1.polarity != t2.polarity {
        return SubtypeOutcome::no(subject);
    }
    let dom = subtype_in(ctx, assumptions, &t2.arg_type, &t1.arg_type, &t2.arg_type);
    if dom.verdict == Ternary::No {
        return SubtypeOutcome::no(subject);
    }
    // Compare bodies under a shared fresh binder.
    let fresh = ctx.fresh_id();
    let var = unknown(fresh, t2.arg_type.clone(), false);
    let body1 = substitute(ctx, t1.arg_id, &var, &t1.expr);
    let body2 = substitute(ctx, t2.arg_id, &var, &t2.expr);
    if t1.polarity == Polarity::Positive {
        let inner = expr_map_elim(
            ctx.fresh_id(),
            subject.clone(),
            ExprMap {
                e1: var,
                e2: body1.clone(),
                polarity: Polarity::Negative,
                is_implicit: t1.is_implicit,
            },
        );
        let rng = subtype_in(ctx, assumptions, &body1, &body2, &inner);
        if rng.verdict == Ternary::No {
            return SubtypeOutcome::no(subject);
        }
        SubtypeOutcome {
            verdict: dom.verdict.conjunction(rng.verdict),
            constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
            coerced: type_map(
                fresh,
                t2.arg_type.clone(),
                rng.coerced,
                Polarity::Positive,
                t2.is_implicit,
            ),
        }
    } else {
        let rng = subtype_in(ctx, assumptions, &body1, &body2, subject);
        if rng.verdict == Ternary::No {
            return SubtypeOutcome::no(subject);
        }
        SubtypeOutcome {
            verdict: dom.verdict.conjunction(rng.verdict),
            constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
            coerced: subject.clone(),
        }
    }
}

/// `[x T] -> B  ≤  a ~> B'`: feeding the demanded value `a` to a
/// universal producer works when `a`'s type fits the domain and the
/// instantiated body fits the expectation.
fn type_map_against_demand(
    ctx: &mut Ctx,
    assumptions: &mut Vec<(usize, usize)>,
    t: &TypeMap,
    m: &ExprMap,
    subject: &ExprRef,
) -> SubtypeOutcome {
    let arg_type = type_of(ctx, &m.e1);
    let dom = subtype_in(ctx, assumptions, &arg_type, &t.arg_type, &m.e1);
    if dom.verdict == Ternary::No {
        return SubtypeOutcome::no(subject);
    }
    let body = substitute(ctx, t.arg_id, &m.e1, &t.expr);
    let rng = subtype_in(ctx, assumptions, &body, &m.e2, subject);
    if rng.verdict == Ternary::No {
        return SubtypeOutcome::no(subject);
    }
    SubtypeOutcome {
        verdict: dom.verdict.conjunction(rng.verdict),
        constraint: Constraint::conjoin(dom.constraint, rng.constraint, Polarity::Positive),
        coerced: subject.clone(),
    }
}

/// Unfolds a μ-binder one level, refusing when no progress is possible:
/// a body headed by another recursion or by a bare self-use would unfold
/// forever.
pub(crate) fn unfold_guarded(ctx: &mut Ctx, r: &Recursion, whole: &ExprRef) -> Option<ExprRef> {
    match r.expr.as_ref() {
        Expr::Recursion(_) => None,
        Expr::Unknown(u) if u.id == r.id => None,
        _ => Some(substitute(ctx, r.id, whole, &r.expr)),
    }
}

/// Registers, for every in-scope binder mentioned by `bound`, that it now
/// constrains the solution of the inference variable `inference_id`.
fn record_dependencies(ctx: &mut Ctx, inference_id: usize, bound: &ExprRef) {
    let mut ids = Vec::new();
    free_ids(bound, &mut ids);
    for id in ids {
        ctx.record_binding(id, inference_id);
    }
}

fn is_flexible(e: &ExprRef) -> bool {
    matches!(
        e.as_ref(),
        Expr::Unknown(_)
            | Expr::ExprMapElim(_)
            | Expr::TypeMapElim(_)
            | Expr::OneOf(_)
            | Expr::InferenceCtx(_)
    )
}
