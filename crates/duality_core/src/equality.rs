//! Structural equality up to α-renaming.
//!
//! `are_equal` is a congruence: it recurses into children under matching
//! variants and compares binder identifiers through a paired environment
//! (each binder is registered as its partner's α-equivalent). The verdict
//! is three-valued: a `Maybe` means some unknown or unreduced computation
//! on either side could still make the expressions equal.

use crate::expr::{Expr, ExprRef, Unknown};
use crate::ternary::Ternary;

/// Decides α-equivalence of two Core expressions.
pub fn are_equal(e1: &ExprRef, e2: &ExprRef) -> Ternary {
    equal_in(&mut Vec::new(), e1, e2)
}

fn equal_in(env: &mut Vec<(usize, usize)>, e1: &ExprRef, e2: &ExprRef) -> Ternary {
    match (e1.as_ref(), e2.as_ref()) {
        (Expr::Unknown(u1), Expr::Unknown(u2)) => unknowns_equal(env, u1, u2),

        (Expr::Str(a), Expr::Str(b)) => {
            if a == b {
                Ternary::Yes
            } else {
                Ternary::No
            }
        }

        (Expr::End(p1), Expr::End(p2)) => {
            if p1 == p2 {
                Ternary::Yes
            } else {
                Ternary::No
            }
        }

        (Expr::StringType, Expr::StringType) | (Expr::Print, Expr::Print) => Ternary::Yes,

        (Expr::ExprMap(m1), Expr::ExprMap(m2)) => {
            if m1.polarity != m2.polarity || m1.is_implicit != m2.is_implicit {
                return Ternary::No;
            }
            equal_in(env, &m1.e1, &m2.e1).and_then(|| equal_in(env, &m1.e2, &m2.e2))
        }

        (Expr::TypeMap(t1), Expr::TypeMap(t2)) => {
            if t1.polarity != t2.polarity || t1.is_implicit != t2.is_implicit {
                return Ternary::No;
            }
            equal_in(env, &t1.arg_type, &t2.arg_type).and_then(|| {
                env.push((t1.arg_id, t2.arg_id));
                let verdict = equal_in(env, &t1.expr, &t2.expr);
                env.pop();
                verdict
            })
        }

        (Expr::ExprMapElim(a), Expr::ExprMapElim(b)) => {
            if a.map.is_implicit != b.map.is_implicit {
                return Ternary::No;
            }
            equal_in(env, &a.expr, &b.expr)
                .and_then(|| equal_in(env, &a.map.e1, &b.map.e1))
                .and_then(|| equal_in(env, &a.map.e2, &b.map.e2))
        }

        (Expr::TypeMapElim(a), Expr::TypeMapElim(b)) => equal_in(env, &a.expr, &b.expr)
            .and_then(|| equal_in(env, &a.map.arg_type, &b.map.arg_type))
            .and_then(|| {
                env.push((a.map.arg_id, b.map.arg_id));
                let verdict = equal_in(env, &a.map.expr, &b.map.expr);
                env.pop();
                verdict
            }),

        (Expr::Both(b1), Expr::Both(b2)) => {
            if b1.polarity != b2.polarity {
                return Ternary::No;
            }
            equal_in(env, &b1.e1, &b2.e1).and_then(|| equal_in(env, &b1.e2, &b2.e2))
        }

        (Expr::OneOf(o1), Expr::OneOf(o2)) => {
            equal_in(env, &o1.first, &o2.first).and_then(|| equal_in(env, &o1.second, &o2.second))
        }

        (Expr::Recursion(r1), Expr::Recursion(r2)) => {
            if r1.polarity != r2.polarity {
                return Ternary::No;
            }
            equal_in(env, &r1.ty, &r2.ty).and_then(|| {
                env.push((r1.id, r2.id));
                let verdict = equal_in(env, &r1.expr, &r2.expr);
                env.pop();
                verdict
            })
        }

        (Expr::InferenceCtx(c1), Expr::InferenceCtx(c2)) => {
            if c1.polarity != c2.polarity {
                return Ternary::No;
            }
            equal_in(env, &c1.ty, &c2.ty).and_then(|| {
                env.push((c1.id, c2.id));
                let verdict = equal_in(env, &c1.expr, &c2.expr);
                env.pop();
                verdict
            })
        }

        // Head variants differ. If either side could still change shape
        // (a variable to be instantiated, a computation to be reduced),
        // the verdict is open; otherwise no reduction can resolve it.
        _ => {
            if is_flexible(e1) || is_flexible(e2) {
                Ternary::Maybe
            } else {
                Ternary::No
            }
        }
    }
}

fn unknowns_equal(env: &[(usize, usize)], u1: &Unknown, u2: &Unknown) -> Ternary {
    // Innermost pairing wins; a binder paired on one side only cannot be
    // rigidly equal to the other side.
    for (a, b) in env.iter().rev() {
        let left_hit = *a == u1.id;
        let right_hit = *b == u2.id;
        if left_hit && right_hit {
            return Ternary::Yes;
        }
        if left_hit || right_hit {
            return if u1.is_inference_var || u2.is_inference_var {
                Ternary::Maybe
            } else {
                Ternary::No
            };
        }
    }
    if u1.id == u2.id {
        Ternary::Yes
    } else {
        Ternary::Maybe
    }
}

fn is_flexible(e: &ExprRef) -> bool {
    matches!(
        e.as_ref(),
        Expr::Unknown(_)
            | Expr::ExprMapElim(_)
            | Expr::TypeMapElim(_)
            | Expr::OneOf(_)
            | Expr::Recursion(_)
            | Expr::InferenceCtx(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{
        all, both, expr_map, nothing, str_lit, string_type, type_map, unknown, Polarity,
    };

    #[test]
    fn reflexivity_on_literals() {
        assert_eq!(are_equal(&str_lit("s"), &str_lit("s")), Ternary::Yes);
        assert_eq!(are_equal(&all(), &all()), Ternary::Yes);
        assert_eq!(are_equal(&string_type(), &string_type()), Ternary::Yes);
    }

    #[test]
    fn distinct_strings_differ() {
        assert_eq!(are_equal(&str_lit("a"), &str_lit("b")), Ternary::No);
    }

    #[test]
    fn ends_of_opposite_polarity_differ() {
        assert_eq!(are_equal(&all(), &nothing()), Ternary::No);
    }

    #[test]
    fn alpha_renamed_type_maps_are_equal() {
        let f = type_map(1, all(), unknown(1, all(), false), Polarity::Positive, false);
        let g = type_map(2, all(), unknown(2, all(), false), Polarity::Positive, false);
        assert_eq!(are_equal(&f, &g), Ternary::Yes);
    }

    #[test]
    fn mismatched_binder_use_differs() {
        let f = type_map(1, all(), unknown(1, all(), false), Polarity::Positive, false);
        let g = type_map(2, all(), unknown(3, all(), false), Polarity::Positive, false);
        // Body of g refers to a different (free) variable than its binder.
        assert_eq!(are_equal(&f, &g), Ternary::No);
    }

    #[test]
    fn inference_variable_keeps_the_question_open() {
        let var = unknown(9, all(), true);
        assert_eq!(are_equal(&var, &str_lit("s")), Ternary::Maybe);
    }

    #[test]
    fn concrete_head_mismatch_is_no() {
        let map = expr_map(str_lit("a"), str_lit("b"), Polarity::Positive, false);
        assert_eq!(are_equal(&map, &str_lit("a")), Ternary::No);
    }

    #[test]
    fn polarity_distinguishes_both() {
        let pair = both(str_lit("a"), str_lit("b"), Polarity::Positive);
        let union = both(str_lit("a"), str_lit("b"), Polarity::Negative);
        assert_eq!(are_equal(&pair, &union), Ternary::No);
        assert_eq!(are_equal(&pair, &pair.clone()), Ternary::Yes);
    }
}
