//! The constraint algebra.
//!
//! Subtyping against an inference variable does not commit to a solution;
//! it records a bound. A constraint is either a single per-variable range
//! or a polarised composition of two constraints: positive composition is
//! conjunction (ranges intersect), negative composition is disjunction
//! (ranges union).
//!
//! Joins and meets of bounds are expressed inside the calculus itself: the
//! join of two types is their negative `both` (union), the meet their
//! positive `both` (intersection).

use crate::equality::are_equal;
use crate::expr::{both, ExprRef, Polarity};
use crate::ternary::Ternary;

/// Bounds on one inference variable: it must be a supertype of `lower`
/// (if present) and a subtype of `upper` (if present).
#[derive(Debug, Clone, Default)]
pub struct ConstraintRange {
    pub lower: Option<ExprRef>,
    pub upper: Option<ExprRef>,
}

impl ConstraintRange {
    pub fn is_unconstrained(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

/// A subtype constraint over inference variables.
#[derive(Debug, Clone)]
pub enum Constraint {
    Single {
        id: usize,
        range: ConstraintRange,
    },
    Multiple {
        left: Box<Constraint>,
        right: Box<Constraint>,
        polarity: Polarity,
    },
}

impl Constraint {
    /// A single lower bound: `id` must be a supertype of `lower`.
    pub fn lower_bound(id: usize, lower: ExprRef) -> Constraint {
        Constraint::Single {
            id,
            range: ConstraintRange {
                lower: Some(lower),
                upper: None,
            },
        }
    }

    /// A single upper bound: `id` must be a subtype of `upper`.
    pub fn upper_bound(id: usize, upper: ExprRef) -> Constraint {
        Constraint::Single {
            id,
            range: ConstraintRange {
                lower: None,
                upper: Some(upper),
            },
        }
    }

    /// Combines two optional constraints under a polarity.
    ///
    /// Positive composition with a missing side keeps the other (a missing
    /// constraint is trivially satisfied); negative composition with a
    /// missing side yields no constraint at all (a disjunction with the
    /// trivial constraint is trivial).
    pub fn conjoin(
        left: Option<Constraint>,
        right: Option<Constraint>,
        polarity: Polarity,
    ) -> Option<Constraint> {
        match (left, right, polarity) {
            (Some(l), Some(r), polarity) => Some(Constraint::Multiple {
                left: Box::new(l),
                right: Box::new(r),
                polarity,
            }),
            (one, other, Polarity::Positive) => one.or(other),
            (_, _, Polarity::Negative) => None,
        }
    }

    /// Removes every single constraint on `id`, returning what remains.
    pub fn without(self, id: usize) -> Option<Constraint> {
        match self {
            Constraint::Single { id: sid, range } => {
                if sid == id {
                    None
                } else {
                    Some(Constraint::Single { id: sid, range })
                }
            }
            Constraint::Multiple {
                left,
                right,
                polarity,
            } => Constraint::conjoin((*left).without(id), (*right).without(id), polarity),
        }
    }
}

/// Walks `constraint` and yields the tightest range it imposes on `id`.
pub fn collect(constraint: &Constraint, id: usize) -> ConstraintRange {
    match constraint {
        Constraint::Single { id: sid, range } => {
            if *sid == id {
                range.clone()
            } else {
                ConstraintRange::default()
            }
        }
        Constraint::Multiple {
            left,
            right,
            polarity,
        } => compose(collect(left, id), collect(right, id), *polarity),
    }
}

fn compose(l: ConstraintRange, r: ConstraintRange, polarity: Polarity) -> ConstraintRange {
    match polarity {
        // Intersection of ranges: lowers join, uppers meet. A one-sided
        // bound survives (the missing bound is the trivial one).
        Polarity::Positive => ConstraintRange {
            lower: merge_present(l.lower, r.lower, join),
            upper: merge_present(l.upper, r.upper, meet),
        },
        // Union of ranges: lowers meet, uppers join. A bound missing on
        // either side is absent from the union.
        Polarity::Negative => ConstraintRange {
            lower: merge_both(l.lower, r.lower, meet),
            upper: merge_both(l.upper, r.upper, join),
        },
    }
}

fn merge_present(
    a: Option<ExprRef>,
    b: Option<ExprRef>,
    f: fn(ExprRef, ExprRef) -> ExprRef,
) -> Option<ExprRef> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (one, other) => one.or(other),
    }
}

fn merge_both(
    a: Option<ExprRef>,
    b: Option<ExprRef>,
    f: fn(ExprRef, ExprRef) -> ExprRef,
) -> Option<ExprRef> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        _ => None,
    }
}

/// Least upper bound of two types: their union.
fn join(a: ExprRef, b: ExprRef) -> ExprRef {
    if are_equal(&a, &b) == Ternary::Yes {
        a
    } else {
        both(a, b, Polarity::Negative)
    }
}

/// Greatest lower bound of two types: their intersection.
fn meet(a: ExprRef, b: ExprRef) -> ExprRef {
    if are_equal(&a, &b) == Ternary::Yes {
        a
    } else {
        both(a, b, Polarity::Positive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{str_lit, string_type};

    #[test]
    fn collect_single_returns_its_range() {
        let c = Constraint::upper_bound(1, string_type());
        let range = collect(&c, 1);
        assert!(range.lower.is_none());
        assert_eq!(
            are_equal(range.upper.as_ref().unwrap(), &string_type()),
            Ternary::Yes
        );
    }

    #[test]
    fn collect_other_id_is_unconstrained() {
        let c = Constraint::upper_bound(1, string_type());
        assert!(collect(&c, 2).is_unconstrained());
    }

    #[test]
    fn positive_composition_keeps_one_sided_bounds() {
        let c = Constraint::conjoin(
            Some(Constraint::lower_bound(1, str_lit("a"))),
            Some(Constraint::upper_bound(1, string_type())),
            Polarity::Positive,
        )
        .unwrap();
        let range = collect(&c, 1);
        assert!(range.lower.is_some());
        assert!(range.upper.is_some());
    }

    #[test]
    fn negative_composition_drops_one_sided_bounds() {
        let c = Constraint::conjoin(
            Some(Constraint::lower_bound(1, str_lit("a"))),
            Some(Constraint::upper_bound(1, string_type())),
            Polarity::Negative,
        )
        .unwrap();
        let range = collect(&c, 1);
        assert!(range.is_unconstrained());
    }

    #[test]
    fn equal_bounds_do_not_stack() {
        let c = Constraint::conjoin(
            Some(Constraint::upper_bound(1, string_type())),
            Some(Constraint::upper_bound(1, string_type())),
            Polarity::Positive,
        )
        .unwrap();
        let range = collect(&c, 1);
        assert_eq!(
            are_equal(range.upper.as_ref().unwrap(), &string_type()),
            Ternary::Yes
        );
    }

    #[test]
    fn collect_is_idempotent() {
        let c = Constraint::conjoin(
            Some(Constraint::lower_bound(1, str_lit("a"))),
            Some(Constraint::upper_bound(1, string_type())),
            Polarity::Positive,
        )
        .unwrap();
        let once = collect(&c, 1);
        let again = collect(
            &Constraint::Single {
                id: 1,
                range: once.clone(),
            },
            1,
        );
        assert_eq!(
            are_equal(once.lower.as_ref().unwrap(), again.lower.as_ref().unwrap()),
            Ternary::Yes
        );
        assert_eq!(
            are_equal(once.upper.as_ref().unwrap(), again.upper.as_ref().unwrap()),
            Ternary::Yes
        );
    }

    #[test]
    fn without_removes_only_the_named_id() {
        let c = Constraint::conjoin(
            Some(Constraint::lower_bound(1, str_lit("a"))),
            Some(Constraint::upper_bound(2, string_type())),
            Polarity::Positive,
        )
        .unwrap();
        let rest = c.without(1).unwrap();
        assert!(collect(&rest, 1).is_unconstrained());
        assert!(collect(&rest, 2).upper.is_some());
    }
}
