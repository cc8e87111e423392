//! Error kinds of the core.
//!
//! Errors bubble up synchronously; a failing check yields no expression
//! at all. The evaluator does not error — "cannot decide" is a `Maybe`
//! verdict, and a definite failure is a `No` verdict the caller may
//! surface as [`CoreError::ImpossibleReduction`].

use std::fmt;

use crate::expr::ExprRef;

/// A failure detected by the checker or surfaced by a driver.
#[derive(Debug, Clone)]
pub enum CoreError {
    /// The subtype relation answered a definite no.
    NotASubtype { subtype: ExprRef, supertype: ExprRef },

    /// Constraint collection produced a range whose lower bound is not a
    /// subtype of its upper bound.
    UnsatisfiableConstraint {
        id: usize,
        lower: ExprRef,
        upper: ExprRef,
    },

    /// An inference variable's solution mentions an identifier that is
    /// not in scope at the variable's introduction.
    IllScoped { id: usize, escapee: usize },

    /// The body type of a recursion does not fit the declared binder type.
    RecursionKindMismatch { id: usize },

    /// The evaluator hit a redex whose argument failed its subtype check.
    ImpossibleReduction,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NotASubtype { subtype, supertype } => {
                write!(f, "not a subtype: {} is not in {}", subtype, supertype)
            }
            CoreError::UnsatisfiableConstraint { id, lower, upper } => write!(
                f,
                "unsatisfiable constraint on {}: {} exceeds {}",
                id, lower, upper
            ),
            CoreError::IllScoped { id, escapee } => write!(
                f,
                "ill-scoped solution for {}: mentions out-of-scope {}",
                id, escapee
            ),
            CoreError::RecursionKindMismatch { id } => {
                write!(f, "recursion kind mismatch for binder {}", id)
            }
            CoreError::ImpossibleReduction => write!(f, "impossible reduction"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Alias for `std::result::Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{str_lit, string_type};

    #[test]
    fn display_names_the_kind() {
        let err = CoreError::NotASubtype {
            subtype: str_lit("a"),
            supertype: string_type(),
        };
        assert!(err.to_string().contains("not a subtype"));

        let err = CoreError::RecursionKindMismatch { id: 3 };
        assert!(err.to_string().contains("recursion kind mismatch"));
    }
}
