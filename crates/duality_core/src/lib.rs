//! The Core: duality's typed intermediate representation.
//!
//! Everything in duality elaborates to a small polarised calculus in which
//! the same syntactic form is an introduction at positive polarity and an
//! elimination shape at negative polarity. This crate owns that calculus
//! and the four algorithms over it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Elaborator (duality-syntax)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Checker                              │
//! │  check: bidirectional pass, emits subtype constraints       │
//! └─────────────────────────────────────────────────────────────┘
//!                │                             │
//!                ▼                             ▼
//! ┌─────────────────────────┐   ┌─────────────────────────────┐
//! │        Subtype          │   │        Constraints          │
//! │  verdict + coercion     │   │  per-variable ranges        │
//! └─────────────────────────┘   └─────────────────────────────┘
//!                │
//!                ▼
//! ┌─────────────────────────┐   ┌─────────────────────────────┐
//! │        Evaluator        │   │   type_of / are_equal       │
//! │  small-step, guarded    │   │   synthesis / α-equality    │
//! └─────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! # Public API
//!
//! ## Core Types
//! - [`Expr`]/[`ExprRef`] - the Core expression algebra and its shared handles
//! - [`Polarity`] - positive (producer) vs negative (consumer)
//! - [`Ternary`] - three-valued verdicts with short-circuit combinators
//! - [`Ctx`] - per-session state: id counter, binder scopes, elim cache
//!
//! ## Algorithms
//! - [`are_equal`] - α-equivalence up to binder renaming
//! - [`type_of`] - syntactic type synthesis
//! - [`is_subtype`] - subtyping with coercion and constraint generation
//! - [`check`] - the bidirectional checker
//! - [`eval`] - small-step normalisation
//!
//! # Isolation
//!
//! This crate has no dependencies. The surface syntax, the LSP frontend
//! and the CLI never leak in; source locations never reach the IR (the
//! elaborator's range map carries them out-of-band); the core is purely
//! the type theory.

mod check;
mod constraint;
mod ctx;
mod equality;
mod error;
mod eval;
mod expr;
mod subtype;
mod ternary;
mod type_of;

pub use check::check;
pub use constraint::{collect, Constraint, ConstraintRange};
pub use ctx::{BoundConstraint, Ctx, Recorder, StdoutSink, WriteLine};
pub use equality::are_equal;
pub use error::{CoreError, CoreResult};
pub use eval::eval;
pub use expr::{
    all, both, expr_map, expr_map_elim, inference_ctx, is_bound, is_computation, is_value,
    nothing, one_of, print, recursion, str_lit, string_type, substitute, type_map,
    type_map_elim, unknown, Both, Expr, ExprMap, ExprMapElim, ExprRef, InferenceCtx, OneOf,
    Polarity, Recursion, TypeMap, TypeMapElim, Unknown,
};
pub use subtype::{is_subtype, is_subtype_no_transformation, SubtypeOutcome};
pub use ternary::Ternary;
pub use type_of::type_of;
