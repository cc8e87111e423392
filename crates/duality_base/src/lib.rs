//! # duality-base
//!
//! Pure structural atoms for the duality workspace.
//!
//! This crate provides the foundational types the rest of the workspace
//! builds on:
//!
//! - [`Arena`] — bump allocation for stable AST references
//! - [`Span`] — source location tracking
//! - [`SpannedError`]/[`Result`] — errors with source positions
//!
//! It has no knowledge of the surface syntax, the core calculus, or I/O.

pub mod arena;
pub mod error;
pub mod span;

pub use arena::Arena;
pub use error::{Result, SpannedError};
pub use span::Span;
