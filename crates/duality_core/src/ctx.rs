//! Per-session state.
//!
//! A [`Ctx`] is owned by exactly one check+eval session. It carries the
//! monotone id counter every fresh identifier is drawn from, the
//! bound-constraint registry the checker uses for scope discipline, the
//! elim cache, and the sink `print` writes through. Sessions are never
//! shared: the LSP frontend keeps one `Ctx` per open document.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::expr::ExprRef;

/// The side-effect collaborator behind the `print` builtin.
///
/// The host must accept UTF-8 text; there is no return value.
pub trait WriteLine: Send + Sync {
    fn write_line(&mut self, line: &str);
}

/// Default sink: one line per `print` on stdout.
pub struct StdoutSink;

impl WriteLine for StdoutSink {
    fn write_line(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// A recording sink for tests: clones observe the same buffer.
#[derive(Clone, Default)]
pub struct Recorder {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("recorder poisoned").clone()
    }
}

impl WriteLine for Recorder {
    fn write_line(&mut self, line: &str) {
        self.lines
            .lock()
            .expect("recorder poisoned")
            .push(line.to_string());
    }
}

/// One entry of the bound-constraint registry: a binder currently in
/// scope, its declared type, and the inference variables whose solutions
/// it has been observed to constrain.
#[derive(Debug, Clone)]
pub struct BoundConstraint {
    pub id: usize,
    pub ty: ExprRef,
    pub binding_ids: Vec<usize>,
}

/// Session state shared by the elaborator, checker and evaluator.
pub struct Ctx {
    running_id: usize,
    /// Binders currently in scope, innermost last.
    pub bound_constraints: Vec<BoundConstraint>,
    /// Ids of eliminations already discharged by the checker.
    pub successful_elims: HashSet<usize>,
    sink: Box<dyn WriteLine>,
}

impl Ctx {
    /// A fresh session printing to stdout, with ids starting at 0.
    pub fn new() -> Self {
        Self::with_sink(Box::new(StdoutSink))
    }

    /// A fresh session with a custom `print` sink.
    pub fn with_sink(sink: Box<dyn WriteLine>) -> Self {
        Ctx {
            running_id: 0,
            bound_constraints: Vec::new(),
            successful_elims: HashSet::new(),
            sink,
        }
    }

    /// A fresh session whose id counter starts at `running_id`.
    ///
    /// Used when the caller has already minted ids (the elaborator does).
    pub fn with_running_id(running_id: usize) -> Self {
        let mut ctx = Self::new();
        ctx.running_id = running_id;
        ctx
    }

    /// Mints a globally fresh identifier for this session.
    pub fn fresh_id(&mut self) -> usize {
        let id = self.running_id;
        self.running_id += 1;
        id
    }

    /// The next id that would be minted.
    pub fn running_id(&self) -> usize {
        self.running_id
    }

    /// Pushes a binder onto the scope stack, returning the previous depth
    /// for the matching [`Ctx::truncate_binders`].
    pub fn push_binder(&mut self, id: usize, ty: ExprRef) -> usize {
        let depth = self.bound_constraints.len();
        self.bound_constraints.push(BoundConstraint {
            id,
            ty,
            binding_ids: Vec::new(),
        });
        depth
    }

    /// Pops binders down to a previously recorded depth. Must be called on
    /// every exit path of a scope.
    pub fn truncate_binders(&mut self, depth: usize) {
        self.bound_constraints.truncate(depth);
    }

    /// Is `id` a binder currently in scope?
    pub fn binder_in_scope(&self, id: usize) -> bool {
        self.bound_constraints.iter().any(|b| b.id == id)
    }

    /// Records that the binder `binder` constrains the solution of the
    /// inference variable `inference_id`.
    pub fn record_binding(&mut self, binder: usize, inference_id: usize) {
        if let Some(entry) = self.bound_constraints.iter_mut().find(|b| b.id == binder) {
            if !entry.binding_ids.contains(&inference_id) {
                entry.binding_ids.push(inference_id);
            }
        }
    }

    /// Routes a `print` effect to the session sink.
    pub fn write_line(&mut self, line: &str) {
        self.sink.write_line(line);
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::all;

    #[test]
    fn fresh_ids_are_monotone() {
        let mut ctx = Ctx::new();
        let a = ctx.fresh_id();
        let b = ctx.fresh_id();
        assert!(a < b);
        assert_eq!(ctx.running_id(), b + 1);
    }

    #[test]
    fn binder_scope_stack() {
        let mut ctx = Ctx::new();
        let depth = ctx.push_binder(7, all());
        assert!(ctx.binder_in_scope(7));
        ctx.truncate_binders(depth);
        assert!(!ctx.binder_in_scope(7));
    }

    #[test]
    fn recorder_observes_writes() {
        let recorder = Recorder::new();
        let mut ctx = Ctx::with_sink(Box::new(recorder.clone()));
        ctx.write_line("hello");
        assert_eq!(recorder.lines(), vec!["hello".to_string()]);
    }
}
