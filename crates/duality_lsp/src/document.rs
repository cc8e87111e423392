//! Per-document analysis state.
//!
//! Every open document runs the full pipeline on each change: parse,
//! elaborate, check. The outcome is cached here — diagnostics for the
//! editor, the text-range map for hover. Each document owns its own core
//! session (`Ctx`); pools and id counters are never shared.

use duality_base::{Arena, Span};
use duality_core::{check, Ctx, Recorder};
use duality_syntax::{elaborate, parse_file, AstContext, RangeMap};
use tower_lsp::lsp_types::Diagnostic;

use crate::diagnostics;
use crate::line_index::LineIndex;

/// An error from one stage of the pipeline, with the span it points at.
pub struct AnalysisError {
    pub span: Span,
    pub message: String,
}

/// Analysis results for one version of a document.
pub struct DocumentState {
    pub source: String,
    pub version: i32,
    pub line_index: LineIndex,
    pub diagnostics: Vec<Diagnostic>,
    /// Hover structure; empty when elaboration failed.
    pub range_maps: Vec<RangeMap>,
    /// Rendered Core of the whole document, when elaboration succeeded.
    pub core_text: Option<String>,
    /// Rendered checked Core, when the check succeeded.
    pub checked_text: Option<String>,
}

impl DocumentState {
    pub fn new(source: String, version: i32) -> Self {
        let line_index = LineIndex::new(&source);
        let outcome = analyze(&source);
        let diagnostics = outcome
            .errors
            .iter()
            .map(|e| diagnostics::to_diagnostic(e, &line_index))
            .collect();
        DocumentState {
            source,
            version,
            line_index,
            diagnostics,
            range_maps: outcome.range_maps,
            core_text: outcome.core_text,
            checked_text: outcome.checked_text,
        }
    }

    pub fn update(&mut self, source: String, version: i32) {
        *self = DocumentState::new(source, version);
    }
}

struct AnalysisOutcome {
    errors: Vec<AnalysisError>,
    range_maps: Vec<RangeMap>,
    core_text: Option<String>,
    checked_text: Option<String>,
}

/// Runs parse → elaborate → check over a document.
///
/// Evaluation is deliberately not run here: `print` effects belong to
/// the CLI driver, not to an editor session.
fn analyze(source: &str) -> AnalysisOutcome {
    let mut outcome = AnalysisOutcome {
        errors: Vec::new(),
        range_maps: Vec::new(),
        core_text: None,
        checked_text: None,
    };

    let exprs = Arena::new();
    let blocks = Arena::new();
    let ast = AstContext::new(&exprs, &blocks);

    let block = match parse_file(source, ast) {
        Ok(block) => block,
        Err(e) => {
            outcome.errors.push(AnalysisError {
                span: e.span,
                message: e.message,
            });
            return outcome;
        }
    };

    // The sink swallows `print`: analysis must not write to the LSP wire.
    let mut ctx = Ctx::with_sink(Box::new(Recorder::new()));

    let (core, range_maps) = match elaborate(&mut ctx, block) {
        Ok(result) => result,
        Err(e) => {
            outcome.errors.push(AnalysisError {
                span: Span::new(0, source.len()),
                message: e.to_string(),
            });
            return outcome;
        }
    };
    outcome.range_maps = range_maps;
    outcome.core_text = Some(core.to_string());

    match check(&mut ctx, &core) {
        Ok((checked, _)) => {
            outcome.checked_text = Some(checked.to_string());
        }
        Err(e) => {
            outcome.errors.push(AnalysisError {
                span: Span::new(0, source.len()),
                message: e.to_string(),
            });
        }
    }

    outcome
}
