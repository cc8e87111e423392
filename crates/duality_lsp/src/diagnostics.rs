//! Error → LSP diagnostic conversion.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::document::AnalysisError;
use crate::line_index::LineIndex;

/// Converts an analysis error into an editor diagnostic.
pub fn to_diagnostic(error: &AnalysisError, line_index: &LineIndex) -> Diagnostic {
    let range = Range {
        start: line_index.position(error.span.start),
        end: line_index.position(error.span.end),
    };
    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("duality".to_string()),
        message: error.message.clone(),
        ..Default::default()
    }
}
