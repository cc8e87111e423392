//! Hover: position → innermost elaborated Core expression.

use duality_syntax::range_map::lookup_innermost;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use crate::document::DocumentState;

/// Answers a hover request from the document's text-range map.
pub fn hover(doc: &DocumentState, position: Position) -> Option<Hover> {
    let offset = doc.line_index.offset(position);
    let hit = lookup_innermost(&doc.range_maps, offset)?;

    let contents = format!("```duality\n{}\n```", hit.expr);
    let range = Range {
        start: doc.line_index.position(hit.span.start),
        end: doc.line_index.position(hit.span.end),
    };

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: contents,
        }),
        range: Some(range),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_shows_the_innermost_core_expr() {
        let doc = DocumentState::new("(\"s\" -> \"s\") ! \"s\" ~> String".to_string(), 1);
        let hit = hover(
            &doc,
            Position {
                line: 0,
                character: 2,
            },
        )
        .expect("hover inside the first literal");
        match hit.contents {
            HoverContents::Markup(m) => assert!(m.value.contains("\"s\"")),
            _ => panic!("expected markup"),
        }
    }

    #[test]
    fn hover_outside_any_range_is_none() {
        let doc = DocumentState::new("\"v\"".to_string(), 1);
        let miss = hover(
            &doc,
            Position {
                line: 5,
                character: 0,
            },
        );
        assert!(miss.is_none());
    }
}
