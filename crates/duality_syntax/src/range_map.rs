//! The text-range map.
//!
//! Elaboration produces, alongside the Core expression, a tree relating
//! source spans to the Core each region elaborates to. The LSP frontend
//! queries it for hover answers; it lives and dies with the document it
//! was built for.

use duality_base::Span;
use duality_core::ExprRef;

/// One node of the range tree.
#[derive(Clone)]
pub struct RangeMap {
    pub span: Span,
    pub expr: ExprRef,
    pub children: Vec<RangeMap>,
}

impl RangeMap {
    pub fn new(span: Span, expr: ExprRef, children: Vec<RangeMap>) -> Self {
        RangeMap {
            span,
            expr,
            children,
        }
    }

    /// The innermost node whose span contains `offset`, if any.
    pub fn lookup(&self, offset: usize) -> Option<&RangeMap> {
        if !self.span.contains(offset) {
            return None;
        }
        for child in &self.children {
            if let Some(inner) = child.lookup(offset) {
                return Some(inner);
            }
        }
        Some(self)
    }
}

/// Innermost lookup across a forest of range trees.
pub fn lookup_innermost(maps: &[RangeMap], offset: usize) -> Option<&RangeMap> {
    maps.iter().find_map(|m| m.lookup(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duality_core::str_lit;

    #[test]
    fn lookup_prefers_the_innermost_span() {
        let inner = RangeMap::new(Span::new(2, 4), str_lit("inner"), Vec::new());
        let outer = RangeMap::new(Span::new(0, 10), str_lit("outer"), vec![inner]);
        let hit = outer.lookup(3).expect("offset is covered");
        assert_eq!(hit.expr.to_string(), "\"inner\"");
        let hit = outer.lookup(5).expect("offset is covered");
        assert_eq!(hit.expr.to_string(), "\"outer\"");
        assert!(outer.lookup(11).is_none());
    }
}
