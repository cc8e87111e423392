//! AST → Core elaboration.
//!
//! Names are replaced by fresh numeric identifiers drawn from the session
//! counter, against a scoped bound-variable stack. Omitted binder types
//! and the result types of applications become inference variables,
//! scoped by `inference_ctx` nodes for the checker to solve. Unbound
//! names are collected across the whole run and reported together.
//!
//! `do`-block statements desugar into eliminations of positive maps:
//! `let x = e; rest` feeds `e` to `[x α] -> rest`, an equality assertion
//! feeds its right side to `{e1 ↦ rest}`, and an ignored expression is a
//! `let` with an unused binder.

use std::fmt;

use duality_core::{
    all, expr_map, expr_map_elim, inference_ctx, one_of, recursion, str_lit, string_type,
    type_map, type_map_elim, unknown, both, print, Ctx, ExprMap, ExprRef, Polarity, TypeMap,
};

use crate::ast::{Arg, AstExpr, AstExprKind, AstExprMap, AstRecursion, AstTypeMap, DoBlock};
use crate::range_map::RangeMap;

/// Elaboration failure: the program mentions names nothing binds.
#[derive(Debug, Clone)]
pub enum ElabError {
    UnboundVariables(Vec<String>),
}

impl fmt::Display for ElabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElabError::UnboundVariables(names) => {
                write!(f, "unbound variables: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for ElabError {}

/// Elaborates a parsed file into Core, producing the text-range map
/// alongside.
pub fn elaborate(ctx: &mut Ctx, block: &DoBlock<'_>) -> Result<(ExprRef, Vec<RangeMap>), ElabError> {
    let mut elab = Elaborator {
        ctx,
        bound: Vec::new(),
        unbound: Vec::new(),
    };
    let mut maps = Vec::new();
    let core = elab.do_block(block, &mut maps);
    if !elab.unbound.is_empty() {
        return Err(ElabError::UnboundVariables(elab.unbound));
    }
    // With no unbound names every sub-elaboration succeeded.
    let core = core.expect("elaboration only fails on unbound names");
    Ok((core, maps))
}

struct BoundVar {
    name: String,
    id: usize,
    ty: ExprRef,
}

struct Elaborator<'c> {
    ctx: &'c mut Ctx,
    bound: Vec<BoundVar>,
    unbound: Vec<String>,
}

impl Elaborator<'_> {
    /// A fresh inference variable of type `All`.
    fn fresh_inference_var(&mut self) -> (usize, ExprRef) {
        let id = self.ctx.fresh_id();
        (id, unknown(id, all(), true))
    }

    /// The binder's declared type, or a fresh inference variable when the
    /// surface syntax omitted it. Returns `(type, inference id to scope)`.
    fn arg_type(
        &mut self,
        arg: &Arg<'_>,
        maps: &mut Vec<RangeMap>,
    ) -> (Option<ExprRef>, Option<usize>) {
        match arg.ty {
            Some(ty) => (self.expr(ty, maps), None),
            None => {
                let (id, var) = self.fresh_inference_var();
                (Some(var), Some(id))
            }
        }
    }

    /// Wraps `expr` in an `inference_ctx` for `id`, when a variable was
    /// introduced.
    fn scope_inference(
        &mut self,
        id: Option<usize>,
        expr: ExprRef,
        polarity: Polarity,
    ) -> ExprRef {
        match id {
            Some(id) => inference_ctx(id, all(), expr, polarity),
            None => expr,
        }
    }

    fn expr(&mut self, e: &AstExpr<'_>, maps: &mut Vec<RangeMap>) -> Option<ExprRef> {
        let mut children = Vec::new();
        let core = self.expr_inner(e, &mut children);
        if let Some(core) = &core {
            maps.push(RangeMap::new(e.span, core.clone(), children));
        } else {
            maps.extend(children);
        }
        core
    }

    fn expr_inner(&mut self, e: &AstExpr<'_>, maps: &mut Vec<RangeMap>) -> Option<ExprRef> {
        match &e.kind {
            AstExprKind::Variable(name) => self.variable(name),
            AstExprKind::StringLit(s) => Some(str_lit(*s)),
            AstExprKind::TypeString => Some(string_type()),
            AstExprKind::All => Some(all()),
            AstExprKind::Nothing => Some(duality_core::nothing()),
            AstExprKind::PositiveExprMap(map) => {
                self.expr_map(map, Polarity::Positive, maps)
            }
            AstExprKind::NegativeExprMap(map) => {
                self.expr_map(map, Polarity::Negative, maps)
            }
            AstExprKind::PositiveTypeMap(map) => {
                self.type_map(map, Polarity::Positive, maps)
            }
            AstExprKind::NegativeTypeMap(map) => {
                self.type_map(map, Polarity::Negative, maps)
            }
            AstExprKind::ExprMapElim { expr, map } => {
                let target = self.expr(expr, maps);
                let e1 = self.expr(map.e1, maps);
                let e2 = self.expr(map.e2, maps);
                let (target, e1, e2) = (target?, e1?, e2?);
                Some(expr_map_elim(
                    self.ctx.fresh_id(),
                    target,
                    ExprMap {
                        e1,
                        e2,
                        polarity: Polarity::Negative,
                        is_implicit: map.is_implicit,
                    },
                ))
            }
            AstExprKind::TypeMapElim { expr, map } => {
                let target = self.expr(expr, maps);
                let (arg_type, scoped) = self.arg_type(&map.arg, maps);
                let arg_id = self.ctx.fresh_id();
                let depth = self.bind(&map.arg, arg_id, arg_type.clone());
                let body = self.expr(map.expr, maps);
                self.bound.truncate(depth);
                let (target, arg_type, body) = (target?, arg_type?, body?);
                let elim = type_map_elim(
                    self.ctx.fresh_id(),
                    target,
                    TypeMap {
                        arg_id,
                        arg_type,
                        expr: body,
                        polarity: Polarity::Negative,
                        is_implicit: map.is_implicit,
                    },
                );
                Some(self.scope_inference(scoped, elim, Polarity::Negative))
            }
            AstExprKind::List(items) => self.compound(items, Polarity::Positive, maps),
            AstExprKind::Choice(items) => self.compound(items, Polarity::Negative, maps),
            AstExprKind::TryBlock(items) => {
                let mut elaborated = Vec::new();
                for item in items {
                    elaborated.push(self.expr(item, maps));
                }
                let mut result: Option<ExprRef> = None;
                for item in elaborated.into_iter().rev() {
                    let item = item?;
                    result = Some(match result {
                        None => item,
                        Some(rest) => one_of(item, rest),
                    });
                }
                result
            }
            AstExprKind::DoBlock(block) => self.do_block(block, maps),
            AstExprKind::Juxtaposition { left, right } => {
                let f = self.expr(left, maps);
                let x = self.expr(right, maps);
                let (f, x) = (f?, x?);
                // The application's result type is left to inference.
                let (result_id, result_var) = self.fresh_inference_var();
                let elim = expr_map_elim(
                    self.ctx.fresh_id(),
                    f,
                    ExprMap {
                        e1: x,
                        e2: result_var,
                        polarity: Polarity::Negative,
                        is_implicit: false,
                    },
                );
                Some(inference_ctx(result_id, all(), elim, Polarity::Negative))
            }
            AstExprKind::PositiveRecursion(rec) => {
                self.recursion(rec, Polarity::Positive, maps)
            }
            AstExprKind::NegativeRecursion(rec) => {
                self.recursion(rec, Polarity::Negative, maps)
            }
        }
    }

    fn variable(&mut self, name: &str) -> Option<ExprRef> {
        for var in self.bound.iter().rev() {
            if var.name == name {
                return Some(unknown(var.id, var.ty.clone(), false));
            }
        }
        if name == "print" {
            return Some(print());
        }
        if !self.unbound.iter().any(|n| n == name) {
            self.unbound.push(name.to_string());
        }
        None
    }

    fn expr_map(
        &mut self,
        map: &AstExprMap<'_>,
        polarity: Polarity,
        maps: &mut Vec<RangeMap>,
    ) -> Option<ExprRef> {
        let e1 = self.expr(map.e1, maps);
        let e2 = self.expr(map.e2, maps);
        Some(expr_map(e1?, e2?, polarity, map.is_implicit))
    }

    fn type_map(
        &mut self,
        map: &AstTypeMap<'_>,
        polarity: Polarity,
        maps: &mut Vec<RangeMap>,
    ) -> Option<ExprRef> {
        let (arg_type, scoped) = self.arg_type(&map.arg, maps);
        let arg_id = self.ctx.fresh_id();
        let depth = self.bind(&map.arg, arg_id, arg_type.clone());
        let body = self.expr(map.expr, maps);
        self.bound.truncate(depth);
        let (arg_type, body) = (arg_type?, body?);
        let tm = type_map(arg_id, arg_type, body, polarity, map.is_implicit);
        Some(self.scope_inference(scoped, tm, polarity))
    }

    fn recursion(
        &mut self,
        rec: &AstRecursion<'_>,
        polarity: Polarity,
        maps: &mut Vec<RangeMap>,
    ) -> Option<ExprRef> {
        let (ty, scoped) = self.arg_type(&rec.arg, maps);
        let id = self.ctx.fresh_id();
        let depth = self.bind(&rec.arg, id, ty.clone());
        let body = self.expr(rec.expr, maps);
        self.bound.truncate(depth);
        let (ty, body) = (ty?, body?);
        let rec = recursion(id, ty, body, polarity);
        Some(self.scope_inference(scoped, rec, polarity))
    }

    fn compound(
        &mut self,
        items: &[&AstExpr<'_>],
        polarity: Polarity,
        maps: &mut Vec<RangeMap>,
    ) -> Option<ExprRef> {
        let mut elaborated = Vec::new();
        for item in items {
            elaborated.push(self.expr(item, maps));
        }
        let mut result: Option<ExprRef> = None;
        for item in elaborated.into_iter().rev() {
            let item = item?;
            result = Some(match result {
                None => item,
                Some(rest) => both(item, rest, polarity),
            });
        }
        result
    }

    fn do_block(&mut self, block: &DoBlock<'_>, maps: &mut Vec<RangeMap>) -> Option<ExprRef> {
        match block {
            DoBlock::EndExpr(e) => self.expr(e, maps),

            DoBlock::Let { name, expr: e, rest } => {
                let value = self.expr(e, maps);
                // The binder's type is inferred from the bound value.
                let (arg_ty_id, arg_ty_var) = self.fresh_inference_var();
                let arg_id = self.ctx.fresh_id();
                let depth = self.bound.len();
                self.bound.push(BoundVar {
                    name: name.to_string(),
                    id: arg_id,
                    ty: arg_ty_var.clone(),
                });
                let rest = self.do_block(rest, maps);
                self.bound.truncate(depth);
                Some(self.statement(value?, arg_id, arg_ty_id, arg_ty_var, rest?))
            }

            DoBlock::Equality { e1, e2, rest } => {
                let e1 = self.expr(e1, maps);
                let e2 = self.expr(e2, maps);
                let rest = self.do_block(rest, maps);
                let (e1, e2, rest) = (e1?, e2?, rest?);
                // {e1 ↦ rest} ! e2: the elimination fires only when the
                // two sides evaluate to equal values.
                let matcher = expr_map(e1, rest, Polarity::Positive, false);
                let (result_id, result_var) = self.fresh_inference_var();
                let elim = expr_map_elim(
                    self.ctx.fresh_id(),
                    matcher,
                    ExprMap {
                        e1: e2,
                        e2: result_var,
                        polarity: Polarity::Negative,
                        is_implicit: false,
                    },
                );
                Some(inference_ctx(result_id, all(), elim, Polarity::Negative))
            }

            DoBlock::Ignored { expr: e, rest } => {
                let value = self.expr(e, maps);
                let (arg_ty_id, arg_ty_var) = self.fresh_inference_var();
                let arg_id = self.ctx.fresh_id();
                let rest = self.do_block(rest, maps);
                Some(self.statement(value?, arg_id, arg_ty_id, arg_ty_var, rest?))
            }
        }
    }

    /// The shared shape of `let` and ignored-expression statements:
    /// `inference_ctx α β. ([x α] -> rest) ! value ~> β`.
    fn statement(
        &mut self,
        value: ExprRef,
        arg_id: usize,
        arg_ty_id: usize,
        arg_ty_var: ExprRef,
        rest: ExprRef,
    ) -> ExprRef {
        let lam = type_map(arg_id, arg_ty_var, rest, Polarity::Positive, false);
        let (result_id, result_var) = self.fresh_inference_var();
        let elim = expr_map_elim(
            self.ctx.fresh_id(),
            lam,
            ExprMap {
                e1: value,
                e2: result_var,
                polarity: Polarity::Negative,
                is_implicit: false,
            },
        );
        inference_ctx(
            arg_ty_id,
            all(),
            inference_ctx(result_id, all(), elim, Polarity::Negative),
            Polarity::Negative,
        )
    }

    fn bind(&mut self, arg: &Arg<'_>, id: usize, ty: Option<ExprRef>) -> usize {
        let depth = self.bound.len();
        if let (Some(name), Some(ty)) = (arg.name, ty) {
            self.bound.push(BoundVar {
                name: name.to_string(),
                id,
                ty,
            });
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstContext;
    use crate::parser::parse_file;
    use duality_base::Arena;
    use duality_core::{are_equal, Expr, Ternary};

    fn elaborate_source(source: &str) -> Result<(ExprRef, Vec<RangeMap>), ElabError> {
        let exprs = Arena::new();
        let blocks = Arena::new();
        let ast = AstContext::new(&exprs, &blocks);
        let block = parse_file(source, ast).expect("parse must succeed");
        let mut ctx = Ctx::new();
        elaborate(&mut ctx, block)
    }

    #[test]
    fn string_literal_elaborates_to_core_string() {
        let (core, _) = elaborate_source("\"hello\"").expect("must elaborate");
        assert_eq!(are_equal(&core, &str_lit("hello")), Ternary::Yes);
    }

    #[test]
    fn print_resolves_to_the_builtin() {
        let (core, _) = elaborate_source("print").expect("must elaborate");
        assert!(matches!(core.as_ref(), Expr::Print));
    }

    #[test]
    fn unbound_names_are_collected() {
        match elaborate_source("foo bar") {
            Err(ElabError::UnboundVariables(names)) => {
                assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
            }
            other => panic!("expected unbound variables, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn elimination_elaborates_structurally() {
        let (core, _) =
            elaborate_source("(\"s\" -> \"s\") ! \"s\" ~> String").expect("must elaborate");
        match core.as_ref() {
            Expr::ExprMapElim(e) => {
                assert!(matches!(e.expr.as_ref(), Expr::ExprMap(_)));
                assert!(matches!(e.map.e2.as_ref(), Expr::StringType));
            }
            other => panic!("expected elimination, got {}", other),
        }
    }

    #[test]
    fn binder_names_become_ids() {
        let (core, _) = elaborate_source("[x All] -> x").expect("must elaborate");
        match core.as_ref() {
            Expr::TypeMap(t) => match t.expr.as_ref() {
                Expr::Unknown(u) => assert_eq!(u.id, t.arg_id),
                other => panic!("expected the binder variable, got {}", other),
            },
            other => panic!("expected type map, got {}", other),
        }
    }

    #[test]
    fn shadowing_binds_to_the_innermost() {
        let (core, _) = elaborate_source("[x All] -> [x String] -> x").expect("must elaborate");
        match core.as_ref() {
            Expr::TypeMap(outer) => match outer.expr.as_ref() {
                Expr::TypeMap(inner) => match inner.expr.as_ref() {
                    Expr::Unknown(u) => {
                        assert_eq!(u.id, inner.arg_id);
                        assert_ne!(u.id, outer.arg_id);
                    }
                    other => panic!("expected variable, got {}", other),
                },
                other => panic!("expected inner type map, got {}", other),
            },
            other => panic!("expected outer type map, got {}", other),
        }
    }

    #[test]
    fn list_folds_into_positive_both() {
        let (core, _) = elaborate_source("list { \"a\", \"b\", \"c\" }").expect("must elaborate");
        match core.as_ref() {
            Expr::Both(b) => {
                assert_eq!(b.polarity, Polarity::Positive);
                assert!(matches!(b.e2.as_ref(), Expr::Both(_)));
            }
            other => panic!("expected both, got {}", other),
        }
    }

    #[test]
    fn try_folds_into_one_of() {
        let (core, _) = elaborate_source("try { \"a\", \"b\" }").expect("must elaborate");
        assert!(matches!(core.as_ref(), Expr::OneOf(_)));
    }

    #[test]
    fn juxtaposition_scopes_an_inference_variable() {
        let (core, _) = elaborate_source("print \"x\"").expect("must elaborate");
        match core.as_ref() {
            Expr::InferenceCtx(c) => match c.expr.as_ref() {
                Expr::ExprMapElim(e) => {
                    assert!(matches!(e.expr.as_ref(), Expr::Print));
                }
                other => panic!("expected elimination, got {}", other),
            },
            other => panic!("expected inference scope, got {}", other),
        }
    }

    #[test]
    fn let_desugars_to_an_applied_type_map() {
        let (core, _) = elaborate_source("let x = \"v\"\nx").expect("must elaborate");
        // inference_ctx a. inference_ctx b. ([x a] -> x) ! "v" ~> b
        match core.as_ref() {
            Expr::InferenceCtx(outer) => match outer.expr.as_ref() {
                Expr::InferenceCtx(inner) => match inner.expr.as_ref() {
                    Expr::ExprMapElim(e) => {
                        assert!(matches!(e.expr.as_ref(), Expr::TypeMap(_)));
                        assert_eq!(are_equal(&e.map.e1, &str_lit("v")), Ternary::Yes);
                    }
                    other => panic!("expected elimination, got {}", other),
                },
                other => panic!("expected inner scope, got {}", other),
            },
            other => panic!("expected inference scope, got {}", other),
        }
    }

    #[test]
    fn range_map_covers_subexpressions() {
        let source = "(\"s\" -> \"s\") ! \"s\" ~> String";
        let (_, maps) = elaborate_source(source).expect("must elaborate");
        // The domain literal sits at offset 1.
        let hit = crate::range_map::lookup_innermost(&maps, 2).expect("offset covered");
        assert_eq!(hit.expr.to_string(), "\"s\"");
    }
}
