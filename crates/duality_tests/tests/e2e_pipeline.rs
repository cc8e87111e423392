//! Source-to-value runs through the whole pipeline.

use duality_base::Arena;
use duality_core::{are_equal, check, eval, str_lit, string_type, Ctx, Recorder, Ternary};
use duality_syntax::{elaborate, parse_file, AstContext};

struct Run {
    verdict: Ternary,
    value: String,
    printed: Vec<String>,
}

fn run(source: &str) -> Run {
    let exprs = Arena::new();
    let blocks = Arena::new();
    let ast = AstContext::new(&exprs, &blocks);
    let block = parse_file(source, ast).expect("parse");

    let recorder = Recorder::new();
    let mut ctx = Ctx::with_sink(Box::new(recorder.clone()));
    let (core, _maps) = elaborate(&mut ctx, block).expect("elaborate");
    let (checked, _constraint) = check(&mut ctx, &core).expect("check");
    let (verdict, value) = eval(&mut ctx, &checked);
    Run {
        verdict,
        value: value.to_string(),
        printed: recorder.lines(),
    }
}

#[test]
fn string_literal_evaluates_to_itself() {
    let run = run("\"hello\"");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"hello\"");
}

#[test]
fn exact_elimination_from_source() {
    let run = run("(\"s\" -> \"s\") ! \"s\" ~> String");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"s\"");
}

#[test]
fn identity_function_applied_at_string() {
    let run = run("([x All] -> x) ! String ~> All");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "String");
}

#[test]
fn binder_elimination_from_source() {
    let run = run("String ! [x All] ~> x");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "String");
}

#[test]
fn print_application() {
    let run = run("print \"hello\"");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"hello\"");
    assert_eq!(run.printed, vec!["hello".to_string()]);
}

#[test]
fn let_binding_flows_through() {
    let run = run("let x = \"v\"\nprint x");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"v\"");
    assert_eq!(run.printed, vec!["v".to_string()]);
}

#[test]
fn equality_assertion_holds() {
    let run = run("\"a\" = \"a\"\n\"done\"");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"done\"");
}

#[test]
fn equality_assertion_fails() {
    let run = run("\"a\" = \"b\"\n\"done\"");
    assert_eq!(run.verdict, Ternary::No);
}

#[test]
fn try_block_falls_through_to_success() {
    let run = run("try { (\"a\" -> \"b\") ! \"c\" ~> String, \"fallback\" }");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"fallback\"");
}

#[test]
fn list_is_a_value() {
    let run = run("list { \"a\", \"b\" }");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(run.value, "\"a\" and \"b\"");
}

#[test]
fn sequenced_prints_happen_in_order() {
    let run = run("print \"one\"\nprint \"two\"");
    assert_eq!(run.verdict, Ternary::Yes);
    assert_eq!(
        run.printed,
        vec!["one".to_string(), "two".to_string()]
    );
}

#[test]
fn core_rendering_matches_the_grammar() {
    let exprs = Arena::new();
    let blocks = Arena::new();
    let ast = AstContext::new(&exprs, &blocks);
    let block = parse_file("(\"s\" -> \"s\") ! \"s\" ~> String", ast).expect("parse");
    let mut ctx = Ctx::new();
    let (core, _) = elaborate(&mut ctx, block).expect("elaborate");
    assert_eq!(core.to_string(), "(\"s\" -> \"s\") ! \"s\" ~> String");
}

#[test]
fn values_survive_checking_unchanged() {
    let exprs = Arena::new();
    let blocks = Arena::new();
    let ast = AstContext::new(&exprs, &blocks);
    let block = parse_file("\"v\"", ast).expect("parse");
    let mut ctx = Ctx::with_sink(Box::new(Recorder::new()));
    let (core, _) = elaborate(&mut ctx, block).expect("elaborate");
    let (checked, _) = check(&mut ctx, &core).expect("check");
    assert_eq!(are_equal(&checked, &core), Ternary::Yes);
    assert_eq!(are_equal(&checked, &str_lit("v")), Ternary::Yes);
    let ty = duality_core::type_of(&mut ctx, &checked);
    assert_eq!(are_equal(&ty, &string_type()), Ternary::Yes);
}
