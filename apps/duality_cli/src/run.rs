//! The run pipeline: parse → elaborate → check → eval.

use std::error::Error;

use duality_base::Arena;
use duality_core::{check, eval, CoreError, Ctx, Ternary};
use duality_syntax::{elaborate, parse_file, AstContext};

/// Runs a source program, printing the `Core:`, `Checked Core:` and
/// `Result:` sections. Any stage failure aborts with its diagnostic; an
/// evaluation verdict of `maybe` is not a failure — the partially
/// reduced result is printed as-is.
pub fn run_source(source: &str) -> Result<(), Box<dyn Error>> {
    let exprs = Arena::new();
    let blocks = Arena::new();
    let ast = AstContext::new(&exprs, &blocks);

    let block = parse_file(source, ast)?;

    let mut ctx = Ctx::new();
    let (core, _range_maps) = elaborate(&mut ctx, block)?;
    println!("Core:");
    println!("{}", core);

    let (checked, constraint) = check(&mut ctx, &core)?;
    if constraint.is_some() {
        return Err("unresolved constraint at top level".into());
    }
    println!("Checked Core:");
    println!("{}", checked);

    let (verdict, result) = eval(&mut ctx, &checked);
    if verdict == Ternary::No {
        return Err(Box::new(CoreError::ImpossibleReduction));
    }
    println!("Result:");
    println!("{}", result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_elimination_runs() {
        assert!(run_source("(\"s\" -> \"s\") ! \"s\" ~> String").is_ok());
    }

    #[test]
    fn print_program_runs() {
        assert!(run_source("print \"hello\"").is_ok());
    }

    #[test]
    fn mismatched_elimination_fails_at_eval() {
        let err = run_source("(\"a\" -> \"b\") ! \"c\" ~> String").unwrap_err();
        assert!(err.to_string().contains("impossible reduction"));
    }

    #[test]
    fn unbound_variable_fails() {
        let err = run_source("frobnicate").unwrap_err();
        assert!(err.to_string().contains("unbound"));
    }

    #[test]
    fn parse_error_fails() {
        assert!(run_source("]]]").is_err());
    }

    #[test]
    fn do_block_program_runs() {
        assert!(run_source("let x = \"v\"\nprint x").is_ok());
    }

    #[test]
    fn runs_a_program_read_from_a_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "print \"from-file\"").expect("write");
        let source = std::fs::read_to_string(file.path()).expect("read back");
        assert!(run_source(&source).is_ok());
    }
}
