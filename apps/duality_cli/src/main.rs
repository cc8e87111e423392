//! duality CLI - standalone binary.
//!
//! A thin wrapper around [`duality_cli::run_cli`]: command logic lives
//! in the library crate for testability.
//!
//! # Exit Codes
//!
//! - `0` - success
//! - `1` - error (one-line diagnostic printed to stderr)

fn main() {
    env_logger::init();
    if let Err(e) = duality_cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
