//! Standalone language server binary.
//!
//! Logging goes to stderr; stdout carries the LSP wire protocol.

#[tokio::main]
async fn main() {
    env_logger::init();
    duality_lsp::run_stdio().await;
}
