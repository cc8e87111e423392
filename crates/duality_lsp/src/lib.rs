//! # duality-lsp
//!
//! Language Server Protocol frontend for duality.
//!
//! The server keeps one analysis session per open document: the document's
//! text is parsed, elaborated, and checked on every change, diagnostics
//! are published from the errors of each stage, and hover answers come
//! from the elaborator's text-range map (the innermost Core expression
//! covering the cursor).
//!
//! Sessions are fully isolated: each document owns its expression pool
//! and id counter; nothing is shared between documents.
//!
//! ## Modules
//!
//! - [`server`] - the tower-lsp `LanguageServer` implementation
//! - [`state`] - the open-document table
//! - [`document`] - per-document analysis state
//! - [`line_index`] - LSP position ↔ byte offset conversion (UTF-16 aware)
//! - [`diagnostics`] - error → `Diagnostic` conversion
//! - [`hover`] - range-map hover lookups

pub mod diagnostics;
pub mod document;
pub mod hover;
pub mod line_index;
pub mod server;
pub mod state;

use tower_lsp::{LspService, Server};

/// Runs the language server over stdio until the client disconnects.
pub async fn run_stdio() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(server::DualityServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
