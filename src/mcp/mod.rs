//! Tool protocol served over standard input and output.
//!
//! - [`protocol`]: JSON-RPC message types and error codes
//! - [`registry`]: Immutable name-to-handler tool table
//! - [`server`]: Request loop and method dispatch
//! - [`tools`]: The built-in git-guardian tools

pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;

use crate::core::error::Result;
use registry::ToolRegistry;
use server::Server;
use tokio::io::BufReader;

/// Serves `registry` over the process's stdin and stdout until stdin closes.
pub async fn serve_stdio(registry: &ToolRegistry) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    Server::new(registry).serve(stdin, stdout).await
}
