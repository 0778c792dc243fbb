//! Tool implementations behind the MCP server.
//!
//! Each tool is a plain async function so it can be driven without a
//! transport, from tests or from the `lexi-mcp ask` command.

pub mod ask;
pub mod status;
