//! MCP tool surface: the router exposing every gateway operation, plus the
//! static guidance prompts.

pub mod prompts;
pub mod router;
