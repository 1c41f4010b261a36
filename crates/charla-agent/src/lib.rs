//! charla-agent: Bounded tool-selection agent loop
//!
//! This crate provides the loop that lets a chat backend pick among tools,
//! observe their results, and produce a final answer within a fixed
//! iteration budget.

pub mod agent;
pub mod error;
pub mod events;
pub mod tool;

pub use agent::{Agent, AgentConfig};
pub use error::{Error, Result};
pub use events::AgentEvent;
pub use tool::{BoxedTool, Tool, ToolResult};
