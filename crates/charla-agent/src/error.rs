//! Error types for charla-agent

use thiserror::Error;

/// Result type alias using charla-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during agent runs
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the chat backend layer
    #[error(transparent)]
    Ai(#[from] charla_ai::Error),

    /// The loop hit its iteration bound without a final answer
    #[error("agent exhausted {iterations} iterations without a final answer")]
    IterationLimit { iterations: u32 },

    /// The backend produced an empty or whitespace-only final answer
    #[error("agent produced an empty response")]
    EmptyResponse,
}
