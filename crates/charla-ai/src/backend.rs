//! Chat backend abstraction
//!
//! A `ChatBackend` turns a [`Context`] (system prompt + ordered messages +
//! tool definitions) into a single assistant message. Implementations wrap
//! a concrete provider API; callers depend on the trait so tests can
//! substitute scripted backends.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Context, Message};

/// Trait for chat completion backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging and diagnostics
    fn name(&self) -> &str;

    /// Run a single chat completion and return the assistant message
    async fn complete(&self, context: &Context) -> Result<Message>;
}
