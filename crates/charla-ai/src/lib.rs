//! charla-ai: Chat completion backend abstraction
//!
//! This crate provides a common interface for single-shot chat completion
//! calls with function calling, plus the Gemini provider implementation.

pub mod backend;
pub mod error;
pub mod providers;
pub mod types;

pub use backend::ChatBackend;
pub use error::{Error, Result};
pub use types::*;
