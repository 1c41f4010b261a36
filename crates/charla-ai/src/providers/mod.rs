//! Chat backend providers

pub mod gemini;

pub use gemini::GeminiProvider;
