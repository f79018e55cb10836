//! Answer synthesis over an OpenAI-compatible chat-completions endpoint.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiSynthesizer;
