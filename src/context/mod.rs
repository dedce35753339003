//! Grounding context for the assistant: web evidence and the prompt built on it.

pub mod pipeline;
pub mod prompt;

pub use pipeline::{AssembledContext, ContextAssembler, Source};
pub use prompt::{build_system_prompt, format_sources_reference};
