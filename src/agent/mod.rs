//! Conversation layer on top of the grounding pipeline.

pub mod assistant;
pub mod persona;
pub mod topic_gate;

pub use assistant::{Assistant, AssistantReply};
pub use persona::AssistantPersona;
pub use topic_gate::{TopicGate, TopicVerdict};
