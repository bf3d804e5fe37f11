//! AI layer: LLM function calling and the two thesis classification strategies.

pub mod classifier;
pub mod llm;
pub mod strategy;

pub use classifier::ThesisClassifier;
pub use llm::{LlmError, OpenAiClient, ToolCaller, ToolRequest};
pub use strategy::{InvalidStrategy, Strategy};
