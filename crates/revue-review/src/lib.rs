//! Model-driven review of a working tree.
//!
//! Provides an OpenAI-compatible chat client with function calling, the
//! review prompts, the three review tools (file changes, commit message,
//! markdown report), and the orchestrator that runs the conversation.

pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod tools;
