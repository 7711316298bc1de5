//! LLM access for style scripting: a provider-agnostic completion client and
//! the writer that turns style instructions into SSML.
pub mod client;
pub mod config;
pub mod style;

pub use client::{LlmClient, TextGenerator};
pub use config::{LlmConfig, LlmProvider};
pub use style::{build_style_prompt, StyleScriptWriter, SCRIPT_GENERATION_FAILED};
