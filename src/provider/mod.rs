//! LLM Provider layer
//!
//! OpenAI-compatible provider client over async-openai. Supports OpenAI,
//! Azure OpenAI and any backend implementing the OpenAI chat completions API.

mod capability;
mod client;
mod transport;

pub use capability::*;
pub use client::*;
pub use transport::*;
