//! OpenAI Adapter - one client for OpenAI, Azure OpenAI and compatible backends
//!
//! This crate provides:
//! - Ordered client options with defaults and validation
//! - Transport assembly: timeouts, HTTP/SOCKS5 proxies, custom headers, TLS toggles
//! - Chat, multi-turn and image chat completion calls

pub mod config;
pub mod error;
pub mod provider;
pub mod settings;
pub mod telemetry;

pub use config::{ClientOption, Config, Provider};
pub use error::{Error, Result};
pub use provider::{parse_headers, Capability, CapabilityTable, Client, Response, Usage};
pub use settings::Settings;

pub use async_openai::types::ChatCompletionRequestMessage;
