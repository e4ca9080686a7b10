//! Client configuration
//!
//! A [`Config`] starts from hard-coded defaults and is mutated by an ordered
//! list of [`ClientOption`]s. Later options overwrite earlier ones that touch
//! the same field. [`Config::validate`] runs once before the client is built.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 1.0;
/// System message sent when the caller passes an empty prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
/// Base URL of the official OpenAI API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Azure `api-version` sent when none is configured
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

// Common model names for OpenAI-compatible backends
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const ZHIPU_GLM_FREE: &str = "glm-4-flash";

/// Backend family
///
/// Everything that is not Azure speaks the plain OpenAI protocol and is
/// selected through the base URL (DeepSeek, ZhiPu, Ollama, LM Studio, vLLM, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Azure,
}

impl Provider {
    /// Map a provider tag to a provider. Unknown tags fall back to [`Provider::OpenAI`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "azure" => Provider::Azure,
            _ => Provider::OpenAI,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named construction setting
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOption {
    Token(String),
    OrgId(String),
    Model(String),
    /// Provider tag, e.g. "openai" or "azure"
    Provider(String),
    BaseUrl(String),
    ApiVersion(String),
    /// HTTP(S) proxy URL
    ProxyUrl(String),
    /// SOCKS5 proxy address, `host:port` or `socks5://host:port`
    SocksUrl(String),
    /// Request timeout; zero means no timeout
    Timeout(Duration),
    /// Values <= 0 select [`DEFAULT_MAX_TOKENS`]
    MaxTokens(i64),
    /// Values <= 0 select [`DEFAULT_TEMPERATURE`]
    Temperature(f32),
    TopP(f32),
    PresencePenalty(f32),
    FrequencyPenalty(f32),
    /// Raw `Key=Value` header strings
    Headers(Vec<String>),
    /// Disable TLS certificate verification. Development only.
    SkipVerify(bool),
    /// Extra model ids (or id prefixes) known to accept image input
    VisionModels(Vec<String>),
}

impl ClientOption {
    /// Apply this option to `config`, replacing whatever the field held.
    pub fn apply(self, config: &mut Config) {
        match self {
            ClientOption::Token(v) => config.token = v,
            ClientOption::OrgId(v) => config.org_id = non_empty(v),
            ClientOption::Model(v) => config.model = v,
            ClientOption::Provider(tag) => config.provider = Provider::from_tag(&tag),
            ClientOption::BaseUrl(v) => config.base_url = non_empty(v),
            ClientOption::ApiVersion(v) => config.api_version = non_empty(v),
            ClientOption::ProxyUrl(v) => config.proxy_url = non_empty(v),
            ClientOption::SocksUrl(v) => config.socks_url = non_empty(v),
            ClientOption::Timeout(d) => {
                config.timeout = if d.is_zero() { None } else { Some(d) };
            }
            ClientOption::MaxTokens(v) => {
                config.max_tokens = if v <= 0 {
                    DEFAULT_MAX_TOKENS
                } else {
                    u32::try_from(v).unwrap_or(u32::MAX)
                };
            }
            ClientOption::Temperature(v) => {
                config.temperature = if v <= 0.0 { DEFAULT_TEMPERATURE } else { v };
            }
            ClientOption::TopP(v) => config.top_p = v,
            ClientOption::PresencePenalty(v) => config.presence_penalty = v,
            ClientOption::FrequencyPenalty(v) => config.frequency_penalty = v,
            ClientOption::Headers(v) => config.headers = v,
            ClientOption::SkipVerify(v) => config.skip_verify = v,
            ClientOption::VisionModels(v) => config.vision_models = v,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Accumulated construction settings
#[derive(Clone, PartialEq)]
pub struct Config {
    pub token: String,
    pub org_id: Option<String>,
    /// Empty until [`Config::validate`] picks the default
    pub model: String,
    pub provider: Provider,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub proxy_url: Option<String>,
    pub socks_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub headers: Vec<String>,
    pub skip_verify: bool,
    pub vision_models: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            org_id: None,
            model: String::new(),
            provider: Provider::default(),
            base_url: None,
            api_version: None,
            proxy_url: None,
            socks_url: None,
            timeout: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            headers: Vec::new(),
            skip_verify: false,
            vision_models: Vec::new(),
        }
    }
}

// The token never shows up in logs or panic messages.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("org_id", &self.org_id)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("proxy_url", &self.proxy_url)
            .field("socks_url", &self.socks_url)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("presence_penalty", &self.presence_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("headers", &self.headers.len())
            .field("skip_verify", &self.skip_verify)
            .field("vision_models", &self.vision_models)
            .finish()
    }
}

impl Config {
    /// Build a config from defaults plus `options`, applied in order.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }

    /// Apply one more option
    pub fn with(mut self, option: ClientOption) -> Self {
        option.apply(&mut self);
        self
    }

    /// Check the config and fill in the default model.
    pub fn validate(&mut self) -> Result<()> {
        if self.token.is_empty() {
            return Err(Error::MissingCredential);
        }

        if self.model.is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }

        Ok(())
    }
}
