//! File-backed client settings
//!
//! A settings file is YAML (or JSON when the extension is `.json`) with any
//! subset of the fields below:
//!
//! ```yaml
//! provider: azure
//! base_url: https://my-resource.openai.azure.com
//! model: gpt-4o
//! api_version: 2024-06-01
//! timeout_secs: 30
//! headers:
//!   - X-Trace=abc
//! ```
//!
//! Values are turned into [`ClientOption`]s so they get the same
//! normalization as options passed in code.

use crate::config::ClientOption;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub token: Option<String>,
    pub org_id: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub proxy_url: Option<String>,
    pub socks_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<i64>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub headers: Option<Vec<String>>,
    pub skip_verify: Option<bool>,
    pub vision_models: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from a YAML or JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings_error = |message: String| Error::Settings {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| settings_error(e.to_string()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| settings_error(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| settings_error(e.to_string()))
        }
    }

    /// Convert the fields that are present into options, in declaration order.
    pub fn into_options(self) -> Vec<ClientOption> {
        let Settings {
            token,
            org_id,
            model,
            provider,
            base_url,
            api_version,
            proxy_url,
            socks_url,
            timeout_secs,
            max_tokens,
            temperature,
            top_p,
            presence_penalty,
            frequency_penalty,
            headers,
            skip_verify,
            vision_models,
        } = self;

        let mut options = Vec::new();
        options.extend(token.map(ClientOption::Token));
        options.extend(org_id.map(ClientOption::OrgId));
        options.extend(model.map(ClientOption::Model));
        options.extend(provider.map(ClientOption::Provider));
        options.extend(base_url.map(ClientOption::BaseUrl));
        options.extend(api_version.map(ClientOption::ApiVersion));
        options.extend(proxy_url.map(ClientOption::ProxyUrl));
        options.extend(socks_url.map(ClientOption::SocksUrl));
        options.extend(timeout_secs.map(|s| ClientOption::Timeout(Duration::from_secs(s))));
        options.extend(max_tokens.map(ClientOption::MaxTokens));
        options.extend(temperature.map(ClientOption::Temperature));
        options.extend(top_p.map(ClientOption::TopP));
        options.extend(presence_penalty.map(ClientOption::PresencePenalty));
        options.extend(frequency_penalty.map(ClientOption::FrequencyPenalty));
        options.extend(headers.map(ClientOption::Headers));
        options.extend(skip_verify.map(ClientOption::SkipVerify));
        options.extend(vision_models.map(ClientOption::VisionModels));
        options
    }
}
