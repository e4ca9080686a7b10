//! OpenAI-compatible provider client
//!
//! Assembles a transport-bound async-openai client from a [`Config`] and
//! exposes chat completion calls. Each call builds one request and makes one
//! round trip; nothing is retried or cached here, and the SDK's own
//! rate-limit backoff is switched off.

use super::capability::{Capability, CapabilityTable};
use super::transport::build_http_client;
use crate::config::{
    ClientOption, Config, Provider, DEFAULT_AZURE_API_VERSION, DEFAULT_SYSTEM_PROMPT,
    OPENAI_API_BASE,
};
use crate::error::{Error, Result};
use async_openai::{
    config::{AzureConfig, OpenAIConfig},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CompletionUsage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ImageUrlArgs,
    },
    Client as SdkClient,
};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Token accounting for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<CompletionUsage> for Usage {
    fn from(usage: CompletionUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Text of the first choice plus usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub content: String,
    pub usage: Usage,
}

impl Response {
    /// Take the first choice of `response`, failing on an empty choice list.
    pub fn from_completion(response: CreateChatCompletionResponse) -> Result<Self> {
        let choice = response.choices.into_iter().next().ok_or(Error::EmptyResponse)?;

        Ok(Self {
            content: choice.message.content.unwrap_or_default(),
            usage: response.usage.map(Usage::from).unwrap_or_default(),
        })
    }
}

// async-openai retries 429 responses by default; a zero elapsed budget
// hands the first failure straight back.
fn no_retry() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

#[derive(Clone)]
enum Backend {
    OpenAI(SdkClient<OpenAIConfig>),
    Azure(SdkClient<AzureConfig>),
}

impl Backend {
    async fn create_chat(
        &self,
        request: CreateChatCompletionRequest,
    ) -> std::result::Result<CreateChatCompletionResponse, async_openai::error::OpenAIError> {
        match self {
            Backend::OpenAI(client) => client.chat().create(request).await,
            Backend::Azure(client) => client.chat().create(request).await,
        }
    }
}

/// Chat completion client bound to one provider and model
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    backend: Backend,
    provider: Provider,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    capabilities: CapabilityTable,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("presence_penalty", &self.presence_penalty)
            .field("frequency_penalty", &self.frequency_penalty)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client from options applied in order over the defaults.
    pub fn new<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        Self::from_config(Config::from_options(options))
    }

    /// Validate `config` and assemble the client.
    pub fn from_config(mut config: Config) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(&config)?;

        let backend = match config.provider {
            Provider::Azure => {
                // The deployment is always the configured model; no name mapping.
                let azure = AzureConfig::new()
                    .with_api_key(config.token.as_str())
                    .with_api_base(config.base_url.as_deref().unwrap_or_default())
                    .with_deployment_id(config.model.as_str())
                    .with_api_version(
                        config.api_version.as_deref().unwrap_or(DEFAULT_AZURE_API_VERSION),
                    );
                Backend::Azure(
                    SdkClient::with_config(azure)
                        .with_http_client(http_client)
                        .with_backoff(no_retry()),
                )
            }
            Provider::OpenAI => {
                let mut openai = OpenAIConfig::new()
                    .with_api_key(config.token.as_str())
                    .with_api_base(config.base_url.as_deref().unwrap_or(OPENAI_API_BASE));
                if let Some(org_id) = &config.org_id {
                    openai = openai.with_org_id(org_id.as_str());
                }
                if let Some(api_version) = &config.api_version {
                    tracing::debug!(
                        target: "llm",
                        api_version = %api_version,
                        "API version only applies to Azure; ignoring"
                    );
                }
                Backend::OpenAI(
                    SdkClient::with_config(openai)
                        .with_http_client(http_client)
                        .with_backoff(no_retry()),
                )
            }
        };

        let mut capabilities = CapabilityTable::default();
        for model in &config.vision_models {
            capabilities.insert(model.as_str(), Capability::Vision);
        }

        tracing::debug!(
            target: "llm",
            provider = %config.provider,
            model = %config.model,
            base_url = config.base_url.as_deref().unwrap_or(OPENAI_API_BASE),
            proxy = config.proxy_url.is_some() || config.socks_url.is_some(),
            headers = config.headers.len(),
            "Created provider client"
        );

        Ok(Self {
            backend,
            provider: config.provider,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            capabilities,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn presence_penalty(&self) -> f32 {
        self.presence_penalty
    }

    pub fn frequency_penalty(&self) -> f32 {
        self.frequency_penalty
    }

    /// Whether the configured model is known to accept image input
    pub fn supports_images(&self) -> bool {
        self.capabilities.supports(&self.model, Capability::Vision)
    }

    /// Build a request carrying the client's model and sampling parameters.
    #[allow(deprecated)]
    pub fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionRequest> {
        CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .frequency_penalty(self.frequency_penalty)
            .presence_penalty(self.presence_penalty)
            .messages(messages)
            .build()
            .map_err(Error::InvalidRequest)
    }

    /// Chat completion with a system prompt and one user message.
    ///
    /// An empty `prompt` sends [`DEFAULT_SYSTEM_PROMPT`].
    pub async fn create_chat_completion(
        &self,
        prompt: &str,
        content: &str,
    ) -> Result<CreateChatCompletionResponse> {
        let prompt = if prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            prompt
        };

        let messages = vec![system_message(prompt)?, user_message(content)?];
        self.send("chat completion", messages).await
    }

    /// Chat completion over a caller-managed message history.
    ///
    /// The messages are sent unmodified. The client keeps no history between calls.
    pub async fn create_chat_completion_with_messages(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse> {
        self.send("chat completion", messages).await
    }

    /// Chat completion returning the first choice's text.
    pub async fn completion(&self, prompt: &str, content: &str) -> Result<Response> {
        let response = self.create_chat_completion(prompt, content).await?;
        Response::from_completion(response)
    }

    /// Chat completion with an image, referenced by URL, next to `content`.
    ///
    /// A non-empty `prompt` is appended as a system message after the user message.
    pub async fn create_image_chat_completion(
        &self,
        image: &str,
        prompt: &str,
        content: &str,
    ) -> Result<CreateChatCompletionResponse> {
        let mut messages = vec![image_message(image, content)?];
        if !prompt.is_empty() {
            messages.push(system_message(prompt)?);
        }

        self.send("image chat completion", messages).await
    }

    /// Image chat completion returning the first choice's text.
    ///
    /// Fails with [`Error::UnsupportedOperation`] before any network activity
    /// when the model is not known to accept images. Register additional
    /// models with [`ClientOption::VisionModels`].
    pub async fn image_completion(
        &self,
        image: &str,
        prompt: &str,
        content: &str,
    ) -> Result<Response> {
        if !self.supports_images() {
            return Err(Error::UnsupportedOperation {
                operation: "image completion",
                model: self.model.clone(),
            });
        }

        let response = self
            .create_image_chat_completion(image, prompt, content)
            .await?;
        Response::from_completion(response)
    }

    async fn send(
        &self,
        operation: &'static str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse> {
        let message_count = messages.len();
        let request = self.build_request(messages)?;

        let start = Instant::now();
        let response = self
            .backend
            .create_chat(request)
            .await
            .map_err(Error::backend(operation))?;

        let usage = response.usage.clone().map(Usage::from).unwrap_or_default();
        tracing::info!(
            target: "llm",
            operation = operation,
            model = %self.model,
            message_count = message_count,
            choices = response.choices.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "LLM call completed"
        );

        Ok(response)
    }
}

fn system_message(prompt: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestSystemMessageArgs::default()
        .content(prompt)
        .build()
        .map_err(Error::InvalidRequest)?
        .into())
}

fn user_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(content)
        .build()
        .map_err(Error::InvalidRequest)?
        .into())
}

fn image_message(image: &str, content: &str) -> Result<ChatCompletionRequestMessage> {
    let text = ChatCompletionRequestMessageContentPartTextArgs::default()
        .text(content)
        .build()
        .map_err(Error::InvalidRequest)?;

    let image_url = ImageUrlArgs::default()
        .url(image)
        .build()
        .map_err(Error::InvalidRequest)?;
    let image = ChatCompletionRequestMessageContentPartImageArgs::default()
        .image_url(image_url)
        .build()
        .map_err(Error::InvalidRequest)?;

    let parts: Vec<ChatCompletionRequestUserMessageContentPart> =
        vec![text.into(), image.into()];
    Ok(ChatCompletionRequestUserMessageArgs::default()
        .content(parts)
        .build()
        .map_err(Error::InvalidRequest)?
        .into())
}
