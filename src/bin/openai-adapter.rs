//! OpenAI Adapter CLI
//!
//! Send one chat or image completion to OpenAI, Azure OpenAI or any
//! OpenAI-compatible endpoint.
//!
//! ```text
//! openai-adapter chat "Hello"
//! openai-adapter --base-url https://api.deepseek.com --model deepseek-chat chat "Hello"
//! openai-adapter --model gpt-4o image https://example.com/cat.png "Describe this image"
//! openai-adapter --json chat "Hello"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openai_adapter::{telemetry, ClientOption, Client, Provider, Response, Settings};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API token
const TOKEN_ENV: &str = "OPENAI_API_KEY";

#[derive(Parser)]
#[command(name = "openai-adapter")]
#[command(about = "Chat completions against OpenAI-compatible backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (YAML, or JSON with a .json extension); flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API token (default: $OPENAI_API_KEY)
    #[arg(long)]
    token: Option<String>,

    /// Organization id
    #[arg(long)]
    org_id: Option<String>,

    /// Model id
    #[arg(short, long)]
    model: Option<String>,

    /// Provider: openai or azure; anything else is treated as openai
    #[arg(long)]
    provider: Option<String>,

    /// Base URL of the API (required for everything but api.openai.com)
    #[arg(long)]
    base_url: Option<String>,

    /// API version (Azure)
    #[arg(long)]
    api_version: Option<String>,

    /// HTTP proxy URL
    #[arg(long)]
    proxy: Option<String>,

    /// SOCKS5 proxy address (ignored when --proxy is set)
    #[arg(long)]
    socks: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    max_tokens: Option<i64>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    top_p: Option<f32>,

    #[arg(long)]
    presence_penalty: Option<f32>,

    #[arg(long)]
    frequency_penalty: Option<f32>,

    /// Extra header as Key=Value (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Skip TLS certificate verification (development only)
    #[arg(long)]
    skip_verify: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the response as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a chat completion
    Chat {
        /// User message
        content: String,

        /// System prompt
        #[arg(short, long, default_value = "")]
        prompt: String,
    },

    /// Ask about an image
    Image {
        /// Image URL
        image: String,

        /// User message
        content: String,

        /// System prompt
        #[arg(short, long, default_value = "")]
        prompt: String,
    },
}

/// Build the option list: settings file first, then environment, then flags.
fn build_options(cli: &Cli) -> Result<Vec<ClientOption>> {
    let mut options = match &cli.config {
        Some(path) => Settings::load_from(path)?.into_options(),
        None => Vec::new(),
    };

    let has_file_token = options
        .iter()
        .any(|option| matches!(option, ClientOption::Token(_)));
    if !has_file_token {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            options.push(ClientOption::Token(token));
        }
    }

    options.extend(cli.token.clone().map(ClientOption::Token));
    options.extend(cli.org_id.clone().map(ClientOption::OrgId));
    options.extend(cli.model.clone().map(ClientOption::Model));
    options.extend(cli.provider.clone().map(ClientOption::Provider));
    options.extend(cli.base_url.clone().map(ClientOption::BaseUrl));
    options.extend(cli.api_version.clone().map(ClientOption::ApiVersion));
    options.extend(cli.proxy.clone().map(ClientOption::ProxyUrl));
    options.extend(cli.socks.clone().map(ClientOption::SocksUrl));
    options.extend(cli.timeout.map(|s| ClientOption::Timeout(Duration::from_secs(s))));
    options.extend(cli.max_tokens.map(ClientOption::MaxTokens));
    options.extend(cli.temperature.map(ClientOption::Temperature));
    options.extend(cli.top_p.map(ClientOption::TopP));
    options.extend(cli.presence_penalty.map(ClientOption::PresencePenalty));
    options.extend(cli.frequency_penalty.map(ClientOption::FrequencyPenalty));
    if !cli.headers.is_empty() {
        options.push(ClientOption::Headers(cli.headers.clone()));
    }
    if cli.skip_verify {
        options.push(ClientOption::SkipVerify(true));
    }

    Ok(options)
}

#[derive(Serialize)]
struct Output<'a> {
    provider: Provider,
    model: &'a str,
    #[serde(flatten)]
    response: &'a Response,
}

fn print_json(client: &Client, response: &Response) -> Result<()> {
    let output = Output {
        provider: client.provider(),
        model: client.model(),
        response,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_response(response: &Response) {
    println!("{}", response.content);
    eprintln!(
        "[tokens: prompt={} completion={} total={}]",
        response.usage.prompt_tokens, response.usage.completion_tokens, response.usage.total_tokens
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before reading OPENAI_API_KEY
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.json_logs);

    let client = Client::new(build_options(&cli)?).context("Failed to create client")?;

    let response = match &cli.command {
        Commands::Chat { content, prompt } => client.completion(prompt, content).await?,
        Commands::Image {
            image,
            content,
            prompt,
        } => client.image_completion(image, prompt, content).await?,
    };

    if cli.json {
        print_json(&client, &response)?;
    } else {
        print_response(&response);
    }
    Ok(())
}
