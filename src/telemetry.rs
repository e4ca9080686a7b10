//! Logging setup
//!
//! The library only emits `tracing` events (target `llm`). Binaries call
//! [`init`] once to install a subscriber. Logs go to stderr so stdout stays
//! free for model output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper=info,reqwest=info,h2=info,rustls=info"
    } else {
        "warn,llm=info,hyper=warn,reqwest=warn,h2=warn,rustls=warn"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling this more than once is a no-op.
pub fn init(verbose: bool, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
