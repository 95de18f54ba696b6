//! Logging initialization
//!
//! The engine logs through `tracing` with one target per area
//! (`bermuda::game`, `bermuda::opcodes`, ...). Filtering is done with
//! `RUST_LOG`, falling back to the profile default.

use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Human-readable output, debug level
    #[default]
    Development,
    /// JSON structured output, info level
    Production,
    /// Compact output, warnings only
    Test,
}

impl Profile {
    fn default_filter(self) -> &'static str {
        match self {
            Profile::Development => "bermuda=debug",
            Profile::Production => "bermuda=info",
            Profile::Test => "bermuda=warn",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber. Only the first call has an effect.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        // stdout carries the CLI's JSON, logs go to stderr
        let result = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::fmt()
                .compact()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish()
                .try_init(),
        };
        if let Err(e) = result {
            eprintln!("logging already initialized: {}", e);
        }
    });
}
