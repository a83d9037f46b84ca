//! Arbiter Runtime - configuration and logging for applications embedding the
//! rule engine.
//!
//! This crate provides:
//! - Layered configuration loading ([`ConfigLoader`], [`ArbiterConfig`])
//! - Logging setup ([`LoggingBuilder`], [`logging::init_from_config`])
//! - [`launch`], which ties both to an [`Engine`]
//!
//! ```rust,ignore
//! use arbiter_runtime::{config::load_config, launch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let engine = launch(build_rules(), &config)?;
//!
//!     let outcome = engine.run("I want to make pancakes".to_string()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;

use arbiter_core::{Engine, Rule};
use tracing::info;

pub use config::{
    ArbiterConfig, ConfigError, ConfigLoader, ConfigResult, EngineConfig, LoggingConfig,
};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Validates `config`, installs logging, and wraps `rule` in an [`Engine`].
pub fn launch<S, O>(rule: Rule<S, O>, config: &ArbiterConfig) -> ConfigResult<Engine<S, O>>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    config::validate_config(config)?;
    logging::init_from_config(&config.logging);

    let engine = config.engine.build(rule);
    info!(
        engine = engine.get_name().unwrap_or("unnamed"),
        trace_events = config.engine.trace_events,
        "Engine ready"
    );
    Ok(engine)
}

/// Prelude module for convenient imports.
///
/// Provides the logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `instrument`, `Level`
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
