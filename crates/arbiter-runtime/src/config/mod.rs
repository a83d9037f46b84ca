//! Configuration for applications embedding the engine.
//!
//! Layered loading (defaults, files, environment, overrides) through figment,
//! plus validation of the combined result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, Profile, load_config};
pub use schema::{
    ArbiterConfig, EngineConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
