//! # Arbiter
//!
//! Composable asynchronous rule dispatch.
//!
//! Given an input (a chat message, a command, an event), Arbiter picks at most
//! one winning rule and runs its action exactly once. Rules are built from a
//! matcher and an action, guarded by queries, and combined with
//! `first_match` (priority order) or `best_match` (concurrent, highest score).
//!
//! ```text
//!  input ──▶ filter(query) ──▶ first_match / best_match ──▶ Match ──▶ action
//!                                      │
//!                               rule = matcher + action
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arbiter::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let greet = rule(
//!         |text: String| Eventual::ready(text.starts_with("hi").then(|| Scored::bare(1.0))),
//!         |_: String, _: ()| Eventual::ready("hello!".to_string()),
//!     )
//!     .name("greet");
//!
//!     let engine = launch(first_match(vec![greet]), &load_config()?)?;
//!     if let Outcome::Completed(reply) = engine.run("hi there".to_string()).await? {
//!         println!("{reply}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use arbiter_core as core;
pub use arbiter_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use arbiter::prelude::*;
/// ```
pub mod prelude {
    // Building blocks
    pub use arbiter_core::{
        Action, BoxError, Eventual, Flow, Match, Matcher, PERFECT_SCORE, Queries, Query, Rule,
        Scope, Scored, Scoped, TextInput, filter, rule,
    };

    // Combinators and execution
    pub use arbiter_core::{
        Engine, Outcome, best_match, best_match_stream, do_rule, first, first_match,
        first_match_stream,
    };

    // Observability
    pub use arbiter_core::{NoopObserver, Observer, TraceEvent, TracingObserver};

    // Configuration and logging
    pub use arbiter_runtime::config::{ConfigLoader, load_config};
    pub use arbiter_runtime::{ArbiterConfig, ConfigError, LoggingBuilder, launch};

    // Logging macros
    pub use arbiter_runtime::prelude::*;
}
