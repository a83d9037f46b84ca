//! # Arbiter Core
//!
//! An asynchronous rule-dispatch engine.
//!
//! Given an input, the engine picks at most one winning rule out of a
//! prioritized or scored set and runs that rule's deferred action exactly once.
//! Matchers may answer synchronously, through a single future, or as a stream
//! of results over time (a remote intent classifier, say); everything is
//! normalized into the same lazy [`Flow`].
//!
//! ## Building Blocks
//!
//! - **Matcher** ([`Matcher`]): scores an input, possibly declining.
//! - **Action** ([`Action`]): reacts to a matched input.
//! - **Rule** ([`Rule`], [`rule`]): a matcher paired with an action, yielding
//!   [`Match`]es whose actions have not run yet.
//! - **Query** ([`Query`], [`filter`]): a boolean guard in front of a rule.
//!
//! ## Combinators
//!
//! - [`first_match`]: first rule (in declaration order) that matches wins.
//! - [`best_match`]: all rules race, highest score wins, `1.0` wins at once.
//!
//! Combinators return rules, so trees nest:
//!
//! ```text
//! first_match ─┬─ filter(has_recipe) ── best_match ─┬─ next
//!              │                                    ├─ previous
//!              │                                    └─ repeat
//!              └─ choose_recipe
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbiter_core::{Eventual, Scored, do_rule, first_match, rule};
//!
//! let greet = rule(
//!     |text: String| Eventual::ready(text.starts_with("hi").then(|| Scored::bare(1.0))),
//!     |_: String, _: ()| Eventual::ready("hello!".to_string()),
//! );
//! let fallback = rule(
//!     |_: String| Eventual::ready(Some(Scored::bare(0.1))),
//!     |_: String, _: ()| Eventual::ready("say what?".to_string()),
//! );
//!
//! let mut replies = do_rule("hi there".to_string(), &first_match(vec![greet, fallback]));
//! ```
//!
//! ## Cancellation
//!
//! Every evaluation runs inside a [`Scope`]. Combinators abandon the scopes of
//! superseded evaluations; see the [`scope`] module.

pub mod combinator;
pub mod executor;
pub mod flow;
pub mod input;
pub mod matching;
pub mod observe;
pub mod query;
pub mod rule;
pub mod scope;

pub use combinator::{best_match, best_match_stream, first_match, first_match_stream};
pub use executor::{Engine, Outcome, do_rule};
pub use flow::{BoxError, Eventual, Flow, first};
pub use input::TextInput;
pub use matching::{Action, Match, Matcher, PERFECT_SCORE, Scored, Scoped};
pub use observe::{NoopObserver, Observer, TraceEvent, TracingObserver};
pub use query::{Queries, Query, filter};
pub use rule::{Rule, rule};
pub use scope::Scope;
