//! Scored results, matches, and the matcher/action capabilities.
//!
//! A [`Matcher`] looks at an input and may emit a [`Scored`] result carrying
//! whatever arguments it extracted. An [`Action`] reacts to an input plus those
//! arguments. [`rule`](crate::rule) pairs the two; each scored result becomes a
//! [`Match`] whose action has not run yet.
//!
//! Both capabilities are implemented for plain closures:
//!
//! ```rust,ignore
//! use arbiter_core::{Eventual, Scored, rule};
//!
//! let greet = rule(
//!     |text: String| Eventual::ready(text.starts_with("hi").then(|| Scored::new(1.0, ()))),
//!     |text: String, _args: ()| Eventual::ready(format!("you said {text}")),
//! );
//! ```
//!
//! Matchers that want to observe cancellation wrap a two-argument closure in
//! [`Scoped`].

use std::fmt;
use std::sync::Arc;

use crate::flow::{Eventual, Flow};
use crate::scope::Scope;

/// The score that ends a best-of evaluation immediately.
pub const PERFECT_SCORE: f64 = 1.0;

/// A successful matcher result: a score plus the matched arguments.
///
/// Scores conventionally lie in `[0, 1]`. Anything else is legal but never
/// counts as a perfect match.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<A> {
    /// How well the input matched.
    pub score: f64,
    /// Whatever the matcher extracted for the action.
    pub args: A,
}

impl<A> Scored<A> {
    /// Creates a scored result.
    pub fn new(score: f64, args: A) -> Self {
        Self { score, args }
    }

    /// Returns whether this is a perfect (decisive) score.
    pub fn is_perfect(&self) -> bool {
        self.score == PERFECT_SCORE
    }
}

impl Scored<()> {
    /// A scored result with no arguments.
    pub fn bare(score: f64) -> Self {
        Self::new(score, ())
    }
}

type Thunk<O> = Arc<dyn Fn() -> Flow<O> + Send + Sync>;

/// The outcome of a successful rule evaluation: a score and a deferred action.
///
/// Nothing runs until [`Match::action`] is called. Calling it more than once is
/// safe (each call re-runs the action), but the executor and combinators in
/// this crate call it at most once per match.
pub struct Match<O> {
    score: f64,
    action: Thunk<O>,
    origin: Option<Arc<str>>,
}

impl<O> Clone for Match<O> {
    fn clone(&self) -> Self {
        Self {
            score: self.score,
            action: Arc::clone(&self.action),
            origin: self.origin.clone(),
        }
    }
}

impl<O> Match<O> {
    /// Creates a match from a score and an action thunk.
    pub fn new<F>(score: f64, action: F) -> Self
    where
        F: Fn() -> Flow<O> + Send + Sync + 'static,
    {
        Self {
            score,
            action: Arc::new(action),
            origin: None,
        }
    }

    /// The match score.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Returns whether this is a perfect (decisive) match.
    pub fn is_perfect(&self) -> bool {
        self.score == PERFECT_SCORE
    }

    /// Name of the innermost named rule this match came from.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub(crate) fn origin_label(&self) -> Option<Arc<str>> {
        self.origin.clone()
    }

    /// Runs the deferred action.
    pub fn action(&self) -> Flow<O> {
        (self.action)()
    }

    pub(crate) fn stamp(mut self, name: &Arc<str>) -> Self {
        if self.origin.is_none() {
            self.origin = Some(Arc::clone(name));
        }
        self
    }
}

impl<O> fmt::Debug for Match<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("score", &self.score)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Scores an input, possibly asynchronously, possibly declining to score.
///
/// Emitting `None` means "no match"; every `Some` becomes a [`Match`].
pub trait Matcher<S>: Send + Sync + 'static {
    /// Arguments handed to the action on a match.
    type Args: Clone + Send + Sync + 'static;

    /// Scores `input`.
    fn score(&self, input: S, scope: &Scope) -> Eventual<Option<Scored<Self::Args>>>;
}

impl<S, A, F> Matcher<S> for F
where
    F: Fn(S) -> Eventual<Option<Scored<A>>> + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    type Args = A;

    fn score(&self, input: S, _scope: &Scope) -> Eventual<Option<Scored<A>>> {
        self(input)
    }
}

/// Reacts to a matched input. Only the first value it emits is used.
pub trait Action<S, A>: Send + Sync + 'static {
    /// What the action produces.
    type Output: Send + 'static;

    /// Runs the action for `input` with the matched `args`.
    fn act(&self, input: S, args: A) -> Eventual<Self::Output>;
}

impl<S, A, O, F> Action<S, A> for F
where
    F: Fn(S, A) -> Eventual<O> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn act(&self, input: S, args: A) -> Eventual<O> {
        self(input, args)
    }
}

/// Adapts a closure that also receives the evaluation [`Scope`].
///
/// Use it for matchers and queries that start work they should stop once the
/// evaluation is abandoned:
///
/// ```rust,ignore
/// let remote = Scoped(|text: String, scope: &Scope| {
///     let scope = scope.clone();
///     Eventual::future(async move {
///         tokio::select! {
///             scored = classifier.classify(text) => scored,
///             () = scope.abandoned() => Ok(None),
///         }
///     })
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Scoped<F>(pub F);

impl<S, A, F> Matcher<S> for Scoped<F>
where
    F: Fn(S, &Scope) -> Eventual<Option<Scored<A>>> + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    type Args = A;

    fn score(&self, input: S, scope: &Scope) -> Eventual<Option<Scored<A>>> {
        (self.0)(input, scope)
    }
}
