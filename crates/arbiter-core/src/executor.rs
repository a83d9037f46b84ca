//! Running a rule tree against an input.
//!
//! [`do_rule`] is the bare entry point: evaluate, take the first match, run its
//! action. [`Engine`] wraps a root rule with an observer and a name, reports a
//! typed [`Outcome`], and plugs into `tower` as a [`Service`].

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::try_stream;
use futures::StreamExt;
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, Level, span};

use crate::flow::{BoxError, Flow, first};
use crate::observe::{Observer, TraceEvent, TracingObserver};
use crate::rule::Rule;
use crate::scope::Scope;

/// Evaluates `rule` against `input` and runs the winning action.
///
/// The first match the rule produces wins; its action is invoked exactly once
/// and its result forwarded. If nothing matches the flow is empty. Failures
/// from matchers, queries and the action are forwarded unchanged.
///
/// Matching stops once a winner is found or the returned flow is dropped:
/// every scope handed to a matcher is abandoned by then.
pub fn do_rule<S, O>(input: S, rule: &Rule<S, O>) -> Flow<O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    dispatch_in(rule.clone(), input, Scope::new())
}

fn dispatch_in<S, O>(rule: Rule<S, O>, input: S, scope: Scope) -> Flow<O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Box::pin(try_stream! {
        let winner = first(rule.evaluate(input, &scope)).await;
        scope.abandon();
        if let Some(found) = winner? {
            scope.emit(TraceEvent::ActionInvoked {
                rule: found.origin_label(),
                score: found.score(),
            });
            let mut effects = found.action();
            while let Some(effect) = effects.next().await {
                yield effect?;
            }
        }
    })
}

/// How a dispatch ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<O> {
    /// A rule matched and its action produced this value.
    Completed(O),
    /// No rule matched, or the winning action produced nothing.
    NoMatch,
}

impl<O> Outcome<O> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    /// Converts into an `Option`, dropping the distinction.
    pub fn into_option(self) -> Option<O> {
        match self {
            Self::Completed(value) => Some(value),
            Self::NoMatch => None,
        }
    }
}

/// A root rule plus the observer its evaluations report to.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Engine::new(first_match(vec![greet, fallback])).name("chat");
///
/// match engine.run(text).await? {
///     Outcome::Completed(reply) => send(reply).await,
///     Outcome::NoMatch => {}
/// }
/// ```
pub struct Engine<S, O> {
    rule: Rule<S, O>,
    observer: Arc<dyn Observer>,
    name: Option<Arc<str>>,
}

impl<S, O> Clone for Engine<S, O> {
    fn clone(&self) -> Self {
        Self {
            rule: self.rule.clone(),
            observer: Arc::clone(&self.observer),
            name: self.name.clone(),
        }
    }
}

impl<S, O> Engine<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates an engine reporting to [`TracingObserver`].
    pub fn new(rule: Rule<S, O>) -> Self {
        Self {
            rule,
            observer: Arc::new(TracingObserver),
            name: None,
        }
    }

    /// Replaces the observer.
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets a name for this engine (used in the dispatch span).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(Arc::from(name.into()));
        self
    }

    /// Returns the name of this engine, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The root rule.
    pub fn rule(&self) -> &Rule<S, O> {
        &self.rule
    }

    /// A fresh root scope reporting to this engine's observer.
    pub fn scope(&self) -> Scope {
        Scope::with_observer(Arc::clone(&self.observer))
    }

    /// Like [`do_rule`], reporting to this engine's observer.
    pub fn dispatch(&self, input: S) -> Flow<O> {
        dispatch_in(self.rule.clone(), input, self.scope())
    }

    /// Dispatches `input` and waits for the outcome.
    pub async fn run(&self, input: S) -> Result<Outcome<O>, BoxError> {
        let engine = self.name.as_deref().unwrap_or("unnamed");
        let span = span!(Level::DEBUG, "dispatch", engine = %engine);

        let effect = first(self.dispatch(input)).instrument(span).await?;
        Ok(match effect {
            Some(value) => Outcome::Completed(value),
            None => Outcome::NoMatch,
        })
    }
}

impl<S, O> fmt::Debug for Engine<S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

/// Lets `tower` middleware (timeouts, rate limits, ...) wrap an engine.
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use tower::timeout::TimeoutLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(TimeoutLayer::new(Duration::from_secs(5)))
///     .service(engine);
/// ```
impl<S, O> Service<S> for Engine<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    type Response = Outcome<O>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Outcome<O>, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, input: S) -> Self::Future {
        let engine = self.clone();
        Box::pin(async move { engine.run(input).await })
    }
}
