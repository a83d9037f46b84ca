//! Guards: boolean checks that decide whether a rule runs at all.
//!
//! A [`Query`] answers yes or no for an input. [`filter`] wraps a rule so it is
//! only evaluated when the query says yes. [`Queries`] is a small registry for
//! sharing named guards across a rule tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_stream::try_stream;
use futures::StreamExt;

use crate::flow::{Eventual, Flow, first};
use crate::matching::{Match, Scoped};
use crate::rule::Rule;
use crate::scope::Scope;

/// A boolean check on an input.
///
/// Only the first value a query emits counts. A query that completes without
/// emitting anything counts as `false`.
pub trait Query<S>: Send + Sync + 'static {
    /// Checks `input`.
    fn test(&self, input: S, scope: &Scope) -> Eventual<bool>;
}

impl<S, F> Query<S> for F
where
    F: Fn(S) -> Eventual<bool> + Send + Sync + 'static,
{
    fn test(&self, input: S, _scope: &Scope) -> Eventual<bool> {
        self(input)
    }
}

impl<S, F> Query<S> for Scoped<F>
where
    F: Fn(S, &Scope) -> Eventual<bool> + Send + Sync + 'static,
{
    fn test(&self, input: S, scope: &Scope) -> Eventual<bool> {
        (self.0)(input, scope)
    }
}

/// Only evaluates `rule` when `query` holds for the input.
///
/// When the query is false (or empty) the inner rule is never evaluated and
/// the result is empty. When it is true, the inner rule's matches are
/// forwarded unchanged. A failing query fails the whole evaluation.
pub fn filter<S, O, Q>(query: Q, rule: Rule<S, O>) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
    Q: Query<S>,
{
    guarded(Arc::new(query), rule)
}

pub(crate) fn guarded<S, O>(query: Arc<dyn Query<S>>, rule: Rule<S, O>) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Rule::from_fn(move |input: S, scope: &Scope| {
        gate(Arc::clone(&query), rule.clone(), input, scope.clone())
    })
}

fn gate<S, O>(
    query: Arc<dyn Query<S>>,
    rule: Rule<S, O>,
    input: S,
    scope: Scope,
) -> Flow<Match<O>>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Box::pin(try_stream! {
        let open = first(query.test(input.clone(), &scope).into_flow()).await?;
        if open == Some(true) {
            let mut matches = rule.evaluate(input, &scope);
            while let Some(found) = matches.next().await {
                yield found?;
            }
        }
    })
}

/// A registry of named queries.
///
/// Handy when several branches of a rule tree share the same guard, e.g. a
/// conversation-state check:
///
/// ```rust,ignore
/// let queries = Queries::new()
///     .with("has_recipe", move |_: String| Eventual::ready(state.lock().recipe.is_some()));
///
/// let next = queries.guard("has_recipe", next_step).expect("registered above");
/// ```
pub struct Queries<S> {
    entries: HashMap<String, Arc<dyn Query<S>>>,
}

impl<S> Default for Queries<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> Clone for Queries<S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<S> Queries<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `query` under `name`, replacing any previous entry.
    pub fn add<Q: Query<S>>(&mut self, name: impl Into<String>, query: Q) {
        self.entries.insert(name.into(), Arc::new(query));
    }

    /// Builder form of [`add`](Self::add).
    pub fn with<Q: Query<S>>(mut self, name: impl Into<String>, query: Q) -> Self {
        self.add(name, query);
        self
    }

    /// Looks up a query by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Query<S>>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Guards `rule` with the query registered as `name`.
    ///
    /// Returns `None` if no such query exists.
    pub fn guard<O>(&self, name: &str, rule: Rule<S, O>) -> Option<Rule<S, O>>
    where
        O: Send + 'static,
    {
        self.get(name).map(|query| guarded(query, rule))
    }
}

impl<S> fmt::Debug for Queries<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort_unstable();
        f.debug_struct("Queries").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::BoxError;
    use crate::matching::Scored;
    use crate::rule::rule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted_rule(evaluations: Arc<AtomicUsize>) -> Rule<String, &'static str> {
        rule(
            move |_: String| {
                evaluations.fetch_add(1, Ordering::SeqCst);
                Eventual::ready(Some(Scored::bare(0.8)))
            },
            |_: String, _: ()| Eventual::ready("inner"),
        )
    }

    async fn reply(rule: &Rule<String, &'static str>, input: &str) -> Option<&'static str> {
        match first(rule.evaluate(input.to_string(), &Scope::new())).await.unwrap() {
            Some(found) => first(found.action()).await.unwrap(),
            None => None,
        }
    }

    #[tokio::test]
    async fn test_open_query_forwards_matches() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let guarded = filter(
            |_: String| Eventual::ready(true),
            counted_rule(Arc::clone(&evaluations)),
        );

        let found = first(guarded.evaluate(String::new(), &Scope::new()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.score(), 0.8);
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_query_never_evaluates_rule() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let guarded = filter(
            |_: String| Eventual::ready(false),
            counted_rule(Arc::clone(&evaluations)),
        );

        assert_eq!(reply(&guarded, "anything").await, None);
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_query_counts_as_false() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let guarded =
            counted_rule(Arc::clone(&evaluations)).when(|_: String| Eventual::<bool>::empty());

        assert_eq!(reply(&guarded, "anything").await, None);
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_only_first_query_value_counts() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let guarded = filter(
            |_: String| {
                Eventual::stream(futures::stream::iter(vec![Ok::<_, BoxError>(false), Ok(true)]))
            },
            counted_rule(Arc::clone(&evaluations)),
        );

        assert_eq!(reply(&guarded, "anything").await, None);
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let guarded = filter(
            |_: String| Eventual::<bool>::fail("state store unreachable"),
            counted_rule(Arc::new(AtomicUsize::new(0))),
        );

        let err = first(guarded.evaluate(String::new(), &Scope::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "state store unreachable");
    }

    #[tokio::test]
    async fn test_query_sees_input() {
        let guarded = counted_rule(Arc::new(AtomicUsize::new(0))).when(|text: String| {
            Eventual::future(async move { Ok::<_, BoxError>(text == "go") })
        });

        assert_eq!(reply(&guarded, "go").await, Some("inner"));
        assert_eq!(reply(&guarded, "stop").await, None);
    }

    #[tokio::test]
    async fn test_registry_guard() {
        let queries = Queries::new()
            .with("always", |_: String| Eventual::ready(true))
            .with("never", |_: String| Eventual::ready(false));

        assert_eq!(queries.len(), 2);
        assert!(queries.contains("always"));
        assert_eq!(queries.names(), vec!["always", "never"]);

        let evaluations = Arc::new(AtomicUsize::new(0));
        let open = queries.guard("always", counted_rule(Arc::clone(&evaluations))).unwrap();
        let closed = queries.guard("never", counted_rule(Arc::clone(&evaluations))).unwrap();

        assert_eq!(reply(&open, "x").await, Some("inner"));
        assert_eq!(reply(&closed, "x").await, None);
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);

        assert!(queries.guard("missing", counted_rule(evaluations)).is_none());
    }
}
