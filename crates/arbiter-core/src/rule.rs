//! Rules: the unit of composition.
//!
//! A [`Rule`] evaluates an input to a [`Flow`] of [`Match`]es. Leaf rules come
//! from [`rule`] (a matcher paired with an action); combinators such as
//! [`first_match`](crate::first_match) and [`best_match`](crate::best_match)
//! take rules and return a rule, so trees nest arbitrarily.
//!
//! # Cheap Cloning
//!
//! `Rule` keeps its state behind an `Arc`, so clones share the same evaluator.
//! Builder methods use copy-on-write, like the rest of the crate.

use std::fmt;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::flow::{BoxError, Flow};
use crate::matching::{Action, Match, Matcher, Scored};
use crate::observe::TraceEvent;
use crate::query::{Query, filter};
use crate::scope::Scope;

type EvalFn<S, O> = dyn Fn(S, &Scope) -> Flow<Match<O>> + Send + Sync;

/// Internal data for a rule.
struct RuleInner<S, O> {
    /// Produces the matches for one input.
    eval: Arc<EvalFn<S, O>>,

    /// Optional name, used in trace events and as the origin of matches.
    name: Option<Arc<str>>,
}

impl<S, O> Clone for RuleInner<S, O> {
    fn clone(&self) -> Self {
        Self {
            eval: Arc::clone(&self.eval),
            name: self.name.clone(),
        }
    }
}

/// Evaluates an input to zero or more [`Match`]es.
pub struct Rule<S, O> {
    inner: Arc<RuleInner<S, O>>,
}

impl<S, O> Clone for Rule<S, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, O> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates a rule from a matcher and an action.
    ///
    /// Every non-empty result of the matcher becomes one [`Match`] carrying
    /// the result's score. The match's action runs `action` with the input and
    /// the matched arguments and keeps only its first emitted value. Matching
    /// alone never runs the action.
    pub fn new<M, Ac>(matcher: M, action: Ac) -> Self
    where
        M: Matcher<S>,
        Ac: Action<S, M::Args, Output = O>,
    {
        let matcher = Arc::new(matcher);
        let action = Arc::new(action);

        Self::from_fn(move |input: S, scope: &Scope| {
            let action = Arc::clone(&action);
            let pending = input.clone();
            matcher
                .score(input, scope)
                .into_flow()
                .try_filter_map(move |result| {
                    let found = result.map(|scored| defer(pending.clone(), scored, &action));
                    future::ready(Ok::<_, BoxError>(found))
                })
                .boxed()
        })
    }

    /// Creates a rule from its raw evaluation function.
    ///
    /// The function is only called once the returned flow is first polled.
    pub fn from_fn<F>(eval: F) -> Self
    where
        F: Fn(S, &Scope) -> Flow<Match<O>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(RuleInner {
                eval: Arc::new(eval),
                name: None,
            }),
        }
    }

    /// Internal helper to get mutable access to inner.
    fn inner_mut(&mut self) -> &mut RuleInner<S, O> {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a name for this rule (useful for tracing).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(Arc::from(name.into()));
        self
    }

    /// Returns the name of this rule, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub(crate) fn label(&self) -> Option<Arc<str>> {
        self.inner.name.clone()
    }

    /// Guards this rule with `query`; see [`filter`].
    pub fn when<Q>(self, query: Q) -> Self
    where
        Q: Query<S>,
    {
        filter(query, self)
    }

    /// Evaluates this rule against `input`.
    ///
    /// The evaluation runs in a child of `scope`. The returned flow is lazy,
    /// ends as soon as `scope` is abandoned, and abandons the child scope when
    /// dropped, so matchers watching [`Scope::abandoned`] stop with it.
    pub fn evaluate(&self, input: S, scope: &Scope) -> Flow<Match<O>> {
        let inner = Arc::clone(&self.inner);
        let scope = scope.child();
        let outer = scope.clone();

        let matches = stream::once(async move {
            outer.emit(TraceEvent::RuleEvaluated {
                rule: inner.name.clone(),
            });

            let name = inner.name.clone();
            let reporter = outer.clone();
            (inner.eval)(input, &outer).map_ok(move |found| {
                reporter.emit(TraceEvent::MatchFound {
                    rule: name.clone(),
                    score: found.score(),
                });
                match &name {
                    Some(name) => found.stamp(name),
                    None => found,
                }
            })
        })
        .flatten()
        .boxed();

        scope.bound(matches)
    }
}

impl<S, O> fmt::Debug for Rule<S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

/// Builds the match for one scored result.
fn defer<S, A, Ac>(input: S, scored: Scored<A>, action: &Arc<Ac>) -> Match<Ac::Output>
where
    S: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    Ac: Action<S, A>,
{
    let Scored { score, args } = scored;
    let action = Arc::clone(action);

    Match::new(score, move || {
        action
            .act(input.clone(), args.clone())
            .into_flow()
            .take(1)
            .boxed()
    })
}

/// Pairs a matcher with an action; shorthand for [`Rule::new`].
pub fn rule<S, M, Ac>(matcher: M, action: Ac) -> Rule<S, Ac::Output>
where
    S: Clone + Send + Sync + 'static,
    M: Matcher<S>,
    Ac: Action<S, M::Args>,
{
    Rule::new(matcher, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Eventual, first};
    use crate::matching::Scoped;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text_rule(
        needle: &'static str,
        score: f64,
        actions: Arc<AtomicUsize>,
    ) -> Rule<String, String> {
        rule(
            move |text: String| {
                Eventual::ready(text.contains(needle).then(|| Scored::bare(score)))
            },
            move |text: String, _args: ()| {
                actions.fetch_add(1, Ordering::SeqCst);
                Eventual::ready(format!("{needle}: {text}"))
            },
        )
    }

    async fn collect(flow: Flow<Match<String>>) -> Vec<Match<String>> {
        flow.map(|item| item.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_empty_results_are_filtered() {
        let matcher = |_: String| {
            Eventual::stream(futures::stream::iter(vec![
                Ok::<_, BoxError>(None),
                Ok(None),
                Ok(Some(Scored::new(0.4, "args"))),
            ]))
        };
        let rule = rule(matcher, |_: String, args: &'static str| {
            Eventual::ready(args.to_string())
        });

        let matches = collect(rule.evaluate("input".into(), &Scope::new())).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score(), 0.4);
        assert_eq!(first(matches[0].action()).await.unwrap().as_deref(), Some("args"));
    }

    #[tokio::test]
    async fn test_matching_does_not_run_action() {
        let actions = Arc::new(AtomicUsize::new(0));
        let rule = text_rule("next", 1.0, Arc::clone(&actions));

        let matches = collect(rule.evaluate("next please".into(), &Scope::new())).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(actions.load(Ordering::SeqCst), 0);

        let reply = first(matches[0].action()).await.unwrap();
        assert_eq!(reply.as_deref(), Some("next: next please"));
        assert_eq!(actions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let rule = text_rule("next", 1.0, Arc::new(AtomicUsize::new(0)));
        assert!(collect(rule.evaluate("back".into(), &Scope::new())).await.is_empty());
    }

    #[tokio::test]
    async fn test_action_keeps_first_value_only() {
        let rule = rule(
            |_: String| Eventual::ready(Some(Scored::bare(0.9))),
            |_: String, _: ()| {
                Eventual::stream(futures::stream::iter(vec![
                    Ok::<_, BoxError>(1),
                    Ok(2),
                    Ok(3),
                ]))
            },
        );

        let matches = collect_numbers(rule.evaluate(String::new(), &Scope::new())).await;
        let effects: Vec<u32> = matches[0]
            .action()
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(effects, vec![1]);
    }

    async fn collect_numbers(flow: Flow<Match<u32>>) -> Vec<Match<u32>> {
        flow.map(|item| item.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_matcher_failure_propagates() {
        let rule = rule(
            |_: String| Eventual::<Option<Scored<()>>>::fail("classifier unavailable"),
            |_: String, _: ()| Eventual::ready(()),
        );

        let err = first(rule.evaluate(String::new(), &Scope::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "classifier unavailable");
    }

    #[tokio::test]
    async fn test_evaluation_is_lazy() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let rule = rule(
            move |_: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                Eventual::ready(Some(Scored::bare(1.0)))
            },
            |_: String, _: ()| Eventual::ready(()),
        );

        let flow = rule.evaluate(String::new(), &Scope::new());
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
        drop(flow);
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_named_rule_stamps_origin() {
        let rule = text_rule("next", 1.0, Arc::new(AtomicUsize::new(0))).name("next");
        assert_eq!(rule.get_name(), Some("next"));

        let matches = collect(rule.evaluate("next".into(), &Scope::new())).await;
        assert_eq!(matches[0].origin(), Some("next"));
    }

    #[tokio::test]
    async fn test_abandoned_scope_stops_matches() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let rule = rule(
            Scoped(move |_: String, _scope: &Scope| {
                counter.fetch_add(1, Ordering::SeqCst);
                Eventual::ready(Some(Scored::bare(1.0)))
            }),
            |_: String, _: ()| Eventual::ready(()),
        );

        let scope = Scope::new();
        let child = scope.child();
        let flow = rule.evaluate(String::new(), &child);
        child.abandon();

        assert!(first(flow).await.unwrap().is_none());
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
        assert!(!scope.is_abandoned());
    }
}
