//! Combinators that turn several rules into one.
//!
//! - [`first_match`]: priority order, one evaluation at a time.
//! - [`best_match`]: everything at once, highest score wins, a perfect score
//!   wins immediately.
//!
//! Both have `_stream` variants taking an asynchronous source of rules instead
//! of a fixed list. Combinators return a [`Rule`], so they nest.

use std::sync::Arc;

use async_stream::try_stream;
use futures::future;
use futures::stream::{self, BoxStream, SelectAll, Stream, StreamExt};

use crate::flow::{BoxError, Flow, first};
use crate::matching::Match;
use crate::observe::TraceEvent;
use crate::rule::Rule;
use crate::scope::Scope;

/// One turn of a combinator's event loop.
enum Step<E, R> {
    /// The running evaluation(s) produced something (or ended).
    Evaluated(Option<E>),
    /// The rule source produced a rule (or ended).
    Arrived(Option<R>),
}

/// Tries `rules` in order and yields the first match found.
///
/// Each rule runs in its own child scope and is fully given up on (its scope
/// abandoned) before the next one starts. Once a rule matches, later rules are
/// never evaluated. A failing rule fails the whole evaluation.
pub fn first_match<S, O, I>(rules: I) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
    I: IntoIterator<Item = Rule<S, O>>,
{
    let rules: Arc<[Rule<S, O>]> = rules.into_iter().collect();
    Rule::from_fn(move |input: S, scope: &Scope| {
        first_of(Arc::clone(&rules), input, scope.clone())
    })
}

fn first_of<S, O>(rules: Arc<[Rule<S, O>]>, input: S, scope: Scope) -> Flow<Match<O>>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Box::pin(try_stream! {
        for rule in rules.iter() {
            let child = scope.child();
            let found = first(rule.evaluate(input.clone(), &child)).await;
            child.abandon();

            if let Some(found) = found? {
                yield found;
                break;
            }
        }
    })
}

/// Like [`first_match`], but rules come from an asynchronous source.
///
/// `source` is called once per evaluation. When it produces a new rule while
/// the current one is still pending, the current evaluation is abandoned and
/// the new rule takes over. The first match produced ends the evaluation.
pub fn first_match_stream<S, O, F, St>(source: F) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn() -> St + Send + Sync + 'static,
    St: Stream<Item = Rule<S, O>> + Send + 'static,
{
    Rule::from_fn(move |input: S, scope: &Scope| {
        switch_first(source().boxed(), input, scope.clone())
    })
}

fn switch_first<S, O>(
    mut source: BoxStream<'static, Rule<S, O>>,
    input: S,
    scope: Scope,
) -> Flow<Match<O>>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Box::pin(try_stream! {
        let mut current: Option<(Option<Arc<str>>, Scope, Flow<Match<O>>)> = None;
        let mut source_done = false;

        loop {
            let step = match current.as_mut() {
                Some((_, _, matches)) if !source_done => {
                    tokio::select! {
                        biased;
                        found = matches.next() => Step::Evaluated(found),
                        next = source.next() => Step::Arrived(next),
                    }
                }
                Some((_, _, matches)) => Step::Evaluated(matches.next().await),
                None if !source_done => Step::Arrived(source.next().await),
                None => break,
            };

            match step {
                Step::Evaluated(found) => {
                    if let Some((_, child, _)) = current.take() {
                        child.abandon();
                    }
                    if let Some(found) = found {
                        yield found?;
                        break;
                    }
                }
                Step::Arrived(Some(rule)) => {
                    if let Some((name, child, _)) = current.take() {
                        child.abandon();
                        scope.emit(TraceEvent::RuleAbandoned { rule: name });
                    }
                    let child = scope.child();
                    let matches = rule.evaluate(input.clone(), &child);
                    current = Some((rule.label(), child, matches));
                }
                Step::Arrived(None) => source_done = true,
            }
        }
    })
}

/// Evaluates all `rules` concurrently and yields the best match.
///
/// A match scoring exactly `1` is yielded as soon as it is seen and every
/// evaluation still running is abandoned. Otherwise all matches are collected
/// and the highest score wins; on ties the rule declared first wins. No match
/// at all yields nothing. A failing rule abandons the others and fails the
/// whole evaluation.
pub fn best_match<S, O, I>(rules: I) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
    I: IntoIterator<Item = Rule<S, O>>,
{
    let rules: Arc<[Rule<S, O>]> = rules.into_iter().collect();
    Rule::from_fn(move |input: S, scope: &Scope| {
        best_of(stream::iter(rules.to_vec()).boxed(), input, scope.clone())
    })
}

/// Like [`best_match`], but rules come from an asynchronous source.
///
/// Every rule starts evaluating as soon as it arrives. Ties are broken by
/// arrival order.
pub fn best_match_stream<S, O, F, St>(source: F) -> Rule<S, O>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn() -> St + Send + Sync + 'static,
    St: Stream<Item = Rule<S, O>> + Send + 'static,
{
    Rule::from_fn(move |input: S, scope: &Scope| {
        best_of(source().boxed(), input, scope.clone())
    })
}

/// A rule evaluation started by [`best_of`].
struct Running {
    scope: Scope,
    name: Option<Arc<str>>,
    finished: bool,
}

/// Matches tagged with the index of the rule that produced them; `None` marks
/// the end of that rule's evaluation.
type Tagged<O> = (usize, Option<Result<Match<O>, BoxError>>);

fn best_of<S, O>(
    mut source: BoxStream<'static, Rule<S, O>>,
    input: S,
    scope: Scope,
) -> Flow<Match<O>>
where
    S: Clone + Send + Sync + 'static,
    O: Send + 'static,
{
    Box::pin(try_stream! {
        let mut running: Vec<Running> = Vec::new();
        let mut pending: SelectAll<BoxStream<'static, Tagged<O>>> = SelectAll::new();
        let mut leader: Option<(usize, Match<O>)> = None;
        let mut source_done = false;

        loop {
            let step = if source_done {
                if pending.is_empty() {
                    break;
                }
                Step::Evaluated(pending.next().await)
            } else if pending.is_empty() {
                Step::Arrived(source.next().await)
            } else {
                tokio::select! {
                    biased;
                    entry = pending.next() => Step::Evaluated(entry),
                    next = source.next() => Step::Arrived(next),
                }
            };

            match step {
                Step::Arrived(Some(rule)) => {
                    let index = running.len();
                    let child = scope.child();
                    let matches = rule
                        .evaluate(input.clone(), &child)
                        .map(move |item| (index, Some(item)))
                        .chain(stream::once(future::ready((index, None))))
                        .boxed();
                    running.push(Running {
                        scope: child,
                        name: rule.label(),
                        finished: false,
                    });
                    pending.push(matches);
                }
                Step::Arrived(None) => source_done = true,
                Step::Evaluated(None) => {}
                Step::Evaluated(Some((index, None))) => running[index].finished = true,
                Step::Evaluated(Some((index, Some(item)))) => {
                    if item.is_err() {
                        abandon_others(&scope, &running, index);
                    }
                    let found = item?;

                    if found.is_perfect() {
                        abandon_others(&scope, &running, index);
                        leader = Some((index, found));
                        break;
                    }

                    let outranks = leader.as_ref().is_none_or(|(lead, best)| {
                        found.score() > best.score()
                            || (found.score() == best.score() && index < *lead)
                    });
                    if outranks {
                        leader = Some((index, found));
                    }
                }
            }
        }

        for entry in &running {
            entry.scope.abandon();
        }

        if let Some((_, found)) = leader {
            yield found;
        }
    })
}

/// Abandons every unfinished evaluation except `winner`'s.
fn abandon_others(scope: &Scope, running: &[Running], winner: usize) {
    for (index, entry) in running.iter().enumerate() {
        if index != winner && !entry.finished {
            entry.scope.abandon();
            scope.emit(TraceEvent::RuleAbandoned {
                rule: entry.name.clone(),
            });
        }
    }
}
