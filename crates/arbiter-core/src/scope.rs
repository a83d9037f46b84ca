//! Evaluation scopes: explicit cancellation plus the observer in effect.
//!
//! Every rule evaluation runs inside a [`Scope`]. Combinators give each rule
//! they start a [child](Scope::child) scope and call [`Scope::abandon`] on it
//! once that evaluation is superseded. Abandonment is cooperative:
//!
//! - the flow returned by [`Rule::evaluate`](crate::Rule::evaluate) ends at the
//!   next poll after its scope is abandoned, so an abandoned branch can never
//!   deliver a late match;
//! - dropping that flow (a timeout, a caller losing interest) abandons the
//!   scope the evaluation ran in;
//! - matchers doing expensive work (a remote classifier, say) can wait on
//!   [`Scope::abandoned`] to stop early.

use std::fmt;
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::flow::Flow;
use crate::observe::{Observer, TraceEvent, TracingObserver};

/// Cancellation handle and observer for one rule evaluation.
///
/// Cloning is cheap; clones share the same cancellation state.
#[derive(Clone)]
pub struct Scope {
    token: CancellationToken,
    observer: Arc<dyn Observer>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Creates a root scope reporting to [`TracingObserver`].
    pub fn new() -> Self {
        Self::with_observer(Arc::new(TracingObserver))
    }

    /// Creates a root scope reporting to `observer`.
    pub fn with_observer(observer: Arc<dyn Observer>) -> Self {
        Self {
            token: CancellationToken::new(),
            observer,
        }
    }

    /// Creates a scope that is abandoned whenever this one is, but can also be
    /// abandoned on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            observer: Arc::clone(&self.observer),
        }
    }

    /// Abandons this scope and every scope derived from it.
    pub fn abandon(&self) {
        self.token.cancel();
    }

    /// Returns whether this scope (or an ancestor) has been abandoned.
    pub fn is_abandoned(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once this scope is abandoned.
    pub async fn abandoned(&self) {
        self.token.cancelled().await;
    }

    /// The underlying cancellation token, for handing to spawned work.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Reports `event` to this scope's observer.
    pub fn emit(&self, event: TraceEvent) {
        self.observer.observe(&event);
    }

    /// Ends `flow` as soon as this scope is abandoned, and abandons this scope
    /// once the returned flow is dropped.
    ///
    /// The scope should belong to `flow` alone; [`Rule::evaluate`](crate::Rule::evaluate)
    /// bounds each evaluation by a fresh child scope.
    pub fn bound<T: Send + 'static>(&self, flow: Flow<T>) -> Flow<T> {
        let guard = self.token.clone().drop_guard();
        let mut flow = flow.take_until(self.token.clone().cancelled_owned()).boxed();
        Box::pin(stream! {
            let _guard = guard;
            while let Some(item) = flow.next().await {
                yield item;
            }
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("abandoned", &self.is_abandoned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{BoxError, first};
    use futures::stream;
    use std::time::Duration;

    #[test]
    fn test_child_follows_parent() {
        let parent = Scope::new();
        let child = parent.child();
        let sibling = parent.child();

        child.abandon();
        assert!(child.is_abandoned());
        assert!(!parent.is_abandoned());
        assert!(!sibling.is_abandoned());

        parent.abandon();
        assert!(sibling.is_abandoned());
    }

    #[tokio::test]
    async fn test_bound_flow_ends_when_abandoned() {
        let scope = Scope::new();
        let endless: Flow<u32> = stream::repeat_with(|| Ok::<_, BoxError>(1)).boxed();
        let mut bounded = scope.bound(endless);

        assert_eq!(bounded.next().await.unwrap().unwrap(), 1);
        scope.abandon();
        assert!(bounded.next().await.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_scope_yields_nothing() {
        let scope = Scope::new();
        scope.abandon();
        let flow: Flow<u32> = stream::iter(vec![Ok(1), Ok(2)]).boxed();
        assert!(first(scope.bound(flow)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropping_bound_flow_abandons_scope() {
        let parent = Scope::new();
        let scope = parent.child();
        let pending: Flow<u32> = stream::pending().boxed();
        let mut bounded = scope.bound(pending);

        let waited = tokio::time::timeout(Duration::from_millis(5), bounded.next()).await;
        assert!(waited.is_err());
        assert!(!scope.is_abandoned());

        drop(bounded);
        assert!(scope.is_abandoned());
        assert!(!parent.is_abandoned());
    }
}
