//! Async normalization.
//!
//! Everything the engine consumes (matcher scores, action effects, guard
//! verdicts, rule matches) ends up as a [`Flow`]: a lazy, boxed stream of
//! `Result` items. Collaborators hand their values back as an [`Eventual`],
//! which can be
//!
//! - already resolved ([`Eventual::ready`], [`Eventual::fail`]),
//! - a single future completion ([`Eventual::future`]),
//! - or a multi-value asynchronous source ([`Eventual::stream`]).
//!
//! [`Eventual::into_flow`] turns all three shapes into the same `Flow`, so the
//! rest of the crate never has to care which one it was given.
//!
//! # Example
//!
//! ```rust,ignore
//! use arbiter_core::{Eventual, Scored};
//!
//! // A synchronous matcher.
//! let exact = |text: String| Eventual::ready((text == "next").then(|| Scored::new(1.0, ())));
//!
//! // A matcher backed by a remote call.
//! let remote = |text: String| Eventual::future(async move { classify(text).await });
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};

/// A type-erased failure raised by a matcher, action or query.
///
/// The engine never inspects or wraps these; they travel through a [`Flow`]
/// untouched.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A lazy asynchronous sequence of values, terminated early by a failure.
pub type Flow<T> = BoxStream<'static, Result<T, BoxError>>;

/// A value that may be available now, later, or several times over.
pub enum Eventual<T> {
    /// Already computed.
    Ready(Result<T, BoxError>),
    /// Produced by a single future completion.
    Pending(BoxFuture<'static, Result<T, BoxError>>),
    /// Produced by a multi-value source.
    Streaming(Flow<T>),
}

impl<T: Send + 'static> Eventual<T> {
    /// Wraps an already-computed value.
    pub fn ready(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// Wraps an already-known failure.
    pub fn fail(error: impl Into<BoxError>) -> Self {
        Self::Ready(Err(error.into()))
    }

    /// A source that completes without ever producing a value.
    pub fn empty() -> Self {
        Self::Streaming(stream::empty().boxed())
    }

    /// Adapts a single-completion future.
    ///
    /// The future is not polled until the resulting flow is.
    pub fn future<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::Pending(Box::pin(async move { future.await.map_err(Into::into) }))
    }

    /// Adapts a multi-value source.
    pub fn stream<St, E>(source: St) -> Self
    where
        St: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::Streaming(source.map(|item| item.map_err(Into::into)).boxed())
    }

    /// Normalizes into a [`Flow`].
    ///
    /// A resolved value becomes a one-element flow, a future becomes a
    /// one-element flow that completes (or fails) with it, and a stream is
    /// passed through unchanged.
    pub fn into_flow(self) -> Flow<T> {
        match self {
            Self::Ready(result) => stream::once(async move { result }).boxed(),
            Self::Pending(future) => stream::once(future).boxed(),
            Self::Streaming(flow) => flow,
        }
    }
}

impl<T> From<Flow<T>> for Eventual<T> {
    fn from(flow: Flow<T>) -> Self {
        Self::Streaming(flow)
    }
}

impl<T> fmt::Debug for Eventual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Self::Ready(Ok(_)) => "Ready(Ok)",
            Self::Ready(Err(_)) => "Ready(Err)",
            Self::Pending(_) => "Pending",
            Self::Streaming(_) => "Streaming",
        };
        f.write_str(shape)
    }
}

/// Resolves the first item of `flow`, dropping the rest of it.
///
/// `Ok(None)` means the flow completed without producing anything.
pub async fn first<T>(mut flow: Flow<T>) -> Result<Option<T>, BoxError> {
    flow.next().await.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test]
    async fn test_ready_is_single_element() {
        let values: Vec<_> = Eventual::ready(7).into_flow().collect().await;
        assert_eq!(values.len(), 1);
        assert_eq!(*values[0].as_ref().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_future_failure_is_forwarded() {
        let eventual: Eventual<u32> = Eventual::future(async { Err("classifier offline") });
        let err = first(eventual.into_flow()).await.unwrap_err();
        assert_eq!(err.to_string(), "classifier offline");
    }

    #[tokio::test]
    async fn test_stream_passes_through() {
        let source = stream::iter(vec![Ok::<_, BoxError>(1), Ok(2), Ok(3)]);
        let values: Vec<u32> = Eventual::stream(source)
            .into_flow()
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_completes_without_value() {
        assert!(first(Eventual::<u32>::empty().into_flow()).await.unwrap().is_none());
    }

    #[test]
    fn test_future_is_cold_until_polled() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let mut flow = Eventual::future(async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, BoxError>(1)
        })
        .into_flow();

        assert!(!started.load(Ordering::SeqCst));

        let mut next = tokio_test::task::spawn(flow.next());
        let item = assert_ready!(next.poll());
        assert!(started.load(Ordering::SeqCst));
        assert_eq!(item.unwrap().unwrap(), 1);
    }

    #[test]
    fn test_pending_future_keeps_flow_pending() {
        let pending = futures::future::pending::<Result<u32, BoxError>>();
        let mut flow = Eventual::<u32>::future(pending).into_flow();
        let mut next = tokio_test::task::spawn(flow.next());
        assert_pending!(next.poll());
    }
}
