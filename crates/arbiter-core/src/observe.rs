//! Observability hooks for rule evaluation.
//!
//! The engine reports what it does through an [`Observer`] carried by the
//! evaluation [`Scope`](crate::Scope) instead of logging from inside the
//! combinators. The default [`TracingObserver`] forwards every event to
//! `tracing`; tests and embedders can install their own.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arbiter_core::{Scope, TraceEvent};
//!
//! let scope = Scope::with_observer(Arc::new(|event: &TraceEvent| {
//!     if let TraceEvent::RuleAbandoned { rule } = event {
//!         eprintln!("gave up on {}", rule.as_deref().unwrap_or("unnamed"));
//!     }
//! }));
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

/// A structured event emitted while a rule tree is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A rule started evaluating an input.
    RuleEvaluated {
        /// Name of the rule, if it has one.
        rule: Option<Arc<str>>,
    },
    /// A rule produced a match.
    MatchFound {
        /// Name of the rule that produced (or forwarded) the match.
        rule: Option<Arc<str>>,
        /// Score of the match.
        score: f64,
    },
    /// The winning match's action was invoked.
    ActionInvoked {
        /// Name of the innermost named rule the match came from.
        rule: Option<Arc<str>>,
        /// Score of the winning match.
        score: f64,
    },
    /// An in-flight rule evaluation was cancelled because it was superseded.
    RuleAbandoned {
        /// Name of the abandoned rule.
        rule: Option<Arc<str>>,
    },
}

impl TraceEvent {
    /// Stable kebab-case identifier of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RuleEvaluated { .. } => "rule-evaluated",
            Self::MatchFound { .. } => "match-found",
            Self::ActionInvoked { .. } => "action-invoked",
            Self::RuleAbandoned { .. } => "rule-abandoned",
        }
    }

    /// Name of the rule the event is about.
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::RuleEvaluated { rule }
            | Self::MatchFound { rule, .. }
            | Self::ActionInvoked { rule, .. }
            | Self::RuleAbandoned { rule } => rule.as_deref(),
        }
    }
}

/// Receives [`TraceEvent`]s.
///
/// Implemented for any `Fn(&TraceEvent) + Send + Sync` closure.
pub trait Observer: Send + Sync {
    /// Called synchronously for every event; keep it cheap.
    fn observe(&self, event: &TraceEvent);
}

impl<F> Observer for F
where
    F: Fn(&TraceEvent) + Send + Sync,
{
    fn observe(&self, event: &TraceEvent) {
        self(event)
    }
}

/// Forwards events to `tracing`.
///
/// Evaluation and abandonment are logged at `TRACE`, matches and action
/// invocations at `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, event: &TraceEvent) {
        let rule = event.rule().unwrap_or("unnamed");
        match event {
            TraceEvent::RuleEvaluated { .. } => trace!(rule, "Rule evaluated"),
            TraceEvent::MatchFound { score, .. } => debug!(rule, score = *score, "Match found"),
            TraceEvent::ActionInvoked { score, .. } => {
                debug!(rule, score = *score, "Action invoked")
            }
            TraceEvent::RuleAbandoned { .. } => trace!(rule, "Rule abandoned"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _event: &TraceEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_event_kinds() {
        assert_eq!(TraceEvent::RuleEvaluated { rule: None }.kind(), "rule-evaluated");
        assert_eq!(
            TraceEvent::MatchFound { rule: Some("greet".into()), score: 0.5 }.kind(),
            "match-found"
        );
        assert_eq!(
            TraceEvent::ActionInvoked { rule: None, score: 1.0 }.kind(),
            "action-invoked"
        );
        assert_eq!(TraceEvent::RuleAbandoned { rule: None }.kind(), "rule-abandoned");
    }

    #[test]
    fn test_closure_observer_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |event: &TraceEvent| {
            sink.lock()
                .push((event.kind(), event.rule().map(str::to_owned)));
        };

        observer.observe(&TraceEvent::MatchFound { rule: Some("next".into()), score: 1.0 });
        NoopObserver.observe(&TraceEvent::RuleEvaluated { rule: Some("ignored".into()) });

        assert_eq!(
            *seen.lock(),
            vec![("match-found", Some("next".to_string()))]
        );
    }
}
