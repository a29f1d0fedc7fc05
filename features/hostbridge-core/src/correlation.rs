//! Correlation ids for logical requests.
//!
//! [Correlation::begin] pushes an id for the calling context and, when asked to,
//! enters a `correlation` tracing span carrying it. Futures use [Correlation::scope],
//! which flows the id through a task-local frame and instruments the future with the span.

use std::{
    cell::RefCell,
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::{span::EnteredSpan, Instrument, Span};

use crate::flow::{FlowingCell, Restore};

/// Header carrying the correlation id, inbound and outbound
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

tokio::task_local! {
    static CORRELATION_TASK: RefCell<Option<String>>;
}
thread_local! {
    static CORRELATION_THREAD: RefCell<Option<String>> = const { RefCell::new(None) };
}
static CORRELATION: FlowingCell<String> =
    FlowingCell::new(&CORRELATION_TASK, &CORRELATION_THREAD);

/// Correlation id of the calling context
pub fn correlation_id() -> Option<String> {
    CORRELATION.get()
}

pub struct Correlation;

impl Correlation {
    /// Starts a correlation for the calling context.
    ///
    /// A missing or blank `incoming` id is replaced by a new one. With `log_scope` the
    /// `correlation` span is entered until the guard is disposed.
    pub fn begin(log_scope: bool, incoming: Option<&str>, header_name: &str) -> CorrelationGuard {
        let id = resolve_id(incoming);
        let mut parts = vec![Part::Id(CORRELATION.enter(Some(id.clone())))];
        if log_scope {
            parts.push(Part::Span(correlation_span(&id, header_name).entered()));
        }

        CorrelationGuard {
            id,
            parts: RefCell::new(parts),
            disposed: AtomicBool::new(false),
        }
    }

    /// Runs `fut` correlated by `incoming` (or a new id) and inside the `correlation` span
    pub fn scope<F: Future>(
        incoming: Option<&str>,
        header_name: &str,
        fut: F,
    ) -> impl Future<Output = F::Output> {
        let id = resolve_id(incoming);
        let span = correlation_span(&id, header_name);
        CORRELATION.flow_with(Some(id), fut.instrument(span))
    }

    /// Carries the current correlation id into `fut`, e.g. before spawning it
    pub fn flow<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        CORRELATION.flow(fut)
    }

    /// A new opaque id: 32 lowercase hex digits
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

fn resolve_id(incoming: Option<&str>) -> String {
    match incoming.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Correlation::new_id(),
    }
}

fn correlation_span(id: &str, header_name: &str) -> Span {
    tracing::info_span!("correlation", correlation_id = %id, correlation_header = %header_name)
}

enum Part {
    Id(Restore<String>),
    Span(EnteredSpan),
}

/// Ends a correlation started with [Correlation::begin].
///
/// The span is exited before the previous id is restored; only the first dispose has an effect.
pub struct CorrelationGuard {
    id: String,
    parts: RefCell<Vec<Part>>,
    disposed: AtomicBool,
}

impl CorrelationGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let parts = std::mem::take(&mut *self.parts.borrow_mut());
        for part in parts.into_iter().rev() {
            match part {
                Part::Id(restore) => restore.restore(),
                Part::Span(entered) => drop(entered.exit()),
            }
        }
    }
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Read access to the current correlation id, registrable as a service
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationAccessor;

impl CorrelationAccessor {
    pub fn correlation_id(&self) -> Option<String> {
        correlation_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_id_is_kept_and_restored() {
        assert_eq!(correlation_id(), None);
        let guard = Correlation::begin(false, Some("abc123"), CORRELATION_HEADER);
        assert_eq!(correlation_id().as_deref(), Some("abc123"));
        guard.dispose();
        assert_eq!(correlation_id(), None);
    }

    #[test]
    fn blank_id_is_replaced() {
        let guard = Correlation::begin(false, Some("  "), CORRELATION_HEADER);
        assert_eq!(guard.id().len(), 32);
        assert_ne!(guard.id(), Correlation::new_id());
    }

    #[test]
    fn nested_begin_restores_enclosing_id_and_double_dispose_is_noop() {
        let outer = Correlation::begin(true, Some("outer"), CORRELATION_HEADER);
        let inner = Correlation::begin(true, Some("inner"), CORRELATION_HEADER);
        assert_eq!(correlation_id().as_deref(), Some("inner"));

        inner.dispose();
        inner.dispose();
        assert_eq!(correlation_id().as_deref(), Some("outer"));

        drop(outer);
        assert_eq!(correlation_id(), None);
    }

    #[test]
    fn log_scope_enters_the_correlation_span() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let guard = Correlation::begin(true, Some("abc123"), CORRELATION_HEADER);
            let current = Span::current();
            assert_eq!(current.metadata().map(|meta| meta.name()), Some("correlation"));

            guard.dispose();
            assert!(Span::current().is_none());
        });
    }

    #[tokio::test]
    async fn scope_flows_the_id_through_awaits() {
        let seen = Correlation::scope(Some("abc123"), CORRELATION_HEADER, async {
            tokio::task::yield_now().await;
            correlation_id()
        })
        .await;

        assert_eq!(seen.as_deref(), Some("abc123"));
        assert_eq!(correlation_id(), None);
    }
}
