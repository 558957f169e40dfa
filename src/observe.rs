//! Stage observation hooks.
//!
//! An optional, non-intrusive way to watch the pipeline work. The core
//! functions stay pure; observation happens at the call site by wrapping
//! each stage with [`observed`], which brackets the work in
//! [`Event::StageStart`] and [`Event::StageEnd`]. The chat transport
//! reports its retries through the same channel as
//! [`Event::TransportRetry`].
//!
//! With no handler installed every hook is a no-op.

use std::sync::Arc;

use crate::error::Result;

/// Events emitted while the pipeline works.
#[derive(Debug, Clone)]
pub enum Event {
    /// A pipeline stage is starting.
    StageStart {
        /// Stable stage label (e.g. `"sanitize"`, `"extract"`).
        stage: &'static str,
    },
    /// A pipeline stage has finished.
    StageEnd {
        /// Stable stage label.
        stage: &'static str,
        /// Whether the stage succeeded.
        ok: bool,
    },
    /// A transport-level retry is about to happen.
    TransportRetry {
        /// The retry attempt number (1-indexed).
        attempt: u32,
        /// Delay before this attempt, in milliseconds.
        delay_ms: u64,
        /// Description of the error that triggered the retry.
        reason: String,
    },
}

/// Handler for pipeline events.
///
/// Implementations must be `Send + Sync`; the transport may emit from an
/// async context. Handlers should return quickly, since they run inline
/// with the stage that emitted.
pub trait EventHandler: Send + Sync {
    /// Called for each emitted event.
    fn on_event(&self, event: Event);
}

/// An [`EventHandler`] backed by a closure.
///
/// # Examples
///
/// ```
/// use llm_harvest::observe::{Event, FnEventHandler};
///
/// let handler = FnEventHandler(|event: Event| {
///     if let Event::StageEnd { stage, ok } = event {
///         eprintln!("{} finished, ok={}", stage, ok);
///     }
/// });
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// Run `work` bracketed by start and end events for `stage`.
///
/// The end event's `ok` flag reflects whether `work` returned `Ok`. The
/// result passes through untouched; observation never changes behavior.
///
/// # Examples
///
/// ```
/// use llm_harvest::observe::observed;
/// use llm_harvest::sanitize::sanitize;
///
/// let cleaned = observed(&None, "sanitize", || Ok(sanitize("```xml\n<x>```"))).unwrap();
/// assert_eq!(cleaned, "\n<x>");
/// ```
pub fn observed<T>(
    handler: &Option<Arc<dyn EventHandler>>,
    stage: &'static str,
    work: impl FnOnce() -> Result<T>,
) -> Result<T> {
    emit(handler, Event::StageStart { stage });
    let result = work();
    emit(
        handler,
        Event::StageEnd {
            stage,
            ok: result.is_ok(),
        },
    );
    result
}
