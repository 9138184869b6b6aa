//! Per-engine completion notifications.
//!
//! The dispatcher awaits [`SearchListener::on_engine_complete`] before it
//! starts the next engine, so notifications never overlap and arrive in
//! dispatch order.

use crate::types::{EngineKind, SearchResult};

/// One engine finished searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCompletion {
    /// The engine that was searched.
    pub engine: EngineKind,
    /// That engine's own result, before merging.
    pub result: SearchResult,
}

/// Receives an event after each engine completes.
pub trait SearchListener: Send + Sync {
    /// Called once per searched engine, fully awaited before dispatch continues.
    fn on_engine_complete(
        &self,
        event: EngineCompletion,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// A listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl SearchListener for NoopListener {
    async fn on_engine_complete(&self, _event: EngineCompletion) {}
}

/// Channel form: each event is sent, waiting for capacity if the channel is
/// full. A dropped receiver is not an error; events are then discarded.
impl SearchListener for tokio::sync::mpsc::Sender<EngineCompletion> {
    async fn on_engine_complete(&self, event: EngineCompletion) {
        if self.send(event).await.is_err() {
            tracing::debug!("completion receiver dropped, discarding event");
        }
    }
}
