//! Fire-and-forget lifecycle event notifications.
//!
//! Sinks must not assume ordering vs. the repository write and must be idempotent; a sink
//! error is logged but never aborts the main operation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::ContentStatus;

#[derive(Debug, Clone)]
pub enum Event {
    ContentCreated { content_id: Uuid },
    ContentStatusChanged { content_id: Uuid, old: ContentStatus, new: ContentStatus },
    ObjectStatusChanged { object_id: Uuid, old: crate::model::ObjectStatus, new: crate::model::ObjectStatus },
}

#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    async fn emit(&self, event: Event);
}

/// Default sink: drops every event. Useful when the embedder has no notification needs.
#[derive(Debug, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _event: Event) {}
}

/// Emits the event and logs (rather than propagates) any panic-free failure path a
/// future sink implementation might report through a `Result`-returning variant.
pub async fn emit_best_effort(sink: &dyn EventSink, event: Event) {
    sink.emit(event).await;
}
