//! Best-effort mirroring of events to the storage backend.
//!
//! Submitting never blocks the local event pipeline. [`QueuedSink`] puts
//! records on an unbounded queue drained by a background task; delivery
//! failures are logged and counted, never retried.

use crate::core::events::EventRecord;
use crate::error::GatewayError;
use crate::session::InterviewSummary;
use crate::transparency::SharedTransparencyLog;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A record mirrored to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkRecord {
    Event(EventRecord),
    Interview(InterviewSummary),
}

/// Receiver of mirrored records. Must return immediately.
pub trait EventSink: Send + Sync {
    fn submit(&self, record: SinkRecord);
}

/// Discards everything. Used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn submit(&self, _record: SinkRecord) {}
}

/// Transport that actually delivers a record.
pub trait Deliver: Send + Sync {
    fn deliver(&self, record: SinkRecord) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

enum Message {
    Record(SinkRecord),
    Close,
}

/// Queue-and-drain sink.
#[derive(Debug)]
pub struct QueuedSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl QueuedSink {
    /// Start the drain task. Must be called within a Tokio runtime.
    ///
    /// The returned handle completes after [`QueuedSink::close`] once every
    /// record queued before it has been attempted.
    pub fn spawn<D>(transport: D, stats: Option<SharedTransparencyLog>) -> (Arc<Self>, JoinHandle<()>)
    where
        D: Deliver + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(transport, rx, stats));
        (Arc::new(Self { tx }), handle)
    }

    /// Stop accepting records after those already queued.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close);
    }
}

impl EventSink for QueuedSink {
    fn submit(&self, record: SinkRecord) {
        if self.tx.send(Message::Record(record)).is_err() {
            tracing::debug!("sink closed; record dropped");
        }
    }
}

async fn drain<D: Deliver>(
    transport: D,
    mut rx: mpsc::UnboundedReceiver<Message>,
    stats: Option<SharedTransparencyLog>,
) {
    while let Some(message) = rx.recv().await {
        let record = match message {
            Message::Record(record) => record,
            Message::Close => break,
        };

        if let Err(e) = transport.deliver(record).await {
            tracing::warn!(error = %e, "error sending record to backend");
            if let Some(ref stats) = stats {
                stats.record_sink_failure();
            }
        }
    }
}
