use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::models::Event;
use crate::record::Record;
use crate::worker::batch_worker;

/// Receives kept events. `send` must not block the ingestion loop.
pub trait EventSink: Send + Sync {
    fn send(&self, event: Event) -> Result<(), SinkError>;
}

/// Queues events for the background [`batch_worker`], which posts them to the collector.
///
/// Dropping every clone of the sink closes the queue; the worker then flushes
/// what is left and exits.
#[derive(Clone)]
pub struct HttpSink {
    tx: mpsc::Sender<Event>,
    static_fields: Record,
}

impl HttpSink {
    pub fn spawn(config: SinkConfig, client: reqwest::Client) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        let worker = tokio::spawn(batch_worker(rx, client, config));
        (Self::new(tx), worker)
    }

    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        let mut static_fields = Record::new();
        static_fields.insert(
            "event.parser".to_string(),
            Value::String(format!("honeylog/{}", env!("CARGO_PKG_VERSION"))),
        );
        Self { tx, static_fields }
    }
}

impl EventSink for HttpSink {
    fn send(&self, mut event: Event) -> Result<(), SinkError> {
        for (name, value) in &self.static_fields {
            event
                .data
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::QueueFull,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
