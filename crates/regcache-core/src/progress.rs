//! Progress events emitted while a batch runs.

use std::sync::Mutex;
use std::sync::mpsc::Sender;

use serde::Serialize;

use crate::models::document::DocumentResult;

/// One progress record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The batch is about to start.
    Started { total: usize },

    /// A document finished.
    Document(DocumentResult),

    /// A document was skipped.
    Error {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        document: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        message: String,
    },

    /// The batch is over.
    Finished { processed: usize, failed: usize },
}

/// Receiver of progress events.
///
/// Emission must not block the pipeline and must not fail it: a sink whose
/// observer went away simply drops events.
pub trait ProgressSink {
    fn emit(&self, event: ProgressEvent);
}

impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Collects every event, mostly for tests and reports.
impl ProgressSink for Mutex<Vec<ProgressEvent>> {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.lock() {
            events.push(event);
        }
    }
}
