//! Trace emission
//!
//! [`TraceEmitter`] turns a completed request into at most two trace lines: a header
//! line rendering the whole stop payload, and an optional body line holding the first
//! [`MAX_BODY_CHARS`] characters of the response, keyed by the request URL. Lines go to
//! a [`TraceSink`]; [`TracingSink`] forwards them to `tracing`, [`MemorySink`] keeps them.

use crate::diagnostics::DiagnosticPayload;
use crate::transport::HttpResponseInfo;
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Category of the header line
pub const HEADER_CATEGORY: &str = "HttpStop";

/// Longest body line written, in characters
///
/// Trace lines are budgeted at 4096 characters including the sink's own prefix.
pub const MAX_BODY_CHARS: usize = 4000;

/// Target used by [`TracingSink`]
pub const TRACE_TARGET: &str = "http_spy";

/// Destination for trace lines
///
/// Writes are fire-and-forget; a sink must not fail the caller.
pub trait TraceSink: Send + Sync {
    fn write(&self, message: &str, category: Option<&str>);
}

/// Sink forwarding every line to `tracing` at INFO level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn write(&self, message: &str, category: Option<&str>) {
        tracing::info!(
            target: TRACE_TARGET,
            category = category.unwrap_or_default(),
            "{}",
            message
        );
    }
}

/// One emitted trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub timestamp: DateTime<Local>,
    pub category: Option<String>,
    pub message: String,
}

impl TraceRecord {
    pub fn is_header(&self) -> bool {
        self.category.as_deref() == Some(HEADER_CATEGORY)
    }

    /// Get a formatted string summary of the record
    pub fn printable_summary(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.category.as_deref().unwrap_or("-"),
            self.message
        )
    }
}

/// Type alias for record callback functions
pub type RecordCallback = Arc<dyn Fn(&TraceRecord) + Send + Sync>;

/// Sink that keeps every line in memory
///
/// Clones share the same storage, so one clone can be handed to the emitter while
/// another is used to inspect what was written.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TraceRecord>>>,
    on_write_callback: Option<RecordCallback>,
}

impl MemorySink {
    /// Create a new memory sink
    ///
    /// # Arguments
    ///
    /// * `on_write_callback` - Optional callback function called whenever a line is written
    pub fn new(on_write_callback: Option<RecordCallback>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            on_write_callback,
        }
    }

    /// Copies of every record written so far, oldest first
    pub fn records(&self) -> Vec<TraceRecord> {
        self.lock().clone()
    }

    pub fn headers(&self) -> Vec<TraceRecord> {
        self.lock().iter().filter(|r| r.is_header()).cloned().collect()
    }

    pub fn bodies(&self) -> Vec<TraceRecord> {
        self.lock().iter().filter(|r| !r.is_header()).cloned().collect()
    }

    /// Clear all records from the sink
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TraceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TraceSink for MemorySink {
    fn write(&self, message: &str, category: Option<&str>) {
        let record = TraceRecord {
            timestamp: Local::now(),
            category: category.map(str::to_string),
            message: message.to_string(),
        };

        if let Some(callback) = &self.on_write_callback {
            callback(&record);
        }

        self.lock().push(record);
    }
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink").field("records", &self.len()).finish()
    }
}

/// Writes header and body lines for completed requests
#[derive(Clone)]
pub struct TraceEmitter {
    sink: Arc<dyn TraceSink>,
}

impl TraceEmitter {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    /// Write the payload's `Debug` rendering under [`HEADER_CATEGORY`]
    pub fn emit_header(&self, payload: &dyn DiagnosticPayload) {
        self.sink.write(&format!("{:?}", payload), Some(HEADER_CATEGORY));
    }

    /// Write the response body, truncated, keyed by the request URL without credentials
    ///
    /// Nothing is written when there is no response or it has no content. A body that
    /// is not valid UTF-8 is written as an empty line.
    pub fn emit_body(&self, response: Option<&HttpResponseInfo>) {
        let Some(response) = response else {
            return;
        };

        let content = match response.read_text() {
            Ok(Some(content)) => content,
            Ok(None) => return,
            Err(e) => {
                debug!("Response body is not text, tracing it as empty: {}", e);
                String::new()
            }
        };

        let category = response.redacted_request_url();
        self.sink.write(truncate_chars(&content, MAX_BODY_CHARS), category.as_deref());
    }
}

impl Default for TraceEmitter {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
