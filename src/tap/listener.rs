//! The tap attached to the HTTP handler source.

use super::accessor::{PayloadAccessor, StopDataAccessor};
use crate::diagnostics::{DiagnosticPayload, EventObserver};
use crate::emitter::TraceEmitter;
use crate::filter::PatternFilter;
use crate::transport::{redact_url, REQUEST_STOP_KEY};
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Observer of the HTTP handler source
///
/// Acts on stop events only. For each one whose URL passes the filter it writes a header
/// line and, when body logging is on, a body line. Everything runs on the publishing
/// thread and nothing escapes back into the transport, including panics from the sink.
pub struct HttpHandlerListener {
    log_content: bool,
    filter: Arc<PatternFilter>,
    emitter: TraceEmitter,
    accessor: Arc<dyn PayloadAccessor>,
}

impl HttpHandlerListener {
    pub fn new(log_content: bool, filter: Arc<PatternFilter>, emitter: TraceEmitter) -> Self {
        Self {
            log_content,
            filter,
            emitter,
            accessor: Arc::new(StopDataAccessor),
        }
    }

    /// Replace the payload accessor, for transports publishing a different stop shape
    pub fn with_accessor(mut self, accessor: Arc<dyn PayloadAccessor>) -> Self {
        self.accessor = accessor;
        self
    }

    fn handle_stop(&self, payload: &dyn DiagnosticPayload) {
        // Match on the same credential-free form the trace lines show.
        let url = self.accessor.try_get_request_url(payload).map(|url| redact_url(&url));
        if self.filter.should_ignore(url.as_deref()) {
            return;
        }

        self.emitter.emit_header(payload);
        if self.log_content {
            self.emitter.emit_body(self.accessor.try_get_response(payload));
        }
    }
}

impl EventObserver for HttpHandlerListener {
    fn on_event(&self, key: &str, payload: &dyn DiagnosticPayload) {
        if key != REQUEST_STOP_KEY {
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.handle_stop(payload)));
        if result.is_err() {
            debug!("Trace emission panicked; event dropped");
        }
    }

    fn on_error(&self, _error: &(dyn Error + Send + Sync)) {}

    fn on_completed(&self) {}
}
