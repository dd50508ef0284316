//! Attachment of the HTTP tap to the process
//!
//! [`HttpClientObserver`] watches every [`DiagnosticSource`] that appears and, when the
//! HTTP handler source shows up, attaches a single [`HttpHandlerListener`] to it. The
//! [`ObserverHandle`] returned by [`HttpClientObserver::subscribe_all`] owns both
//! attachments and tears them down together.
//!
//! # Usage Example
//!
//! ```rust
//! use http_spy::observer::HttpClientObserver;
//!
//! // Development builds only: traces every outbound request made through the
//! // instrumented transport.
//! let handle = HttpClientObserver::subscribe_all(true, None);
//!
//! // ... make requests ...
//!
//! handle.release();
//! ```

use crate::config::ObserverConfig;
use crate::diagnostics::{AllSources, DiagnosticSource, SourceObserver, Subscription};
use crate::emitter::{TraceEmitter, TraceSink, TracingSink};
use crate::error::Result;
use crate::filter::PatternFilter;
use crate::tap::HttpHandlerListener;
use crate::transport::HTTP_HANDLER_SOURCE_NAME;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct Attachment {
    subscription: Option<Subscription>,
    disposed: bool,
}

/// Watches for the HTTP handler source and taps it exactly once
///
/// The nested subscription is created under a lock, so even if the handler source were
/// announced concurrently from several threads only one listener would be attached.
/// Once disposed the observer never attaches again.
pub struct HttpClientObserver {
    log_content: bool,
    filter: Arc<PatternFilter>,
    sink: Arc<dyn TraceSink>,
    attachment: Mutex<Attachment>,
}

impl HttpClientObserver {
    /// Create an observer tracing to `tracing`
    ///
    /// # Arguments
    ///
    /// * `log_response_body` - Whether to write a body line after each header line
    /// * `ignore` - Exclusions; `None` selects [`PatternFilter::default_set`]
    pub fn new(log_response_body: bool, ignore: Option<PatternFilter>) -> Self {
        Self {
            log_content: log_response_body,
            filter: Arc::new(ignore.unwrap_or_else(PatternFilter::default_set)),
            sink: Arc::new(TracingSink),
            attachment: Mutex::new(Attachment::default()),
        }
    }

    pub fn from_config(config: &ObserverConfig) -> Result<Self> {
        Ok(Self::new(config.log_response_body, Some(config.filter()?)))
    }

    /// Send trace lines to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Tap the process-wide registry
    ///
    /// Intended for development environments.
    pub fn subscribe_all(log_response_body: bool, ignore: Option<PatternFilter>) -> ObserverHandle {
        Self::new(log_response_body, ignore).subscribe_to(AllSources::global())
    }

    /// Attach to `registry` and return the handle owning the attachment
    pub fn subscribe_to(self, registry: &Arc<AllSources>) -> ObserverHandle {
        let observer = Arc::new(self);
        let outer = registry.subscribe(observer.clone());
        ObserverHandle { outer, observer }
    }

    /// Whether the handler listener is currently attached
    pub fn is_attached(&self) -> bool {
        self.lock().subscription.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Release the handler listener, if any, and refuse any later attachment
    pub fn dispose(&self) {
        let subscription = {
            let mut attachment = self.lock();
            attachment.disposed = true;
            attachment.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.release();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Attachment> {
        self.attachment.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SourceObserver for HttpClientObserver {
    fn on_source(&self, source: &Arc<DiagnosticSource>) {
        if source.name() != HTTP_HANDLER_SOURCE_NAME {
            return;
        }

        let mut attachment = self.lock();
        if attachment.disposed {
            return;
        }
        if attachment.subscription.is_some() {
            debug!(
                "{} announced again; keeping the existing subscription",
                HTTP_HANDLER_SOURCE_NAME
            );
            return;
        }

        let listener = HttpHandlerListener::new(
            self.log_content,
            Arc::clone(&self.filter),
            TraceEmitter::new(Arc::clone(&self.sink)),
        );
        attachment.subscription = Some(source.subscribe(Arc::new(listener)));
    }

    fn on_error(&self, _error: &(dyn Error + Send + Sync)) {}

    fn on_completed(&self) {}
}

impl Drop for HttpClientObserver {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for HttpClientObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientObserver")
            .field("log_content", &self.log_content)
            .field("filter", &self.filter)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Owns the registry subscription and, through the observer, the handler subscription
///
/// Releasing is idempotent and also happens on drop.
#[derive(Debug)]
pub struct ObserverHandle {
    outer: Subscription,
    observer: Arc<HttpClientObserver>,
}

impl ObserverHandle {
    pub fn release(&self) {
        self.outer.release();
        self.observer.dispose();
    }

    pub fn observer(&self) -> &HttpClientObserver {
        &self.observer
    }

    pub fn is_released(&self) -> bool {
        self.outer.is_released() && self.observer.is_disposed()
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.release();
    }
}
