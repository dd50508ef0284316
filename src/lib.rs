//! Redacted, size-bounded tracing of outbound HTTP requests.
//!
//! Requests made through [`transport::InstrumentedClient`] publish their lifecycle on the
//! `HttpHandlerDiagnosticListener` source. [`observer::HttpClientObserver`] taps that
//! source once, drops requests whose URL matches an exclusion pattern, and writes a
//! header line plus an optional truncated body line per completed request.
//!
//! ```rust,no_run
//! use http_spy::prelude::*;
//!
//! # async fn run() -> http_spy::Result<()> {
//! let handle = HttpClientObserver::subscribe_all(true, None);
//! let client = InstrumentedClient::new();
//! client.get("https://api.example.com/data").await?;
//! handle.release();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod observer;
pub mod tap;
pub mod transport;

pub use error::{HttpSpyError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::ObserverConfig;
    pub use crate::diagnostics::{AllSources, DiagnosticSource, Subscription};
    pub use crate::emitter::{MemorySink, TraceSink, TracingSink};
    pub use crate::error::{HttpSpyError, Result};
    pub use crate::filter::{PatternFilter, DEFAULT_IGNORE_PATTERNS};
    pub use crate::observer::{HttpClientObserver, ObserverHandle};
    pub use crate::transport::{HttpResponse, InstrumentedClient};
}
