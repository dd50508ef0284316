//! Instrumented HTTP transport
//!
//! [`InstrumentedClient`] wraps `reqwest` and publishes the lifecycle of every request on
//! the process's `HttpHandlerDiagnosticListener` source. Observers that know the payload
//! types in [`events`] can read the request and the buffered response from the stop event.

pub mod client;
pub mod events;

pub use client::{handler_source, HttpResponse, InstrumentedClient};
pub use events::{
    redact_url, HttpExceptionData, HttpRequestInfo, HttpResponseInfo, HttpStartData, HttpStopData,
    RequestStatus, HTTP_HANDLER_SOURCE_NAME, REQUEST_EXCEPTION_KEY, REQUEST_START_KEY,
    REQUEST_STOP_KEY,
};
