//! Event tap for the HTTP handler source
//!
//! [`HttpHandlerListener`] is the observer attached to `HttpHandlerDiagnosticListener`.
//! It reads stop payloads only through a [`PayloadAccessor`], so a transport whose
//! payload shape differs degrades to "URL and response absent" instead of failing.

pub mod accessor;
pub mod listener;

pub use accessor::{PayloadAccessor, StopDataAccessor};
pub use listener::HttpHandlerListener;
