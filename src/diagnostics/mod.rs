//! In-process diagnostic event broadcast
//!
//! Components that want to be observable create a named [`DiagnosticSource`] and write
//! `(key, payload)` events to it. Observers either subscribe to a source they already
//! hold, or subscribe to [`AllSources`] to be told about every source in the process
//! and pick the ones they care about by name.
//!
//! # Architecture
//!
//! - **DiagnosticSource**: named publisher, delivers events synchronously on the writer's thread
//! - **AllSources**: registry announcing every source, process-wide via [`AllSources::global`]
//! - **EventObserver / SourceObserver**: the two subscriber roles
//! - **Subscription**: idempotent release handle returned by every `subscribe`
//! - **DiagnosticPayload**: opaque payload, recoverable by downcasting
//!
//! # Usage Example
//!
//! ```rust
//! use http_spy::diagnostics::{DiagnosticPayload, DiagnosticSource, EventObserver};
//! use std::sync::Arc;
//!
//! struct PrintKeys;
//!
//! impl EventObserver for PrintKeys {
//!     fn on_event(&self, key: &str, _payload: &dyn DiagnosticPayload) {
//!         println!("{key}");
//!     }
//! }
//!
//! let source = DiagnosticSource::new("my.component");
//! let subscription = source.subscribe(Arc::new(PrintKeys));
//! source.write("Work.Done", &42_u32);
//! subscription.release();
//! ```

pub mod payload;
pub mod source;
pub mod subscription;

pub use payload::DiagnosticPayload;
pub use source::{AllSources, DiagnosticSource, EventObserver, SourceObserver};
pub use subscription::Subscription;
