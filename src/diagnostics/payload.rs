//! Opaque event payloads.
//!
//! Sources publish payloads as `&dyn DiagnosticPayload`. Subscribers that know the
//! concrete type recover it by downcasting through [`DiagnosticPayload::as_any`];
//! subscribers that don't can still render the payload through its `Debug` form.
//!
//! # Examples
//!
//! ```
//! use http_spy::diagnostics::DiagnosticPayload;
//!
//! #[derive(Debug)]
//! struct CacheMiss {
//!     key: String,
//! }
//!
//! let payload: &dyn DiagnosticPayload = &CacheMiss { key: "users/42".to_string() };
//! let miss = payload.as_any().downcast_ref::<CacheMiss>().unwrap();
//! assert_eq!(miss.key, "users/42");
//! assert!(payload.as_any().downcast_ref::<String>().is_none());
//! ```

use std::any::Any;
use std::fmt;

/// Base trait for everything a [`super::DiagnosticSource`] can publish
///
/// Implemented for every `'static` type that is `Debug + Send + Sync`, so publishers
/// never implement it by hand.
pub trait DiagnosticPayload: Any + fmt::Debug + Send + Sync {
    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl<T> DiagnosticPayload for T
where
    T: Any + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}
