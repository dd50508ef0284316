//! Field extraction from opaque stop payloads.
//!
//! The tap never inspects payloads directly. It asks a [`PayloadAccessor`], which either
//! recognises the payload shape or reports the field as absent.

use crate::diagnostics::DiagnosticPayload;
use crate::transport::{HttpResponseInfo, HttpStopData};
use reqwest::Url;

/// Narrow view over a stop payload whose concrete type may vary
pub trait PayloadAccessor: Send + Sync {
    /// URL of the completed request, if the payload exposes one
    fn try_get_request_url(&self, payload: &dyn DiagnosticPayload) -> Option<Url>;

    /// Response of the completed request, if the payload carries one
    fn try_get_response<'a>(
        &self,
        payload: &'a dyn DiagnosticPayload,
    ) -> Option<&'a HttpResponseInfo>;
}

/// Accessor for [`HttpStopData`] published by [`crate::transport::InstrumentedClient`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StopDataAccessor;

impl StopDataAccessor {
    fn stop_data(payload: &dyn DiagnosticPayload) -> Option<&HttpStopData> {
        payload.as_any().downcast_ref::<HttpStopData>()
    }
}

impl PayloadAccessor for StopDataAccessor {
    fn try_get_request_url(&self, payload: &dyn DiagnosticPayload) -> Option<Url> {
        let stop = Self::stop_data(payload)?;
        stop.request
            .as_ref()
            .and_then(|request| request.url.as_ref())
            .or_else(|| stop.response.as_ref().and_then(HttpResponseInfo::request_url))
            .cloned()
    }

    fn try_get_response<'a>(
        &self,
        payload: &'a dyn DiagnosticPayload,
    ) -> Option<&'a HttpResponseInfo> {
        Self::stop_data(payload)?.response.as_ref()
    }
}
