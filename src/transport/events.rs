//! Payloads published by the instrumented HTTP transport.

use crate::error::{HttpSpyError, Result};
use reqwest::{Method, StatusCode, Url};
use std::fmt;
use std::sync::Arc;

/// Name of the source the transport publishes on
pub const HTTP_HANDLER_SOURCE_NAME: &str = "HttpHandlerDiagnosticListener";

/// Written before the request is sent
pub const REQUEST_START_KEY: &str = "HttpRequestOut.Start";

/// Written once the request has finished, successfully or not
pub const REQUEST_STOP_KEY: &str = "HttpRequestOut.Stop";

/// Written when the transport fails, ahead of the stop event
pub const REQUEST_EXCEPTION_KEY: &str = "HttpRequestOut.Exception";

/// `url` as a string with any username and password removed
pub fn redact_url(url: &Url) -> String {
    if url.username().is_empty() && url.password().is_none() {
        return url.as_str().to_string();
    }

    let mut redacted = url.clone();
    // Only fails for URLs that cannot carry credentials in the first place.
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.into()
}

/// The outgoing request as seen by observers
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequestInfo {
    pub method: Method,
    pub url: Option<Url>,
}

impl HttpRequestInfo {
    pub fn new(method: Method, url: Option<Url>) -> Self {
        Self { method, url }
    }

    /// The request URL without credentials, as written to traces
    pub fn redacted_url(&self) -> Option<String> {
        self.url.as_ref().map(redact_url)
    }
}

impl fmt::Debug for HttpRequestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequestInfo")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .finish()
    }
}

impl From<&reqwest::Request> for HttpRequestInfo {
    fn from(request: &reqwest::Request) -> Self {
        Self::new(request.method().clone(), Some(request.url().clone()))
    }
}

/// A completed response whose body is already fully buffered
///
/// `content` is `None` when the response carried no body at all.
#[derive(Clone)]
pub struct HttpResponseInfo {
    pub status: StatusCode,
    pub request: Option<HttpRequestInfo>,
    pub content: Option<Arc<[u8]>>,
}

impl HttpResponseInfo {
    pub fn new(
        status: StatusCode,
        request: Option<HttpRequestInfo>,
        content: Option<Arc<[u8]>>,
    ) -> Self {
        Self {
            status,
            request,
            content,
        }
    }

    /// URL of the request that produced this response
    pub fn request_url(&self) -> Option<&Url> {
        self.request.as_ref().and_then(|request| request.url.as_ref())
    }

    /// Credential-free URL of the request that produced this response
    pub fn redacted_request_url(&self) -> Option<String> {
        self.request.as_ref().and_then(HttpRequestInfo::redacted_url)
    }

    /// Decode the buffered body as UTF-8
    ///
    /// This never touches the network; the body was read when the response completed.
    pub fn read_text(&self) -> Result<Option<String>> {
        match &self.content {
            Some(content) => std::str::from_utf8(content)
                .map(|text| Some(text.to_string()))
                .map_err(|e| HttpSpyError::BodyDecodeError(e.to_string())),
            None => Ok(None),
        }
    }
}

// The request is left out; it is already on the enclosing stop payload.
impl fmt::Debug for HttpResponseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponseInfo")
            .field("status", &self.status)
            .field("content_length", &self.content.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// How the request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    RanToCompletion,
    Faulted,
    Canceled,
}

/// Payload of [`REQUEST_START_KEY`]
#[derive(Debug, Clone)]
pub struct HttpStartData {
    pub request: HttpRequestInfo,
}

/// Payload of [`REQUEST_STOP_KEY`]
///
/// `response` is `None` when the transport failed before a response existed.
#[derive(Clone)]
pub struct HttpStopData {
    pub request: Option<HttpRequestInfo>,
    pub response: Option<HttpResponseInfo>,
    pub request_status: RequestStatus,
}

impl fmt::Debug for HttpStopData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self
            .request
            .as_ref()
            .or_else(|| self.response.as_ref().and_then(|r| r.request.as_ref()));
        f.debug_struct("HttpStopData")
            .field("request", &request)
            .field("response", &self.response)
            .field("request_status", &self.request_status)
            .finish()
    }
}

/// Payload of [`REQUEST_EXCEPTION_KEY`]
#[derive(Debug, Clone)]
pub struct HttpExceptionData {
    pub request: HttpRequestInfo,
    pub error: String,
}
