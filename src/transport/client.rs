//! `reqwest` wrapper publishing on the HTTP handler source.

use super::events::*;
use crate::diagnostics::DiagnosticSource;
use crate::error::{HttpSpyError, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, IntoUrl, Method, Request, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// The process's single HTTP handler source, created on first use
pub fn handler_source() -> Arc<DiagnosticSource> {
    static SOURCE: OnceLock<Arc<DiagnosticSource>> = OnceLock::new();
    Arc::clone(SOURCE.get_or_init(|| DiagnosticSource::new(HTTP_HANDLER_SOURCE_NAME)))
}

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Arc<[u8]>,
}

impl HttpResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Final URL after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_string)
            .map_err(|e| HttpSpyError::BodyDecodeError(e.to_string()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// `reqwest` client that publishes request lifecycle events
///
/// Every request produces a start event and a stop event on the handler source. A
/// transport failure additionally produces an exception event, and its stop event
/// carries no response. Events are only built when the source has subscribers.
#[derive(Debug, Clone)]
pub struct InstrumentedClient {
    client: Client,
    source: Arc<DiagnosticSource>,
}

impl InstrumentedClient {
    /// Create a client publishing on the process-wide handler source
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Wrap an existing `reqwest` client
    pub fn with_client(client: Client) -> Self {
        Self::with_source(client, handler_source())
    }

    /// Wrap an existing client and publish on `source` instead of the process-wide one
    pub fn with_source(client: Client, source: Arc<DiagnosticSource>) -> Self {
        Self { client, source }
    }

    pub fn source(&self) -> &Arc<DiagnosticSource> {
        &self.source
    }

    /// Start building a request; send it with [`InstrumentedClient::send`]
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.client.request(method, url)
    }

    pub async fn get<U: IntoUrl>(&self, url: U) -> Result<HttpResponse> {
        self.send(self.client.get(url)).await
    }

    pub async fn post_json<U: IntoUrl, T: Serialize + ?Sized>(
        &self,
        url: U,
        body: &T,
    ) -> Result<HttpResponse> {
        self.send(self.client.post(url).json(body)).await
    }

    pub async fn send(&self, builder: RequestBuilder) -> Result<HttpResponse> {
        self.execute(builder.build()?).await
    }

    /// Execute a request, buffering the whole response body
    pub async fn execute(&self, request: Request) -> Result<HttpResponse> {
        let info = HttpRequestInfo::from(&request);

        if self.source.is_enabled() {
            self.source.write(
                REQUEST_START_KEY,
                &HttpStartData {
                    request: info.clone(),
                },
            );
        }

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(info, e)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body: Arc<[u8]> = match response.bytes().await {
            Ok(body) => Arc::from(&body[..]),
            Err(e) => return Err(self.fail(info, e)),
        };

        debug!("{} {} -> {} ({} bytes)", info.method, redact_url(&url), status, body.len());

        if self.source.is_enabled() {
            let content = if body.is_empty() {
                None
            } else {
                Some(Arc::clone(&body))
            };
            self.source.write(
                REQUEST_STOP_KEY,
                &HttpStopData {
                    request: Some(info.clone()),
                    response: Some(HttpResponseInfo::new(status, Some(info), content)),
                    request_status: RequestStatus::RanToCompletion,
                },
            );
        }

        Ok(HttpResponse {
            status,
            headers,
            url,
            body,
        })
    }

    fn fail(&self, info: HttpRequestInfo, error: reqwest::Error) -> HttpSpyError {
        debug!("{} {:?} failed: {}", info.method, info.redacted_url(), error);

        if self.source.is_enabled() {
            let request_status = if error.is_timeout() {
                RequestStatus::Canceled
            } else {
                RequestStatus::Faulted
            };
            self.source.write(
                REQUEST_EXCEPTION_KEY,
                &HttpExceptionData {
                    request: info.clone(),
                    error: error.to_string(),
                },
            );
            self.source.write(
                REQUEST_STOP_KEY,
                &HttpStopData {
                    request: Some(info),
                    response: None,
                    request_status,
                },
            );
        }

        error.into()
    }
}

impl Default for InstrumentedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{AllSources, DiagnosticPayload, EventObserver};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        keys: Mutex<Vec<String>>,
        stops: Mutex<Vec<HttpStopData>>,
    }

    impl EventObserver for Recorder {
        fn on_event(&self, key: &str, payload: &dyn DiagnosticPayload) {
            self.keys.lock().unwrap().push(key.to_string());
            if let Some(stop) = payload.as_any().downcast_ref::<HttpStopData>() {
                self.stops.lock().unwrap().push(stop.clone());
            }
        }
    }

    fn private_client() -> InstrumentedClient {
        let registry = AllSources::new();
        let source = DiagnosticSource::new_in(&registry, HTTP_HANDLER_SOURCE_NAME);
        InstrumentedClient::with_source(Client::new(), source)
    }

    #[test]
    fn test_handler_source_is_shared() {
        let first = handler_source();
        let second = handler_source();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), HTTP_HANDLER_SOURCE_NAME);
    }

    #[tokio::test]
    async fn test_successful_request_publishes_start_and_stop() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = private_client();
        let recorder = Arc::new(Recorder::default());
        let _subscription = client.source().subscribe(recorder.clone());

        let response = client.get(format!("{}/data", server.url())).await.unwrap();
        mock.assert_async().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().unwrap(), "hello");
        assert_eq!(
            *recorder.keys.lock().unwrap(),
            vec![REQUEST_START_KEY, REQUEST_STOP_KEY]
        );

        let stops = recorder.stops.lock().unwrap();
        let stop = &stops[0];
        assert_eq!(stop.request_status, RequestStatus::RanToCompletion);
        let response_info = stop.response.as_ref().unwrap();
        assert_eq!(response_info.status, StatusCode::OK);
        assert_eq!(response_info.read_text().unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn test_empty_body_has_no_content() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/empty").with_status(204).create_async().await;

        let client = private_client();
        let recorder = Arc::new(Recorder::default());
        let _subscription = client.source().subscribe(recorder.clone());

        client.get(format!("{}/empty", server.url())).await.unwrap();

        let stops = recorder.stops.lock().unwrap();
        assert!(stops[0].response.as_ref().unwrap().content.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_publishes_stop_without_response() {
        let client = private_client();
        let recorder = Arc::new(Recorder::default());
        let _subscription = client.source().subscribe(recorder.clone());

        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = client.get(format!("http://127.0.0.1:{}/unreachable", port)).await;
        assert!(matches!(result, Err(HttpSpyError::HttpError(_))));

        assert_eq!(
            *recorder.keys.lock().unwrap(),
            vec![REQUEST_START_KEY, REQUEST_EXCEPTION_KEY, REQUEST_STOP_KEY]
        );
        let stops = recorder.stops.lock().unwrap();
        assert!(stops[0].response.is_none());
        assert_eq!(stops[0].request_status, RequestStatus::Faulted);
    }

    #[tokio::test]
    async fn test_json_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/echo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = private_client();
        let response = client
            .post_json(format!("{}/echo", server.url()), &serde_json::json!({"ping": 1}))
            .await
            .unwrap();

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_no_events_without_subscribers() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/quiet").with_body("x").create_async().await;

        let client = private_client();
        assert!(!client.source().is_enabled());

        let response = client.get(format!("{}/quiet", server.url())).await.unwrap();
        assert_eq!(response.bytes(), b"x");
    }
}
