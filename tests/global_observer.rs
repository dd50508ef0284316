//! Exercises the process-wide registry and handler source. Kept to a single test so no
//! other test in this binary shares the global state.

use http_spy::diagnostics::AllSources;
use http_spy::emitter::MemorySink;
use http_spy::filter::PatternFilter;
use http_spy::observer::HttpClientObserver;
use http_spy::transport::{handler_source, InstrumentedClient};
use std::sync::Arc;

#[tokio::test]
async fn subscribe_all_taps_the_shared_transport() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/ping").with_body("pong").create_async().await;

    let sink = MemorySink::default();
    let handle = HttpClientObserver::new(true, Some(PatternFilter::default_set()))
        .with_sink(Arc::new(sink.clone()))
        .subscribe_to(AllSources::global());

    let client = InstrumentedClient::new();
    assert!(Arc::ptr_eq(client.source(), &handler_source()));
    assert!(handle.observer().is_attached());

    client.get(format!("{}/ping", server.url())).await.unwrap();
    assert_eq!(sink.headers().len(), 1);
    assert_eq!(sink.bodies()[0].message, "pong");

    handle.release();
    assert!(!handler_source().is_enabled());

    client.get(format!("{}/ping", server.url())).await.unwrap();
    assert_eq!(sink.len(), 2);
}
