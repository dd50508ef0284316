use http_spy::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // The trace lines are INFO events on the `http_spy` target
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // HTTP_SPY_LOG_BODY / HTTP_SPY_IGNORE, from the environment or a .env file
    let config = ObserverConfig::from_dotenv()?;
    let handle = HttpClientObserver::from_config(&config)?.subscribe_to(AllSources::global());

    let client = InstrumentedClient::new();

    println!("Fetching a traced URL...");
    let response = client.get("https://httpbin.org/json").await?;
    println!("Status: {}", response.status());

    println!("Posting to an ignored telemetry endpoint...");
    if let Err(e) = client
        .post_json(
            "https://dc.services.visualstudio.com/v2/track",
            &serde_json::json!([]),
        )
        .await
    {
        println!("Telemetry request failed (not traced either way): {}", e);
    }

    handle.release();

    println!("Fetching after release, nothing more is traced...");
    client.get("https://httpbin.org/get").await?;

    Ok(())
}
