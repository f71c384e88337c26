//! Minimal embedded-console wiring: logging, session bootstrap, one
//! operation, final report. Point `SHOPDECK_API` at a running backend to see
//! live responses; without one the connectivity failures land in the
//! diagnostic trail instead.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use shopdeck_client::{Slot, TokenProviderAdapter, TokenSource};
use shopdeck_session::{Session, SessionConfig};
use shopdeck_telemetry::init_client_logging;

struct HostBridge;

#[async_trait]
impl TokenSource for HostBridge {
    async fn id_token(&self) -> anyhow::Result<String> {
        // A real embed asks the hosting runtime; the demo mints a stand-in.
        Ok("demo-token".to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_client_logging(Path::new("logs"), 7)?;

    let base_url =
        std::env::var("SHOPDECK_API").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());
    let location = std::env::var("SHOPDECK_LOCATION").unwrap_or_else(|_| {
        "https://console.example.com/?shop=acme&host=demo&embedded=1".to_string()
    });

    let session = Session::new(
        SessionConfig::new(base_url, location),
        TokenProviderAdapter::new(Arc::new(HostBridge)),
    )?;

    let readiness = session.bootstrap(|| true).await;
    println!(
        "handshake ready={} in {}ms",
        readiness.ready, readiness.elapsed_ms
    );

    match session.check_store_status().await {
        Ok(status) => println!("store connected: {}", status.is_connected),
        Err(err) => println!("store status unavailable: {err}"),
    }

    if let Some(outcome) = session.run(Slot::ProcessOrders).await {
        println!("process_orders -> {outcome:?}");
    }

    session.finish().await;
    Ok(())
}
