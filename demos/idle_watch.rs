//! Idle watch - print change notifications as they happen.
//!
//! Each change re-reads `status` so the output shows what changed to what.
//! Stop with Ctrl-C.
//!
//! # Running
//!
//! ```text
//! MPD_HOST=/run/mpd/socket cargo run --example idle_watch
//! ```

use mpc_client::{Client, Endpoint, Event};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let client = Client::builder()
        .event_capacity(64)
        .connect_endpoint(&Endpoint::from_env()?)
        .await?;
    let mut events = client.subscribe();
    tracing::info!(version = %client.version(), "Watching for changes");

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => break,
        };

        match event {
            Ok(event) => {
                println!("{}", serde_json::to_string(&event)?);
                match event {
                    Event::Changed { .. } if event.concerns("player") || event.concerns("mixer") => {
                        let status = client.send_command("status").await?.record();
                        println!(
                            "  state={} volume={}",
                            status.get("state").unwrap_or("?"),
                            status.get("volume").unwrap_or("?")
                        );
                    }
                    Event::Disconnected { .. } => return Ok(()),
                    _ => {}
                }
            }
            Err(RecvError::Lagged(n)) => tracing::warn!("Missed {} events", n),
            Err(RecvError::Closed) => break,
        }
    }

    client.disconnect().await;
    Ok(())
}
