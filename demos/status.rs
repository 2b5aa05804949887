//! Status - pipelined queries in one round trip.
//!
//! This demo:
//! - Connects to the daemon named by `MPD_HOST` / `MPD_PORT`
//! - Submits several commands at once, which go out as one command list
//! - Prints the results as JSON
//!
//! # Running
//!
//! ```text
//! MPD_HOST=localhost RUST_LOG=mpc_client=debug cargo run --example status
//! ```

use mpc_client::{Client, Command, Endpoint};
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

    let endpoint = Endpoint::from_env()?;
    let client = Client::builder().connect_endpoint(&endpoint).await?;
    tracing::info!(%endpoint, version = %client.version(), "Connected");

    // submitted back to back: sent as a single command list
    let status = client.submit("status")?;
    let song = client.submit("currentsong")?;
    let queue = client.submit(Command::new("playlistinfo").arg("0:5"))?;
    let missing = client.submit(Command::new("find").arg("Title").arg("no such song"))?;

    println!("status: {}", serde_json::to_string_pretty(&status.await?.record())?);
    println!("current: {}", serde_json::to_string_pretty(&song.await?.record())?);

    let entries = queue.await?.records(&["file"]);
    println!("first {} queue entries:", entries.len());
    for entry in &entries {
        println!("  {}", serde_json::to_string(entry)?);
    }

    match missing.await {
        Ok(response) => println!("matches: {}", response.records(&["file"]).len()),
        Err(e) => match e.as_ack() {
            Some(ack) => println!("daemon refused: {}", serde_json::to_string(ack)?),
            None => return Err(e.into()),
        },
    }

    client.disconnect().await;
    Ok(())
}
