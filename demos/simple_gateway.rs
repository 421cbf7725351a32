//! Simple gateway example against a simulated control system
//!
//! Run with: cargo run --example simple_gateway [SECONDS]
//!
//! Examples:
//!   cargo run --example simple_gateway        # streams for 10 seconds
//!   cargo run --example simple_gateway 30     # streams for 30 seconds
//!
//! Creates a gateway over the simulated adapter, subscribes one stream to
//! three channels (one monitored, one polled, one averaged), and prints
//! every emitted event.

use std::sync::Arc;
use std::time::Duration;

use streamgate::adapter::{SimAdapter, SimChannelSpec};
use streamgate::filter::FilterSpec;
use streamgate::{
    AcquisitionMode, ChannelSpec, Gateway, GatewayConfig, StreamProperties,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let seconds: u64 = match args.get(1) {
        Some(s) => s.parse().unwrap_or(10),
        None => 10,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streamgate=debug".parse()?)
                .add_directive("simple_gateway=info".parse()?),
        )
        .init();

    // Simulated source: a fast ramp, a slow ramp, and a noisy channel
    let adapter = Arc::new(SimAdapter::new());
    adapter
        .add_channel(
            "SIM:FAST",
            SimChannelSpec::default().period(Duration::from_millis(20)),
        )
        .await;
    adapter
        .add_channel("SIM:SLOW", SimChannelSpec::default())
        .await;
    adapter
        .add_channel(
            "SIM:NOISY",
            SimChannelSpec::default().period(Duration::from_millis(10)),
        )
        .await;

    let gateway = Gateway::new(
        adapter,
        GatewayConfig::default().teardown_grace(Duration::from_secs(2)),
    );

    let publisher = gateway
        .create_stream(
            vec![
                ChannelSpec::new("SIM:FAST"),
                ChannelSpec::new("SIM:SLOW")
                    .mode(AcquisitionMode::Poll)
                    .poll_interval_ms(500),
                ChannelSpec::new("SIM:NOISY").filter(FilterSpec::Averager { window: 10 }),
            ],
            StreamProperties::default()
                .heartbeat_interval_ms(5000)
                .monitored_interval_ms(250)
                .polled_interval_ms(1000)
                .numeric_precision(3),
        )
        .await?;

    println!("Streaming for {} seconds (stream {})...", seconds, publisher.id());
    println!();

    let mut events = publisher.events().await?;
    publisher.activate().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => println!("[{}] {}: {}", event.event_type, event.comment, event.payload),
                    Err(e) => {
                        eprintln!("Stream ended: {}", e);
                        break;
                    }
                }
            }
            _ = &mut deadline => {
                println!("\nShutting down...");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    let stats = publisher.stats();
    println!(
        "Stats: {} events ({} monitored, {} polled, {} heartbeats), {} samples",
        stats.total_events(),
        stats.monitored_events,
        stats.polled_events,
        stats.heartbeat_events,
        stats.samples_delivered,
    );

    gateway.shutdown_all().await;
    Ok(())
}
