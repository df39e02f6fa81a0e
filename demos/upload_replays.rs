//! Upload replays example
//!
//! This example demonstrates the core functionality of replay-upload:
//! - Pointing the client at a server
//! - Checking and establishing the session
//! - Subscribing to events
//! - Submitting a batch of replay files
//! - Waiting for every item to settle
//!
//! Usage: `UPLOAD_PASSWORD=secret cargo run --example upload_replays -- a.replay b.replay`

use replay_upload::config::{Config, ServerConfig};
use replay_upload::{Event, FileCandidate, Uploader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let base_url = std::env::var("UPLOAD_SERVER")
        .unwrap_or_else(|_| "http://127.0.0.1:5000/api/".to_string());
    let config = Config {
        server: ServerConfig {
            base_url,
            ..Default::default()
        },
        ..Default::default()
    };

    let uploader = Uploader::connect(config).await?;

    if !uploader.is_authenticated() {
        let password = std::env::var("UPLOAD_PASSWORD").unwrap_or_default();
        uploader.authenticate(&password).await?;
        println!("✓ Authenticated");
    }

    // Subscribe to events
    let mut events = uploader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::ItemAdded { id, name } => {
                    println!("+ #{} {}", id, name);
                }
                Event::Progress { id, sent, total } => {
                    println!("  #{} sent {}/{} bytes", id, sent, total);
                }
                Event::StatusChanged { id, message, .. } => {
                    println!("  #{} {}", id, message);
                }
                Event::SessionChanged { authenticated } => {
                    println!("Session authenticated: {}", authenticated);
                }
                _ => {}
            }
        }
    });

    let mut files = Vec::new();
    for path in std::env::args().skip(1) {
        match FileCandidate::from_path(&path).await {
            Ok(file) => files.push(file),
            Err(e) => eprintln!("✗ Could not read {}: {}", path, e),
        }
    }

    let ids = uploader.submit(files).await;
    uploader.wait_idle().await;

    println!();
    for id in ids {
        if let Some(item) = uploader.item(id).await {
            println!("{:<40} {}", item.name, item.message);
        }
    }

    Ok(())
}
