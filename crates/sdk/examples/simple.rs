//! Simple SDK Example
//!
//! 1. Start the daemon: `cargo run --package waitline-daemon`
//! 2. Run this example: `cargo run --package waitline-sdk --example simple`

use waitline_sdk::{UserInfo, WaitlineClient};

const BUSINESS: &str = "demo-cafe";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = WaitlineClient::connect("http://127.0.0.1:9627").await?;

    let health = client.health().await?;
    println!(
        "daemon {} (prediction {})",
        health.status,
        if health.prediction_available { "up" } else { "down" }
    );

    let mut live = client.subscribe_queue(BUSINESS).await?;

    let ann = client.join(BUSINESS, &UserInfo::new("Ann")).await?;
    let bob = client
        .join(BUSINESS, &UserInfo::new("Bob").with_party_size(4))
        .await?;
    println!("Ann: {} min, Bob: {} min", ann.entry.estimated_wait_time, bob.entry.estimated_wait_time);

    client.call_entry(&ann.queue_id).await?;
    client.serve(&ann.queue_id).await?;
    client.recalculate(BUSINESS).await?;

    // Initial snapshot plus a few changes
    for _ in 0..4 {
        match live.next().await {
            Some(Ok(waiting)) => {
                let names: Vec<_> = waiting
                    .iter()
                    .map(|e| format!("#{} {}", e.position, e.user_info.name))
                    .collect();
                println!("waiting: [{}]", names.join(", "));
            }
            _ => break,
        }
    }
    live.unsubscribe().await?;

    let board = client.board(BUSINESS).await?;
    println!(
        "{}: {} waiting, {} served",
        board.business.name, board.queue_length, board.total_served
    );

    Ok(())
}
