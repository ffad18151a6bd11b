//! Waitline SDK - Rust Client Library
//!
//! Client for the Waitline daemon's JSON-RPC API, including live queue
//! subscriptions over WebSocket.
//!
//! # Example
//!
//! ```no_run
//! use waitline_sdk::{UserInfo, WaitlineClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WaitlineClient::connect("http://127.0.0.1:9627").await?;
//!
//!     let joined = client
//!         .join("demo-cafe", &UserInfo::new("Ann").with_party_size(3))
//!         .await?;
//!     println!("Ticket {} (about {} min)", joined.queue_id, joined.entry.estimated_wait_time);
//!
//!     let mut updates = client.subscribe_entry(&joined.queue_id).await?;
//!     while let Some(Ok(Some(entry))) = updates.next().await {
//!         println!("now #{}", entry.position);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{LiveUpdates, WaitlineClient};
pub use error::{Result, SdkError};
pub use types::{
    BusinessSummary, CongestionLevel, CongestionStatus, EntryStatus, HealthResponse,
    JoinResponse, OpenStatus, QueueBoard, QueueEntry, RecalculateResponse, TransitionResponse,
    UserInfo, WaitTimeSummary,
};
