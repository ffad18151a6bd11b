//! JSON-RPC API Layer
//!
//! Serves the queue engine over JSON-RPC 2.0 (HTTP and WebSocket on one
//! port). Live queue snapshots are pushed as WebSocket subscriptions.

pub mod error;
pub mod handler;
mod rate_limiter;
pub mod server;
mod subscription;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
