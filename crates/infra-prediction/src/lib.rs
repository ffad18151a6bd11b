// Waitline Infrastructure - Prediction Service Adapter
// Implements: PredictionAdapter over HTTP (GET /health, POST /predict_wait_time)

mod client;

pub use client::{HttpPredictionAdapter, PredictionConfig};
