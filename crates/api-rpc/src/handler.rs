//! RPC Method Handlers
//!
//! Thin translation between wire types and the application services.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    BusinessRequest, EntryRequest, HealthResponse, JoinRequest, JoinResponse,
    RecalculateResponse, SetCongestionRequest, SetOpenRequest, SetOpenResponse,
    TransitionResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::time::Instant;
use tracing::warn;
use waitline_core::application::{
    BusinessService, CongestionStatus, QueueBoard, QueueEngine, WaitTimeSummary,
};
use waitline_core::domain::QueueEntry;

type RpcResult<T> = Result<T, ErrorObjectOwned>;

/// RPC Handler with injected services
pub struct RpcHandler {
    engine: QueueEngine,
    business: BusinessService,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(
        engine: QueueEngine,
        business: BusinessService,
        rate_limit_burst: u32,
        rate_limit_per_sec: u32,
    ) -> Self {
        Self {
            engine,
            business,
            rate_limiter: RateLimiter::new(rate_limit_burst, rate_limit_per_sec),
            start_time: Instant::now(),
        }
    }

    pub fn engine(&self) -> &QueueEngine {
        &self.engine
    }

    fn throttle(&self) -> RpcResult<()> {
        if self.rate_limiter.try_acquire() {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRequest) -> RpcResult<JoinResponse> {
        self.throttle()?;

        let entry = self
            .engine
            .join(&params.business_id, params.user_info)
            .await
            .map_err(to_rpc_error)?;

        Ok(JoinResponse {
            queue_id: entry.id.clone(),
            entry,
        })
    }

    /// queue.status.v1
    pub async fn status(&self, params: EntryRequest) -> RpcResult<QueueEntry> {
        self.engine
            .get_status(&params.queue_id)
            .await
            .map_err(to_rpc_error)
    }

    /// queue.call.v1
    pub async fn call(&self, params: EntryRequest) -> RpcResult<TransitionResponse> {
        self.throttle()?;
        let entry = self
            .engine
            .call(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(transition(entry))
    }

    /// queue.serve.v1
    pub async fn serve(&self, params: EntryRequest) -> RpcResult<TransitionResponse> {
        self.throttle()?;
        let entry = self
            .engine
            .serve(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(transition(entry))
    }

    /// queue.cancel.v1
    pub async fn cancel(&self, params: EntryRequest) -> RpcResult<TransitionResponse> {
        self.throttle()?;
        let entry = self
            .engine
            .cancel(&params.queue_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(transition(entry))
    }

    /// queue.recalculate.v1
    pub async fn recalculate(&self, params: BusinessRequest) -> RpcResult<RecalculateResponse> {
        self.throttle()?;
        let updated_count = self
            .engine
            .recalculate_positions(&params.business_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(RecalculateResponse {
            business_id: params.business_id,
            updated_count,
        })
    }

    /// queue.board.v1
    pub async fn board(&self, params: BusinessRequest) -> RpcResult<QueueBoard> {
        self.engine
            .board(&params.business_id)
            .await
            .map_err(to_rpc_error)
    }

    /// business.congestion.set.v1
    pub async fn set_congestion(&self, params: SetCongestionRequest) -> RpcResult<CongestionStatus> {
        self.throttle()?;
        self.business
            .set_congestion(&params.business_id, &params.level)
            .await
            .map_err(to_rpc_error)
    }

    /// business.congestion.get.v1
    pub async fn get_congestion(&self, params: BusinessRequest) -> RpcResult<CongestionStatus> {
        self.business
            .get_congestion(&params.business_id)
            .await
            .map_err(to_rpc_error)
    }

    /// business.open.set.v1
    pub async fn set_open(&self, params: SetOpenRequest) -> RpcResult<SetOpenResponse> {
        self.throttle()?;
        self.business
            .set_open(&params.business_id, params.is_open)
            .await
            .map_err(to_rpc_error)?;
        Ok(params)
    }

    /// business.wait_time.v1
    pub async fn wait_time(&self, params: BusinessRequest) -> RpcResult<WaitTimeSummary> {
        self.business
            .wait_time_summary(&params.business_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.health.v1
    pub async fn health(&self) -> RpcResult<HealthResponse> {
        let store_ok = match self.engine.ping_store().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Health check: store unreachable");
                false
            }
        };
        let prediction_available = self.engine.estimator().prediction_available().await;

        Ok(HealthResponse {
            status: if store_ok { "ok" } else { "degraded" }.to_string(),
            store: if store_ok { "ok" } else { "unavailable" }.to_string(),
            prediction_available,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }
}

fn transition(entry: QueueEntry) -> TransitionResponse {
    TransitionResponse {
        queue_id: entry.id,
        status: entry.status,
    }
}
