//! Waitline Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    BusinessRequest, CongestionStatus, EntryRequest, HealthResponse, JoinRequest, JoinResponse,
    OpenStatus, QueueBoard, QueueEntry, RecalculateResponse, SetCongestionRequest,
    TransitionResponse, UserInfo, WaitTimeSummary,
};
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Waitline daemon client
///
/// Plain calls go over HTTP. Each live subscription opens its own
/// WebSocket connection to the same address.
///
/// # Example
///
/// ```no_run
/// use waitline_sdk::{UserInfo, WaitlineClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WaitlineClient::connect("http://127.0.0.1:9627").await?;
/// let joined = client.join("demo-cafe", &UserInfo::new("Ann")).await?;
/// println!("#{} in line", joined.entry.position);
/// # Ok(())
/// # }
/// ```
pub struct WaitlineClient {
    client: HttpClient,
    ws_url: String,
}

impl WaitlineClient {
    /// Connect to the daemon at `url` (e.g. `http://127.0.0.1:9627`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            ws_url: ws_url(url),
        })
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: &P) -> Result<R> {
        Ok(self.client.request(method, object_params(params)?).await?)
    }

    /// Join a business's queue
    pub async fn join(&self, business_id: &str, user_info: &UserInfo) -> Result<JoinResponse> {
        self.call(
            "queue.join.v1",
            &JoinRequest {
                business_id,
                user_info,
            },
        )
        .await
    }

    pub async fn status(&self, queue_id: &str) -> Result<QueueEntry> {
        self.call("queue.status.v1", &EntryRequest { queue_id }).await
    }

    pub async fn call_entry(&self, queue_id: &str) -> Result<TransitionResponse> {
        self.call("queue.call.v1", &EntryRequest { queue_id }).await
    }

    pub async fn serve(&self, queue_id: &str) -> Result<TransitionResponse> {
        self.call("queue.serve.v1", &EntryRequest { queue_id }).await
    }

    pub async fn cancel(&self, queue_id: &str) -> Result<TransitionResponse> {
        self.call("queue.cancel.v1", &EntryRequest { queue_id }).await
    }

    /// Close gaps in the waiting positions; returns how many moved
    pub async fn recalculate(&self, business_id: &str) -> Result<RecalculateResponse> {
        self.call("queue.recalculate.v1", &BusinessRequest { business_id })
            .await
    }

    pub async fn board(&self, business_id: &str) -> Result<QueueBoard> {
        self.call("queue.board.v1", &BusinessRequest { business_id })
            .await
    }

    /// `level` is one of low, moderate, high
    pub async fn set_congestion(&self, business_id: &str, level: &str) -> Result<CongestionStatus> {
        self.call(
            "business.congestion.set.v1",
            &SetCongestionRequest { business_id, level },
        )
        .await
    }

    pub async fn congestion(&self, business_id: &str) -> Result<CongestionStatus> {
        self.call("business.congestion.get.v1", &BusinessRequest { business_id })
            .await
    }

    pub async fn set_open(&self, business_id: &str, is_open: bool) -> Result<OpenStatus> {
        self.call(
            "business.open.set.v1",
            &OpenStatus {
                business_id: business_id.to_string(),
                is_open,
            },
        )
        .await
    }

    pub async fn wait_time(&self, business_id: &str) -> Result<WaitTimeSummary> {
        self.call("business.wait_time.v1", &BusinessRequest { business_id })
            .await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        Ok(self.client.request("admin.health.v1", rpc_params![]).await?)
    }

    async fn ws(&self) -> Result<WsClient> {
        WsClientBuilder::default()
            .build(&self.ws_url)
            .await
            .map_err(|e| SdkError::Connection(format!("WebSocket connect failed: {}", e)))
    }

    /// Waiting entries of a business, pushed on every change
    pub async fn subscribe_queue(&self, business_id: &str) -> Result<LiveUpdates<Vec<QueueEntry>>> {
        let ws = self.ws().await?;
        let inner = ws
            .subscribe(
                "queue.subscribe.v1",
                object_params(&BusinessRequest { business_id })?,
                "queue.unsubscribe.v1",
            )
            .await?;
        Ok(LiveUpdates { inner, _ws: ws })
    }

    /// One entry, pushed whenever it changes; `None` if it does not exist
    pub async fn subscribe_entry(&self, queue_id: &str) -> Result<LiveUpdates<Option<QueueEntry>>> {
        let ws = self.ws().await?;
        let inner = ws
            .subscribe(
                "queue.entry.subscribe.v1",
                object_params(&EntryRequest { queue_id })?,
                "queue.entry.unsubscribe.v1",
            )
            .await?;
        Ok(LiveUpdates { inner, _ws: ws })
    }
}

/// Live snapshot stream; the first item is the current state
pub struct LiveUpdates<T> {
    inner: Subscription<T>,
    _ws: WsClient,
}

impl<T: DeserializeOwned> LiveUpdates<T> {
    /// Next snapshot; `None` once the server closes the stream
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.inner.next().await.map(|item| item.map_err(SdkError::from))
    }

    pub async fn unsubscribe(self) -> Result<()> {
        self.inner.unsubscribe().await?;
        Ok(())
    }
}

/// Parameters are always sent by name
fn object_params<T: Serialize>(request: &T) -> Result<ObjectParams> {
    let mut params = ObjectParams::new();
    match serde_json::to_value(request)? {
        Value::Object(map) => {
            for (key, value) in map {
                params.insert(&key, value)?;
            }
        }
        other => {
            return Err(SdkError::Other(format!(
                "request must serialize to an object, got {}",
                other
            )))
        }
    }
    Ok(params)
}

fn ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::core::traits::ToRpcParams;

    #[test]
    fn test_ws_url_follows_scheme() {
        assert_eq!(ws_url("http://127.0.0.1:9627"), "ws://127.0.0.1:9627");
        assert_eq!(ws_url("https://queue.example"), "wss://queue.example");
        assert_eq!(ws_url("ws://already"), "ws://already");
    }

    #[test]
    fn test_params_are_named() {
        let params = object_params(&EntryRequest { queue_id: "q-1" }).unwrap();
        let raw = params.to_rpc_params().unwrap().unwrap();
        let value: Value = serde_json::from_str(raw.get()).unwrap();
        assert_eq!(value, serde_json::json!({ "queue_id": "q-1" }));
    }

    #[test]
    fn test_non_object_params_rejected() {
        assert!(object_params(&"plain").is_err());
    }
}
