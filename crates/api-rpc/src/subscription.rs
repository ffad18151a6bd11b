// WebSocket subscriptions: forward engine snapshots to a jsonrpsee sink

use crate::error::to_rpc_error;
use crate::handler::RpcHandler;
use crate::types::{BusinessRequest, EntryRequest};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::types::Params;
use jsonrpsee::{PendingSubscriptionSink, SubscriptionMessage, SubscriptionSink};
use serde::Serialize;
use tracing::debug;
use waitline_core::application::Subscription;

pub(crate) async fn queue_snapshots(
    handler: &RpcHandler,
    params: Params<'static>,
    pending: PendingSubscriptionSink,
) -> SubscriptionResult {
    let req: BusinessRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    match handler.engine().subscribe(&req.business_id).await {
        Ok(subscription) => {
            let sink = pending.accept().await?;
            debug!(business_id = %req.business_id, "Queue subscription opened");
            forward(subscription, sink).await
        }
        Err(e) => {
            pending.reject(to_rpc_error(e)).await;
            Ok(())
        }
    }
}

pub(crate) async fn entry_updates(
    handler: &RpcHandler,
    params: Params<'static>,
    pending: PendingSubscriptionSink,
) -> SubscriptionResult {
    let req: EntryRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    match handler.engine().subscribe_to_entry(&req.queue_id).await {
        Ok(subscription) => {
            let sink = pending.accept().await?;
            debug!(queue_id = %req.queue_id, "Entry subscription opened");
            forward(subscription, sink).await
        }
        Err(e) => {
            pending.reject(to_rpc_error(e)).await;
            Ok(())
        }
    }
}

/// Pump snapshots until either side goes away
async fn forward<T: Serialize + Send>(
    mut subscription: Subscription<T>,
    sink: SubscriptionSink,
) -> SubscriptionResult {
    loop {
        tokio::select! {
            _ = sink.closed() => break,
            snapshot = subscription.next() => {
                let Some(snapshot) = snapshot else { break };
                let message = SubscriptionMessage::from_json(&snapshot)?;
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        }
    }

    subscription.unsubscribe().await;
    debug!("Subscription closed");
    Ok(())
}
