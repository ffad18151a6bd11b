//! JSON-RPC Server
//!
//! HTTP and WebSocket on one TCP port, localhost by default.

use crate::handler::RpcHandler;
use crate::subscription;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use waitline_core::application::{BusinessService, QueueEngine};

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9627;
const DEFAULT_RATE_LIMIT_BURST: u32 = 200;
const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 100;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
        }
    }
}

/// Register a request/response method whose params parse into the
/// handler method's argument
macro_rules! register_method {
    ($module:expr, $name:literal, $handler:expr, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move { handler.$method(params.parse()?).await }
            })
            .map_err(|e| e.to_string())?;
    }};
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, engine: QueueEngine, business: BusinessService) -> Self {
        let handler = RpcHandler::new(
            engine,
            business,
            config.rate_limit_burst,
            config.rate_limit_per_sec,
        );
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    fn build_module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Queue
        register_method!(module, "queue.join.v1", self.handler, join);
        register_method!(module, "queue.status.v1", self.handler, status);
        register_method!(module, "queue.call.v1", self.handler, call);
        register_method!(module, "queue.serve.v1", self.handler, serve);
        register_method!(module, "queue.cancel.v1", self.handler, cancel);
        register_method!(module, "queue.recalculate.v1", self.handler, recalculate);
        register_method!(module, "queue.board.v1", self.handler, board);

        // Business
        register_method!(module, "business.congestion.set.v1", self.handler, set_congestion);
        register_method!(module, "business.congestion.get.v1", self.handler, get_congestion);
        register_method!(module, "business.open.set.v1", self.handler, set_open);
        register_method!(module, "business.wait_time.v1", self.handler, wait_time);

        // Admin (no params)
        let handler = self.handler.clone();
        module
            .register_async_method("admin.health.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.health().await }
            })
            .map_err(|e| e.to_string())?;

        // Live updates (WebSocket only)
        let handler = self.handler.clone();
        module
            .register_subscription(
                "queue.subscribe.v1",
                "queue.snapshot",
                "queue.unsubscribe.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move { subscription::queue_snapshots(&handler, params, pending).await }
                },
            )
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_subscription(
                "queue.entry.subscribe.v1",
                "queue.entry",
                "queue.entry.unsubscribe.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    async move { subscription::entry_updates(&handler, params, pending).await }
                },
            )
            .map_err(|e| e.to_string())?;

        Ok(module)
    }

    /// Bind and start serving; returns the bound address and the handle
    /// that stops the server
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.build_module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        info!(addr = %local_addr, "JSON-RPC server started (HTTP + WebSocket)");

        Ok((local_addr, server.start(module)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitline_core::application::EngineConfig;
    use waitline_core::port::analytics::mocks::InMemoryRecorder;
    use waitline_core::port::business_registry::mocks::InMemoryBusinessRegistry;
    use waitline_core::port::id_provider::mocks::SequentialIdProvider;
    use waitline_core::port::prediction::mocks::MockPredictionAdapter;
    use waitline_core::port::queue_store::mocks::InMemoryQueueStore;
    use waitline_core::port::time_provider::mocks::MockTimeProvider;

    fn server() -> RpcServer {
        let store = InMemoryQueueStore::new();
        let registry = InMemoryBusinessRegistry::new();
        let clock = Arc::new(MockTimeProvider::new(0));
        let engine = QueueEngine::new(
            Arc::new(store.clone()),
            Arc::new(registry.clone()),
            Arc::new(InMemoryRecorder::new()),
            Arc::new(MockPredictionAdapter::unavailable()),
            Arc::new(SequentialIdProvider::new("q")),
            clock.clone(),
            EngineConfig::default(),
        );
        let business = BusinessService::new(Arc::new(registry), Arc::new(store), clock);
        RpcServer::new(
            RpcServerConfig {
                port: 0,
                ..RpcServerConfig::default()
            },
            engine,
            business,
        )
    }

    #[test]
    fn test_all_methods_registered() {
        let module = server().build_module().unwrap();
        let names: Vec<&str> = module.method_names().collect();

        for method in [
            "queue.join.v1",
            "queue.status.v1",
            "queue.call.v1",
            "queue.serve.v1",
            "queue.cancel.v1",
            "queue.recalculate.v1",
            "queue.board.v1",
            "business.congestion.set.v1",
            "business.congestion.get.v1",
            "business.open.set.v1",
            "business.wait_time.v1",
            "admin.health.v1",
            "queue.subscribe.v1",
            "queue.entry.subscribe.v1",
        ] {
            assert!(names.contains(&method), "{} not registered", method);
        }
    }

    #[tokio::test]
    async fn test_start_on_ephemeral_port() {
        let (addr, handle) = server().start().await.unwrap();
        assert_ne!(addr.port(), 0);

        handle.stop().unwrap();
        handle.stopped().await;
    }
}
