//! JSON-RPC Server
//!
//! Serves the engine over JSON-RPC 2.0 on a localhost TCP port.

use crate::handler::RpcHandler;
use crate::types::{InspectRequest, MatchJobsRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use talentmatch_core::application::MatchOrchestrator;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl RpcServerConfig {
    /// Socket address to bind; anything but a loopback address is refused
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|e| format!("Invalid RPC host '{}': {}", self.host, e))?
        };

        if !ip.is_loopback() {
            return Err(format!(
                "RPC host {} is not a loopback address; the engine only serves localhost",
                ip
            ));
        }
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, orchestrator: Arc<MatchOrchestrator>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(orchestrator)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Binds loopback only; see [`RpcServerConfig::bind_addr`].
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = self.config.bind_addr()?;

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP (localhost only)"
        );

        let server = Server::builder()
            .build(addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let module = Self::build_module(self.handler)?;

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }

    fn build_module(handler: Arc<RpcHandler>) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        let h = handler.clone();
        module
            .register_async_method("match.jobs.v1", move |params, _, _| {
                let handler = h.clone();
                async move {
                    let req: MatchJobsRequest = params.parse()?;
                    handler.match_jobs(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let h = handler.clone();
        module
            .register_async_method("match.inspect.v1", move |params, _, _| {
                let handler = h.clone();
                async move {
                    let req: InspectRequest = params.parse()?;
                    handler.inspect(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let h = handler.clone();
        module
            .register_async_method("engine.status.v1", move |_params, _, _| {
                let handler = h.clone();
                async move { handler.status().await }
            })
            .map_err(|e| e.to_string())?;

        // Admin APIs
        let h = handler;
        module
            .register_async_method("admin.scorer.restart.v1", move |_params, _, _| {
                let handler = h.clone();
                async move { handler.restart_scorer().await }
            })
            .map_err(|e| e.to_string())?;

        Ok(module)
    }
}
