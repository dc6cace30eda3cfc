//! Generic MCP transport helpers (stdio + streamable HTTP) decoupled from tool logic.

use std::sync::Arc;

use rmcp::serve_server;
use rmcp::transport::streamable_http_server::tower::{
    StreamableHttpServerConfig, StreamableHttpService,
};

pub use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
pub use rmcp::ServerHandler;

/// Speak JSON-RPC over stdin/stdout until the client hangs up.
pub async fn serve_stdio<H>(handler: H) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    H: ServerHandler,
{
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    serve_server(handler, (stdin, stdout)).await?;
    Ok(())
}

/// Build the streamable-HTTP tower service around a cloneable handler; each
/// session gets its own clone.
pub fn make_streamable_http_service<H>(
    handler: H,
    session_mgr: Arc<LocalSessionManager>,
) -> StreamableHttpService<H, LocalSessionManager>
where
    H: ServerHandler + Clone,
{
    let cfg = StreamableHttpServerConfig::default();
    StreamableHttpService::new(move || Ok(handler.clone()), session_mgr, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::Config;
    use crate::tools::router::BioosGatewaySvc;

    #[tokio::test]
    async fn streamable_http_service_builds() {
        let session_mgr = Arc::new(LocalSessionManager::default());
        let svc = BioosGatewaySvc::from_config(&Config::from_env());
        let _service = make_streamable_http_service(svc, session_mgr);
    }
}
