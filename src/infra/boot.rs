use std::net::SocketAddr;

use crate::infra::config::Config;
use crate::tools::router::BioosGatewaySvc;

pub async fn run_server() -> anyhow::Result<()> {
    let cfg = Config::from_env();
    cfg.validate().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(
        mode = %cfg.mode,
        port = cfg.port,
        endpoint = %cfg.endpoint,
        "BOOT bioos-mcp-gateway"
    );

    let svc = BioosGatewaySvc::from_config(&cfg);

    // Stdio mode: run MCP over stdio ONLY (no HTTP).
    if cfg.mode == "stdio" {
        crate::infra::runtime::mcp_transport::serve_stdio(svc)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let app = crate::infra::http_app::build_app(svc);
    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
