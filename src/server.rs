//! MCP server initialization for stdio and SSE transports.
//!
//! Provides [`serve_stdio`] and [`serve_sse`] entry points that open the
//! runtime and expose its engine through [`KosTools`].

use crate::config::KosConfig;
use crate::runtime::Kos;
use crate::tools::KosTools;
use anyhow::Result;
use rmcp::ServiceExt;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: KosConfig) -> Result<()> {
    tracing::info!("starting kos MCP server on stdio");

    let kos = Kos::open(config)?;
    let tools = KosTools::new(kos.engine());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    kos.shutdown()
}

/// Start the MCP server over Streamable HTTP (SSE) transport.
pub async fn serve_sse(config: KosConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting kos MCP server on SSE/HTTP");

    let kos = Kos::open(config)?;
    let engine = kos.engine();

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(KosTools::new(engine.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down SSE server");
        })
        .await?;

    kos.shutdown()
}
