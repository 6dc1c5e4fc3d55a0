//! HTTP server: router construction and the `serve` entry point.

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::config::MapperConfig;
use crate::mapping::InvoiceMapper;
use crate::routes;

/// Build the API router around a mapper.
pub fn router(mapper: InvoiceMapper, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::health_check))
        .route("/process-invoice", post(routes::process_invoice))
        .route("/confirm-mapping", post(routes::confirm_mapping))
        .route("/upload-list", post(routes::upload_list))
        .route(
            "/mappings",
            get(routes::list_mappings).delete(routes::forget_mapping),
        )
        .route("/list", get(routes::show_list))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(mapper)
}

/// Start the HTTP API and run until Ctrl-C.
pub async fn serve(config: MapperConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting invoice mapper API");

    let mapper = InvoiceMapper::from_config(&config)?;
    tracing::info!(
        mappings = %config.resolved_mappings_path().display(),
        lists = %config.resolved_lists_dir().display(),
        model = %config.llm.model,
        "mapper ready"
    );

    let app = router(mapper, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
