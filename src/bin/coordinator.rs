use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::EnvFilter;

use genepool_evo::coordinator::http::router;
use genepool_evo::coordinator::remote::RemoteEvaluatorFactory;
use genepool_evo::coordinator::Coordinator;
use genepool_evo::reporting::webhook::WebhookReporter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("genepool_evo=info".parse()?))
        .init();

    let addr = std::env::var("GENEPOOL_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let mut coordinator = Coordinator::new(
        RemoteEvaluatorFactory::new(Handle::current()),
        Handle::current(),
    );
    if let Ok(url) = std::env::var("GENEPOOL_WEBHOOK_URL") {
        info!(url = %url, "Posting run reports");
        coordinator = coordinator.with_reporter(WebhookReporter::new(url));
    }

    let app = router(Arc::new(coordinator));

    info!("Coordinator listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
