use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forge_api::config::{ServerConfig, StorageConfig};
use forge_api::router::build_app_router;
use forge_api::state::AppState;
use forge_pipeline::store::PgTaskStore;
use forge_pipeline::GenerationOrchestrator;
use forge_providers::api::ProviderClient;
use forge_storage::{BlobStore, LocalBlobStore, S3BlobStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forge_api=debug,forge_pipeline=debug,forge_providers=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = forge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    forge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    forge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    if config.provider.api_key.is_none() {
        tracing::warn!("PROVIDER_API_KEY is not set; requests must supply x-provider-key");
    }
    let provider_client = ProviderClient::new(config.provider_client_config())
        .expect("Failed to build provider HTTP client");

    let blobs: Arc<dyn BlobStore> = match &config.storage {
        StorageConfig::Local {
            root,
            public_base_url,
        } => {
            tracing::info!(root = %root.display(), "Using local blob store");
            Arc::new(LocalBlobStore::new(root.clone(), public_base_url.clone()))
        }
        StorageConfig::S3 {
            bucket,
            public_base_url,
        } => {
            tracing::info!(%bucket, "Using S3 blob store");
            Arc::new(S3BlobStore::from_env(bucket.clone(), public_base_url.clone()).await)
        }
    };

    let orchestrator = Arc::new(GenerationOrchestrator::new(
        Arc::new(provider_client),
        Arc::new(PgTaskStore::new(pool.clone())),
        blobs,
        config.orchestrator_config(),
    ));
    tracing::info!(
        max_poll_attempts = config.poll_max_attempts,
        lease_secs = config.materialize_lease_secs,
        "Generation orchestrator ready"
    );

    let state = AppState {
        orchestrator,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
