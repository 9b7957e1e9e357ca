//! Dineflow API server

use anyhow::Context;
use dineflow_api::{create_router, AppState, Config};
use dineflow_shared::{create_migration_pool, create_pool, run_migrations};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,dineflow_api=debug,dineflow_billing=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(bind_address = %config.bind_address, "Starting Dineflow API");

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    if config.run_migrations {
        // Migrations need a session-mode connection; the pooler URL only works for queries
        match &config.database_direct_url {
            Some(direct_url) => {
                let migration_pool = create_migration_pool(direct_url)
                    .await
                    .context("Failed to connect for migrations")?;
                run_migrations(&migration_pool).await.context("Migrations failed")?;
                migration_pool.close().await;
            }
            None => run_migrations(&pool).await.context("Migrations failed")?,
        }
        tracing::info!("Database migrations applied");
    }

    let bind_address = config.bind_address.clone();
    let app = create_router(AppState::new(pool, config));

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
