mod api;
mod middleware;
mod scheduler;

use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = shopdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = shopdash_db::PoolConfig::from_app_config(&config);
    let pool = shopdash_db::connect_pool(&config.database_url, pool_config).await?;
    shopdash_db::run_migrations(&pool).await?;

    let sync = shopdash_sync::SyncService::from_app_config(pool.clone(), &config)?;
    let scheduler = scheduler::build_scheduler(sync.clone(), &config.sync_cron).await?;

    let app = build_app(
        AppState {
            pool,
            sync,
            scheduler: Some(scheduler),
        },
        default_rate_limit_state(),
    );

    tracing::info!(addr = %config.bind_addr, shop = %config.shop_url, "shopdash server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
