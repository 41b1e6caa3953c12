mod config;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nutrisaur_api::auth::ensure_admin;
use nutrisaur_api::routes::router;
use nutrisaur_api::session::SessionConfig;
use nutrisaur_api::state::AppStateInner;
use nutrisaur_db::Database;

use config::Config;

const DEFAULT_LOG_FILTER: &str = concat!(
    "nutrisaur=debug,nutrisaur_api=debug,nutrisaur_db=debug,",
    "nutrisaur_gateway=debug,tower_http=debug"
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    let db = Database::open(&config.db_path)?;

    if let Some(admin) = &config.admin {
        if ensure_admin(&db, &admin.username, &admin.email, &admin.password)? {
            info!("Created admin account for {}", admin.email);
        }
    } else {
        warn!("No admin bootstrap configured; notification logging needs an existing admin");
    }

    let state = AppStateInner::new(
        db,
        SessionConfig {
            secret: config.session_secret.clone(),
            ttl: config.session_ttl,
        },
    );

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Nutrisaur server listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
