use cogniquest_backend::config::Config;
use cogniquest_backend::db::Database;
use cogniquest_backend::logging;
use cogniquest_backend::seed;
use cogniquest_backend::services::lesson_generator::LessonGenerator;
use cogniquest_backend::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let seed_only = std::env::args().nth(1).as_deref() == Some("seed");

    let db = match Database::from_env().await {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::warn!(error = %err, "database not initialized");
            None
        }
    };

    if seed_only || config.seed_demo_data {
        match db.as_ref() {
            Some(db) => match seed::seed_demo_lessons(db).await {
                Ok(count) => tracing::info!(count, "demo lessons seeded"),
                Err(err) => tracing::error!(error = %err, "failed to seed demo lessons"),
            },
            None => tracing::error!("cannot seed demo lessons without a database"),
        }
    }

    if seed_only {
        if let Some(db) = db.as_ref() {
            db.close().await;
        }
        return;
    }

    let state = AppState::new(db, LessonGenerator::from_env());
    let app = cogniquest_backend::create_app(state.clone());

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "bind listener failed");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "cogniquest backend listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database pool");
    if let Some(db) = state.db() {
        db.close().await;
    }
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
