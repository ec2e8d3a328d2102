//! silo host binary.
//!
//! - Load strict YAML config (argv[1], else `$SILO_CONFIG`, else `silo.yaml`)
//! - Populate the process store, start the job pool, serve ops endpoints
//! - Ctrl-C / SIGTERM: stopping → drain jobs → stopped

use std::net::SocketAddr;

use silo_host::{bootstrap, config, obs, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = config::resolve_path(
        std::env::args().nth(1),
        std::env::var(config::PATH_ENV).ok(),
    );
    let cfg = config::load_from_file(&path)?;
    obs::logging::init(&cfg.logging)?;

    let ops = cfg.ops.clone();
    let app = bootstrap::bootstrap(cfg)?.build();

    // Callbacks registered by bootstrap run first; anything else belongs above `build`.
    if let Err(e) = app.started() {
        tracing::error!(error = %e, "startup failed");
        bootstrap::shutdown(&app).await?;
        return Err(e.into());
    }

    let log = app.logger("host")?;
    log.info(&format!(
        "{} ready at {}",
        app.application_name()?,
        app.date_time_provider()?.now().to_rfc3339()
    ));

    if ops.enabled {
        let listen: SocketAddr = ops.listen.parse()?;
        let listener = tokio::net::TcpListener::bind(listen).await?;
        tracing::info!(%listen, "ops endpoints listening");
        axum::serve(listener, router::build_router(app.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        shutdown_signal().await;
    }

    let report = bootstrap::shutdown(&app).await?;
    tracing::info!(callbacks = report.ran, faults = report.faults.len(), "shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
