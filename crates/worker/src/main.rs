use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitals_cache::CacheConfig;
use vitals_db::DbConfig;
use vitals_pipeline::{Backends, RecordProcessor};
use vitals_queue::{QueueConfig, QueueWorker, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitals_worker=debug,vitals_queue=debug,vitals_pipeline=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let db_config = DbConfig::from_env();
    let cache_config = CacheConfig::from_env();
    let queue_config = QueueConfig::from_env();
    let worker_config = WorkerConfig::from_env();

    let backends = Backends::connect(&db_config, &cache_config, &queue_config)
        .await
        .expect("Failed to connect backends");

    let processor = Arc::new(RecordProcessor::new(backends.store, backends.cache));
    let worker = QueueWorker::new(backends.queue, processor, worker_config);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    worker.run(cancel).await;
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
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
        () = ctrl_c => tracing::info!("Received SIGINT, draining in-flight jobs"),
        () = terminate => tracing::info!("Received SIGTERM, draining in-flight jobs"),
    }
}
