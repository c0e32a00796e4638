use anyhow::Result;
use lib_common::ingestors::{CsvPollingIngestor, HttpSnapshotSource};
use lib_common::loggers::setup_logging;
use lib_common::store::StoreReader;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};

mod relay_logic;
use relay_logic::{config, downstream};

const APP_NAME: &str = "server_csv_relay";

/// Why the process is shutting down.
enum Stop {
    Signal,
    WebView(Result<Result<()>, JoinError>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;
    let log_file = setup_logging(APP_NAME, &config.log_dir(), config.log_level())?;
    log::info!("Logging to {}", log_file.display());

    let ingest = config.ingest_config()?;
    log::info!("Starting with {}", ingest);

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let source = HttpSnapshotSource::new(&ingest)?;
    let ingestor = CsvPollingIngestor::new(source, &ingest);
    let reader = Arc::new(StoreReader::new(ingest.store_path.clone()));

    let ingest_shutdown = shutdown_tx.subscribe();
    let upstream_handle = tokio::spawn(async move { ingestor.run(ingest_shutdown).await });

    let mut downstream_handle = tokio::spawn(downstream::run(
        config.socket_addr(),
        reader,
        shutdown_tx.subscribe(),
    ));

    let stop = wait_for_stop(shutdown_signal(), &mut downstream_handle).await;
    if matches!(stop, Stop::WebView(_)) {
        log::error!("Web view stopped, initiating shutdown.");
    }

    let _ = shutdown_tx.send(());

    if let Err(e) = upstream_handle.await {
        log::error!("Polling task ended abnormally: {}", e);
    }
    let web_view = match stop {
        Stop::WebView(result) => result,
        Stop::Signal => downstream_handle.await,
    };

    log::info!("Shutdown complete.");
    match web_view {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            log::error!("Web view failed: {:#}", e);
            Err(e)
        }
        Err(e) => {
            log::error!("Web view task ended abnormally: {}", e);
            Err(e.into())
        }
    }
}

/// Resolves on the first of `signal` or the web view task ending.
async fn wait_for_stop(
    signal: impl Future<Output = ()>,
    web_view: &mut JoinHandle<Result<()>>,
) -> Stop {
    tokio::select! {
        _ = signal => Stop::Signal,
        result = web_view => Stop::WebView(result),
    }
}

async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
    }
}
