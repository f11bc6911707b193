use tokio::sync::watch;
use tracing::{error, info};

pub async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT"
    };
    info!("Received signal ({signal}) - shutting down gracefully.");
    Ok(())
}

/// Receiver that flips to `true` on SIGINT/SIGTERM. Polling and simulator
/// loops watch it and drop their timers when it does.
pub fn shutdown_on_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = wait_for_signal().await {
            error!("Unable to register shutdown handler: {}", err);
            // keep the sender alive so watchers do not read a closed channel as shutdown
            std::future::pending::<()>().await;
        }
        let _ = tx.send(true);
    });
    rx
}
