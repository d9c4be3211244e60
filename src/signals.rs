/// Signal handling for operator shutdown.
///
/// First SIGINT (Ctrl-C) or SIGTERM: cancel the shutdown token so the
/// supervisor stops its current child and returns.
/// Second signal: exit immediately without waiting for the child. Destructors
/// do not run on this path, so a child that ignored SIGTERM is left running.
use tokio_util::sync::CancellationToken;

/// Install the handlers on a background task.
pub fn shutdown_on_signal(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = wait_for_signal().await {
            tracing::warn!(error = %err, "failed to install signal handler");
            return;
        }
        tracing::info!("signal received, stopping (signal again to force)");
        shutdown.cancel();

        if wait_for_signal().await.is_ok() {
            tracing::warn!("second signal, exiting now");
            std::process::exit(130);
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
