use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Cancel the returned token on SIGTERM or SIGINT.
///
/// The rotation loop and the HTTP surface watch the token; in-flight
/// invitation watchers are dropped with the runtime.
pub fn install_shutdown_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping rotation");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping rotation");
            }
        }
        cancel.cancel();
    });

    Ok(token)
}
