use crate::error::RuntimeError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, warn, Instrument};

/// Cancels `token` on SIGINT or SIGTERM.
pub(crate) fn spawn_stop_listener(token: CancellationToken) -> Result<(), RuntimeError> {
    let stop = stop_signal()?;
    tokio::spawn(
        async move {
            if stop.await {
                warn!("Stop requested; finishing the current batch round and saving state");
                token.cancel();
            }
        }
        .in_current_span(),
    );
    Ok(())
}

/// Resolves to `true` once a stop signal arrives, `false` if signals cannot be observed.
#[cfg(unix)]
fn stop_signal() -> Result<impl Future<Output = bool> + Send, RuntimeError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).map_err(RuntimeError::Signal)?;
    Ok(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => true,
                Err(err) => {
                    error!("Unable to listen for Ctrl+C: {err}");
                    false
                }
            },
            _ = terminate.recv() => true,
        }
    })
}

#[cfg(not(unix))]
fn stop_signal() -> Result<impl Future<Output = bool> + Send, RuntimeError> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => true,
            Err(err) => {
                error!("Unable to listen for Ctrl+C: {err}");
                false
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn sigterm_cancels_token() {
        let token = CancellationToken::new();
        spawn_stop_listener(token.clone()).unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("SIGTERM did not cancel the token");
        assert!(token.is_cancelled());
    }
}
