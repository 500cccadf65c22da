use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Detects signals sent to the process and turns them into a cancellation. Returns early when the
/// token gets cancelled by someone else, e.g. the session ending on its own.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = termination_requested() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}

/// Completes on Ctrl-C. On unix a terminate request or the terminal hanging up count as well.
async fn termination_requested() {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut terminate, mut hangup) =
                match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                    (Ok(terminate), Ok(hangup)) => (terminate, hangup),
                    (terminate, hangup) => {
                        error!(
                            "Failed to listen for SIGTERM/SIGHUP, only Ctrl-C is handled {:?} {:?}",
                            terminate.err(),
                            hangup.err()
                        );
                        wait_for_ctrl_c().await;
                        return;
                    }
                };

            select! {
                _ = wait_for_ctrl_c() => (),
                _ = terminate.recv() => info!("Received SIGTERM"),
                _ = hangup.recv() => info!("Received SIGHUP"),
            }
        } else {
            wait_for_ctrl_c().await;
        }
    }
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            // Without a handler there is nothing to wait for, the session still ends on its own.
            error!("Failed to listen for Ctrl-C {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::detect_shutdown;

    #[tokio::test]
    async fn returns_after_external_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        detect_shutdown(token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_signal_cancels() -> anyhow::Result<()> {
        let token = CancellationToken::new();
        let handle = tokio::spawn(detect_shutdown(token.clone()));
        // Let the detector register its handlers before the signal arrives.
        tokio::task::yield_now().await;

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()?;
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), handle).await??;
        assert!(token.is_cancelled());
        Ok(())
    }
}
