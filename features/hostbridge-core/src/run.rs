//! Run-to-completion helpers for a [Host].

use std::time::Duration;

use crate::{cancel::CancellationToken, errors::HostBridgeError, host::Host};

/// Starts the host, waits for `token`, then stops and disposes it.
///
/// The stop is bounded by `shutdown_timeout` through cancellation only: a service that
/// ignores its token can take longer. Stop and dispose also run when the start fails,
/// the start failure is returned in that case.
pub async fn run(
    host: &dyn Host,
    token: CancellationToken,
    shutdown_timeout: Option<Duration>,
) -> Result<(), HostBridgeError> {
    let started = host.start(&token).await;
    match &started {
        Ok(()) => token.cancelled().await,
        Err(e) => tracing::error!("Host failed to start: {}", e),
    }

    let stopped = stop_and_dispose(host, shutdown_timeout).await;
    started.and(stopped)
}

/// Like [run], cancelled by Ctrl-C or a termination signal
pub async fn run_console(
    host: &dyn Host,
    shutdown_timeout: Option<Duration>,
) -> Result<(), HostBridgeError> {
    let mut signals = ShutdownSignals::install()?;
    let token = CancellationToken::new();

    let trigger = token.clone();
    let hooks = tokio::spawn(async move {
        let signal = signals.recv().await;
        tracing::info!("Received {}, shutting down", signal);
        trigger.cancel();
    });

    let result = run(host, token, shutdown_timeout).await;
    hooks.abort();
    result
}

async fn stop_and_dispose(
    host: &dyn Host,
    timeout: Option<Duration>,
) -> Result<(), HostBridgeError> {
    let token = match timeout {
        Some(timeout) if !timeout.is_zero() => CancellationToken::new().with_timeout(timeout),
        _ => CancellationToken::new(),
    };

    let stopped = host.stop(&token).await;
    host.dispose();
    stopped
}

struct ShutdownSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(ShutdownSignals {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "interrupt",
                _ = self.terminate.recv() => "terminate",
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            "interrupt"
        }
    }
}
