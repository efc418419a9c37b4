//! Readiness probe for a freshly spawned worker.
//!
//! After spawn the worker needs a moment to bind its listen target. The probe
//! dials that target every `poll_interval` until a connection succeeds, while
//! a `timeout` timer races it:
//! - The poll loop runs as its own task and reports success exactly once
//!   through a [`oneshot`] channel.
//! - If the timer fires first the loop is cancelled through a
//!   [`CancellationToken`] and awaited, so no poll task outlives the call.

use std::io;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fpm::address::{ListenAddress, Network};
use crate::{AppError, Result};

/// Default delay between failed connection attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Default ceiling for the worker to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(4);

/// Timing of the readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessTiming {
    /// Sleep after each failed attempt.
    pub poll_interval: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for ReadinessTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Wait until `address` accepts a connection.
///
/// The trial connection is closed as soon as it is established.
///
/// # Errors
///
/// Returns `AppError::Timeout` if no connection succeeds within
/// `timing.timeout`.
pub async fn wait_ready(address: &ListenAddress, timing: ReadinessTiming) -> Result<()> {
    let started = Instant::now();
    let cancel = CancellationToken::new();
    let (ready_tx, ready_rx) = oneshot::channel();

    let poller = tokio::spawn(poll_until_connected(
        address.clone(),
        timing.poll_interval,
        cancel.clone(),
        ready_tx,
    ));

    tokio::select! {
        result = ready_rx => {
            if result.is_ok() {
                info!(
                    %address,
                    elapsed_ms = elapsed_ms(started),
                    "worker accepting connections"
                );
                return Ok(());
            }
            // The sender is only dropped unsent if the poller was cancelled
            // or panicked; both mean readiness was never observed.
            warn!(%address, "readiness poller stopped without a result");
        }
        () = tokio::time::sleep(timing.timeout) => {
            cancel.cancel();
        }
    }

    if let Err(err) = poller.await {
        warn!(%err, "readiness poller task failed");
    }

    Err(AppError::Timeout(format!(
        "{address} not accepting connections within {:?}",
        timing.timeout
    )))
}

/// Dial `address` until it answers or `cancel` fires.
async fn poll_until_connected(
    address: ListenAddress,
    poll_interval: Duration,
    cancel: CancellationToken,
    ready_tx: oneshot::Sender<()>,
) {
    let target = address.dial_target();
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;

        let attempt = tokio::select! {
            () = cancel.cancelled() => break,
            attempt = connect(address.network, &target) => attempt,
        };

        match attempt {
            Ok(()) => {
                debug!(%address, attempts, "readiness probe connected");
                // The receiver is gone only if the timer already won.
                let _ = ready_tx.send(());
                return;
            }
            Err(err) => {
                debug!(%address, attempts, %err, "readiness probe attempt failed");
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(poll_interval) => {}
        }
    }

    debug!(%address, attempts, "readiness probe cancelled");
}

/// Open and immediately close one connection.
async fn connect(network: Network, target: &str) -> io::Result<()> {
    match network {
        Network::Tcp => {
            let stream = tokio::net::TcpStream::connect(target).await?;
            drop(stream);
            Ok(())
        }
        Network::Unix => connect_unix(target).await,
    }
}

#[cfg(unix)]
async fn connect_unix(path: &str) -> io::Result<()> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    drop(stream);
    Ok(())
}

#[cfg(not(unix))]
async fn connect_unix(_path: &str) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unix sockets are not supported on this platform",
    ))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
