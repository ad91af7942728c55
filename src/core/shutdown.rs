//! OS shutdown signals for [`Supervisor::serve`](crate::Supervisor::serve).
//!
//! On unix the first of `SIGINT`, `SIGTERM` or `SIGQUIT` ends the wait.
//! Elsewhere only Ctrl-C is observed. Listeners are registered on first poll,
//! so a signal delivered before that is handled by the default disposition.

use std::io;

/// Name of the signal that ended [`wait_for_shutdown_signal`].
pub(crate) type SignalName = &'static str;

/// Completes with the name of the first shutdown signal received.
///
/// Fails only if a listener cannot be registered.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<SignalName> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    })
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<SignalName> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_waits_until_a_signal_arrives() {
        let wait = wait_for_shutdown_signal();
        tokio::pin!(wait);
        assert!((&mut wait).now_or_never().is_none());
    }
}
