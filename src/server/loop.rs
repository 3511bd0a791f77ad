// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Accept loop for the story server
///
/// Returns once `shutdown` fires and active connections have finished, or the drain
/// deadline (`write_timeout`) has passed.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.wait() => break,
        }
    }

    // Stop accepting before draining
    drop(listener);

    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(state.config.performance.write_timeout);
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            logger::log_shutdown("All connections closed");
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_shutdown(&format!(
                "Drain deadline reached with {active} connection(s) still open"
            ));
            break;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
