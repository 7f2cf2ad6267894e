//! Listener setup and graceful serving of the survey router.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{router, AppState};
use crate::{AppError, Result};

/// Bind a TCP listener on `addr`.
///
/// # Errors
///
/// Returns `AppError::Http` if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {addr}: {err}")))
}

/// Serve the survey API on `listener` until `ct` is cancelled.
///
/// Peer addresses are exposed to handlers through `ConnectInfo`.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails while running.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Http(format!("listener has no local address: {err}")))?;
    info!(%local, "starting survey HTTP server");

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))?;

    info!("survey HTTP server shut down");
    Ok(())
}
