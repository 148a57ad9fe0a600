pub mod error;
pub mod route;
pub mod types;

use crate::scheduler::JobManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::{ApiError, ApiResult};

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<JobManager>,
    pub auth_token: Option<String>,
}

/// Handle for managing the HTTP server lifecycle.
pub struct ServerHandle {
    shutdown_token: CancellationToken,
    task_handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Signal the server to stop accepting connections and wait for
    /// in-flight requests to drain.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        info!("initiating server graceful shutdown");
        self.shutdown_token.cancel();
        self.task_handle.await
    }
}

/// Bind the control API and serve it on a background task.
pub async fn setup_server(
    state: AppState,
    addr: SocketAddr,
) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    info!(%bound, "control api listening");

    let shutdown_token = CancellationToken::new();
    let server_token = shutdown_token.clone();
    let app = route::server_router(state);
    let task_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_token.cancelled_owned())
            .await
            .expect("control api server failed");
    });

    Ok((bound, ServerHandle { shutdown_token, task_handle }))
}
