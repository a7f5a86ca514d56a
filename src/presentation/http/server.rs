use std::time::Duration;

use poem::{Endpoint, Server, listener::TcpListener};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;

/// Extra time the listener waits after `abort` fires, letting in-flight
/// requests write their `410` before connections are dropped.
const ABORT_MARGIN: Duration = Duration::from_millis(250);

pub async fn serve<E>(app: E, config: HttpConfig, shutdown: CancellationToken) -> std::io::Result<()>
where
    E: Endpoint + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, "starting http server");

    Server::new(TcpListener::bind(addr))
        .run_with_graceful_shutdown(
            app,
            async move {
                shutdown.cancelled().await;
                tracing::info!("http server shutting down gracefully");
            },
            Some(config.graceful_shutdown + ABORT_MARGIN),
        )
        .await
}

/// Turns a server task that finished before shutdown was requested into the
/// error the process exits with.
pub fn early_exit_error(result: Result<std::io::Result<()>, JoinError>) -> anyhow::Error {
    match result {
        Ok(Ok(())) => anyhow::anyhow!("http server exited before shutdown"),
        Ok(Err(err)) => anyhow::Error::new(err).context("http server failed"),
        Err(err) => anyhow::Error::new(err).context("http server task failed"),
    }
}
