use std::time::{Duration, Instant};

use poem::{
    Endpoint, IntoResponse, Middleware, Request, Response, Result, http::StatusCode,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::presentation::guard::{HandlerFault, guarded};

/// Runs every request inside the guarded scope with an upper time bound.
///
/// Panics become `500`, aborted requests `410` and requests running past the
/// timeout `503`.
pub struct Recoverer {
    abort: CancellationToken,
    timeout: Duration,
}

impl Recoverer {
    pub fn new(abort: CancellationToken, timeout: Duration) -> Self {
        Self { abort, timeout }
    }
}

impl<E: Endpoint> Middleware<E> for Recoverer {
    type Output = RecovererEndpoint<E>;

    fn transform(&self, inner: E) -> Self::Output {
        RecovererEndpoint {
            inner,
            abort: self.abort.clone(),
            timeout: self.timeout,
        }
    }
}

pub struct RecovererEndpoint<E> {
    inner: E,
    abort: CancellationToken,
    timeout: Duration,
}

impl<E: Endpoint> Endpoint for RecovererEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let call = tokio::time::timeout(self.timeout, self.inner.call(req));
        let response = match guarded(call, &self.abort).await {
            Ok(Ok(Ok(output))) => output.into_response(),
            Ok(Ok(Err(err))) => err.into_response(),
            Ok(Err(_elapsed)) => {
                tracing::warn!(%request_id, %method, path = %path, "request timed out");
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
            // the panic hook has already logged the payload and backtrace
            Err(HandlerFault::Panicked { .. }) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Err(HandlerFault::Aborted) => StatusCode::GONE.into_response(),
        };

        tracing::info!(
            %request_id,
            %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request served"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use poem::{EndpointExt, Route, get, handler, test::TestClient};
    use tracing_test::traced_test;

    use super::*;

    #[handler]
    async fn fine() -> &'static str {
        "fine"
    }

    #[handler]
    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[handler]
    async fn stall() -> &'static str {
        std::future::pending::<()>().await;
        "never"
    }

    fn client(abort: CancellationToken, timeout: Duration) -> TestClient<impl Endpoint> {
        let app = Route::new()
            .at("/fine", get(fine))
            .at("/explode", get(explode))
            .at("/stall", get(stall))
            .with(Recoverer::new(abort, timeout));
        TestClient::new(app)
    }

    #[tokio::test]
    async fn passes_responses_through() {
        let client = client(CancellationToken::new(), Duration::from_secs(1));

        let response = client.get("/fine").send().await;
        response.assert_status_is_ok();
        response.assert_text("fine").await;

        client
            .get("/missing")
            .send()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn recovers_from_panics() {
        let client = client(CancellationToken::new(), Duration::from_secs(1));

        client
            .get("/explode")
            .send()
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        client.get("/fine").send().await.assert_status_is_ok();
    }

    #[traced_test]
    #[tokio::test]
    async fn panics_are_left_to_the_panic_hook() {
        let client = client(CancellationToken::new(), Duration::from_secs(1));

        client
            .get("/explode")
            .send()
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert!(logs_contain("status=500"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("ERROR")).count() {
                0 => Ok(()),
                n => Err(format!("expected no error lines, got {n}")),
            }
        });
    }

    #[tokio::test]
    async fn times_out_slow_requests() {
        let client = client(CancellationToken::new(), Duration::from_millis(20));

        client
            .get("/stall")
            .send()
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn aborted_requests_are_gone() {
        let abort = CancellationToken::new();
        abort.cancel();
        let client = client(abort, Duration::from_secs(5));

        client
            .get("/stall")
            .send()
            .await
            .assert_status(StatusCode::GONE);
    }
}
