use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::presentation::{
    guard::{HandlerFault, guarded},
    pubsub::handlers::{MessageHandler, Outcome},
};

/// A delivered message awaiting a verdict.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    fn subject(&self) -> &str;
    fn payload(&self) -> &[u8];
    async fn ack(&self) -> anyhow::Result<()>;
    async fn nack(&self) -> anyhow::Result<()>;
}

/// Runs `handler` over one message and settles it with the broker.
///
/// Successes and undecodable payloads are acknowledged. Handler errors,
/// panics and aborts are negatively acknowledged so the broker redelivers.
pub async fn dispatch(
    handler: &dyn MessageHandler,
    message: &dyn InboundMessage,
    abort: &CancellationToken,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let subject = message.subject();

    let ack = match guarded(handler.handle(message.payload()), abort).await {
        Ok(outcome) => {
            match &outcome {
                Outcome::Ack => {}
                Outcome::Drop { reason } => {
                    tracing::warn!(subject, reason = %reason, "dropping undecodable message");
                }
                Outcome::Nack(err) => {
                    tracing::error!(
                        subject,
                        error = %err,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        ack = false,
                        "pubsub consumer handler error"
                    );
                }
            }
            outcome.acknowledges()
        }
        Err(HandlerFault::Panicked { .. }) => {
            tracing::warn!(subject, "handler panicked, message will be redelivered");
            false
        }
        Err(HandlerFault::Aborted) => false,
    };

    if ack {
        message.ack().await
    } else {
        message.nack().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tracing_test::traced_test;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Settled {
        Acked,
        Nacked,
    }

    struct FakeMessage {
        payload: Vec<u8>,
        settled: Mutex<Vec<Settled>>,
    }

    impl FakeMessage {
        fn new(payload: &[u8]) -> Self {
            Self {
                payload: payload.to_vec(),
                settled: Mutex::new(Vec::new()),
            }
        }

        fn settled(&self) -> Vec<Settled> {
            self.settled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InboundMessage for FakeMessage {
        fn subject(&self) -> &str {
            "identity.created"
        }

        fn payload(&self) -> &[u8] {
            &self.payload
        }

        async fn ack(&self) -> anyhow::Result<()> {
            self.settled.lock().unwrap().push(Settled::Acked);
            Ok(())
        }

        async fn nack(&self) -> anyhow::Result<()> {
            self.settled.lock().unwrap().push(Settled::Nacked);
            Ok(())
        }
    }

    enum Scripted {
        Ack,
        Drop,
        Nack,
        Panic,
        Stall,
    }

    #[async_trait]
    impl MessageHandler for Scripted {
        async fn handle(&self, _payload: &[u8]) -> Outcome {
            match self {
                Scripted::Ack => Outcome::Ack,
                Scripted::Drop => Outcome::Drop {
                    reason: "expected value at line 1".to_string(),
                },
                Scripted::Nack => Outcome::Nack(
                    crate::domain::errors::BindError::new("email", "missing").into(),
                ),
                Scripted::Panic => panic!("handler blew up"),
                Scripted::Stall => {
                    std::future::pending::<()>().await;
                    Outcome::Ack
                }
            }
        }
    }

    async fn settle(handler: Scripted, abort: &CancellationToken) -> Vec<Settled> {
        let message = FakeMessage::new(b"{}");
        dispatch(&handler, &message, abort).await.unwrap();
        message.settled()
    }

    #[tokio::test]
    async fn acks_processed_and_dropped_messages() {
        let abort = CancellationToken::new();
        assert_eq!(settle(Scripted::Ack, &abort).await, vec![Settled::Acked]);
        assert_eq!(settle(Scripted::Drop, &abort).await, vec![Settled::Acked]);
    }

    #[tokio::test]
    async fn nacks_failures_and_panics() {
        let abort = CancellationToken::new();
        assert_eq!(settle(Scripted::Nack, &abort).await, vec![Settled::Nacked]);
        assert_eq!(settle(Scripted::Panic, &abort).await, vec![Settled::Nacked]);
    }

    #[traced_test]
    #[tokio::test]
    async fn panics_are_nacked_without_an_error_line() {
        let abort = CancellationToken::new();
        assert_eq!(settle(Scripted::Panic, &abort).await, vec![Settled::Nacked]);

        assert!(logs_contain("message will be redelivered"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("ERROR")).count() {
                0 => Ok(()),
                n => Err(format!("expected no error lines, got {n}")),
            }
        });
    }

    #[tokio::test]
    async fn nacks_aborted_messages() {
        let abort = CancellationToken::new();
        abort.cancel();
        assert_eq!(settle(Scripted::Stall, &abort).await, vec![Settled::Nacked]);
    }
}
