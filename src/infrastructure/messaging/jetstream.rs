use std::sync::Arc;
use std::time::Duration;

use async_nats::{
    connection::State,
    jetstream::{
        self, AckKind,
        consumer::{AckPolicy, PullConsumer, pull},
    },
};
use async_trait::async_trait;
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    application::services::health::HealthProbe,
    presentation::pubsub::{
        dispatch::{InboundMessage, dispatch},
        handlers::MessageHandler,
    },
};

const PULL_EXPIRY: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct JetstreamConfig {
    pub url: String,
    pub stream: String,
    pub subject: String,
    pub durable: String,
    pub pull_batch: usize,
    pub ack_wait_seconds: u64,
    pub max_deliver: i64,
}

/// Durable pull subscription feeding one [`MessageHandler`].
pub struct JetstreamSubscriber {
    client: async_nats::Client,
    consumer: PullConsumer,
    pull_batch: usize,
}

impl JetstreamSubscriber {
    pub async fn connect(config: &JetstreamConfig) -> anyhow::Result<Self> {
        let client = async_nats::connect(&config.url).await?;
        let context = jetstream::new(client.clone());

        let stream = context
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone()],
                ..Default::default()
            })
            .await?;

        let consumer = stream
            .get_or_create_consumer(
                &config.durable,
                pull::Config {
                    durable_name: Some(config.durable.clone()),
                    filter_subject: config.subject.clone(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: Duration::from_secs(config.ack_wait_seconds),
                    max_deliver: config.max_deliver,
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            stream = %config.stream,
            subject = %config.subject,
            durable = %config.durable,
            "jetstream subscription ready"
        );

        Ok(Self {
            client,
            consumer,
            pull_batch: config.pull_batch,
        })
    }

    pub fn probe(&self) -> Arc<dyn HealthProbe> {
        Arc::new(NatsProbe {
            client: self.client.clone(),
        })
    }

    /// Pulls until `shutdown` fires. In-flight handlers then run until they
    /// finish or `abort` fires.
    pub fn spawn(
        self,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
        abort: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run(handler, shutdown, abort).await {
                tracing::error!(error = ?err, "jetstream subscriber stopped");
            }
        })
    }

    async fn run(
        self,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
        abort: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut in_flight = JoinSet::new();

        loop {
            let mut batch = tokio::select! {
                () = shutdown.cancelled() => break,
                batch = self
                    .consumer
                    .batch()
                    .max_messages(self.pull_batch)
                    .expires(PULL_EXPIRY)
                    .messages() => batch?,
            };

            while let Some(message) = tokio::select! {
                () = shutdown.cancelled() => None,
                message = batch.next() => message,
            } {
                match message {
                    Ok(message) => {
                        let handler = handler.clone();
                        let abort = abort.clone();
                        in_flight.spawn(async move {
                            let message = JetstreamMessage(message);
                            if let Err(err) = dispatch(handler.as_ref(), &message, &abort).await {
                                tracing::error!(error = ?err, "failed to settle message");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "jetstream batch error");
                    }
                }
            }

            drain(&mut in_flight).await;
        }

        drain(&mut in_flight).await;
        tracing::info!("jetstream subscriber stopped pulling");
        Ok(())
    }
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while let Some(result) = in_flight.join_next().await {
        if let Err(err) = result {
            tracing::error!(error = %err, "message task failed");
        }
    }
}

struct JetstreamMessage(jetstream::Message);

#[async_trait]
impl InboundMessage for JetstreamMessage {
    fn subject(&self) -> &str {
        self.0.subject.as_str()
    }

    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> anyhow::Result<()> {
        self.0
            .ack()
            .await
            .map_err(|e| anyhow::anyhow!("failed to ack message: {}", e))
    }

    async fn nack(&self) -> anyhow::Result<()> {
        self.0
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| anyhow::anyhow!("failed to nack message: {}", e))
    }
}

struct NatsProbe {
    client: async_nats::Client,
}

#[async_trait]
impl HealthProbe for NatsProbe {
    fn name(&self) -> &'static str {
        "nats"
    }

    async fn check(&self) -> anyhow::Result<()> {
        match self.client.connection_state() {
            State::Connected => Ok(()),
            state => anyhow::bail!("nats connection is {state:?}"),
        }
    }
}
