use std::sync::Arc;

use tokio::main;
use tokio_util::sync::CancellationToken;

use crate::{
    application::usecases::create_user::UserController,
    config::Config,
    infrastructure::{messaging::jetstream::JetstreamSubscriber, repositories::Stores},
    presentation::{
        http::{
            endpoints::root::ApiState,
            routes,
            server::{early_exit_error, serve},
        },
        pubsub::handlers::CreateUserMessageHandler,
    },
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod logging;
mod presentation;
mod signals;

#[main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_parse()?;
    logging::init(&config)?;
    logging::install_panic_hook();

    let stores = Stores::connect(config.database.as_ref()).await?;
    let controller = Arc::new(UserController::new(stores.users));
    let mut probes = vec![stores.probe];

    // `shutdown` stops the listeners; `abort` ends whatever is still in flight
    // once the grace period is over.
    let shutdown = CancellationToken::new();
    let abort = CancellationToken::new();

    let subscriber = match &config.nats {
        Some(nats) => {
            let subscriber = JetstreamSubscriber::connect(nats).await?;
            probes.push(subscriber.probe());
            let handler = Arc::new(CreateUserMessageHandler::new(
                controller.clone(),
                stores.validator.clone(),
            ));
            Some(subscriber.spawn(handler, shutdown.clone(), abort.clone()))
        }
        None => {
            tracing::warn!("NATS_URL is not set, identity subscription disabled");
            None
        }
    };

    let state = Arc::new(ApiState {
        controller,
        validator_store: stores.validator,
    });
    let app = routes(state, probes, abort.clone(), config.http.request_timeout);
    let mut server = tokio::spawn(serve(app, config.http.clone(), shutdown.clone()));

    let early_exit = tokio::select! {
        signal = signals::wait_for_shutdown() => {
            signal?;
            tracing::info!("shutdown signal received");
            None
        }
        result = &mut server => Some(early_exit_error(result)),
    };

    shutdown.cancel();
    let grace = config.http.graceful_shutdown;
    tokio::spawn({
        let abort = abort.clone();
        async move {
            tokio::time::sleep(grace).await;
            abort.cancel();
        }
    });

    if early_exit.is_none() {
        match server.await {
            Ok(Err(err)) => tracing::error!(error = %err, "server shutdown"),
            Err(err) => tracing::error!(error = %err, "server task failed"),
            Ok(Ok(())) => {}
        }
    }
    if let Some(subscriber) = subscriber {
        if let Err(err) = subscriber.await {
            tracing::error!(error = %err, "subscriber task failed");
        }
    }

    if let Some(err) = early_exit {
        return Err(err);
    }

    tracing::info!("bye bye");
    Ok(())
}
