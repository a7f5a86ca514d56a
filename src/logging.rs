use std::backtrace::Backtrace;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Config, LogFormat},
    presentation::guard::panic_message,
};

pub fn init(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
    }

    tracing::info!(app = %config.app_name, env = %config.env, "logger initialised");
    Ok(())
}

/// Routes panics through `tracing` with the stack that raised them.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::error!(
            panic = %panic_message(info.payload()),
            location = %location,
            stacktrace = %Backtrace::force_capture(),
            "panic"
        );
    }));
}
