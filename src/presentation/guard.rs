use std::{any::Any, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a guarded handler produced no output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerFault {
    #[error("handler panicked: {message}")]
    Panicked { message: String },
    /// The process gave up on in-flight work after the shutdown grace period.
    #[error("handler aborted")]
    Aborted,
}

/// Runs one request or message, turning a panic or an abort into a
/// [`HandlerFault`] instead of tearing down the listener.
pub async fn guarded<F>(future: F, abort: &CancellationToken) -> Result<F::Output, HandlerFault>
where
    F: Future,
{
    tokio::select! {
        biased;
        outcome = AssertUnwindSafe(future).catch_unwind() => outcome.map_err(|payload| {
            HandlerFault::Panicked {
                message: panic_message(payload.as_ref()),
            }
        }),
        () = abort.cancelled() => Err(HandlerFault::Aborted),
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
