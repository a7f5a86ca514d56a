use std::{sync::Arc, time::Duration};

use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::OpenApiService;
use tokio_util::sync::CancellationToken;

use crate::{
    application::services::health::HealthProbe,
    presentation::http::{
        endpoints::{health::HealthEndpoints, root::ApiState, users::UserEndpoints},
        middleware::Recoverer,
    },
};

pub mod endpoints;
pub mod mappers;
pub mod middleware;
pub mod requests;
pub mod responses;
pub mod server;

pub fn routes(
    state: Arc<ApiState>,
    probes: Vec<Arc<dyn HealthProbe>>,
    abort: CancellationToken,
    request_timeout: Duration,
) -> impl Endpoint {
    let api_service = OpenApiService::new(
        (HealthEndpoints::new(probes), UserEndpoints::new(state)),
        "User Service API",
        env!("CARGO_PKG_VERSION"),
    );
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/docs", ui)
        .nest("/", api_service)
        .with(Recoverer::new(abort, request_timeout))
}
