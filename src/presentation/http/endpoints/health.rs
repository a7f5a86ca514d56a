use std::sync::Arc;

use futures::future::join_all;
use poem_openapi::{ApiResponse, OpenApi, payload::Json, payload::PlainText};

use crate::{
    application::services::health::HealthProbe,
    presentation::http::{
        endpoints::root::EndpointsTags,
        responses::{ProbeDto, ReadinessDto},
    },
};

#[derive(ApiResponse)]
pub enum ReadinessResponse {
    #[oai(status = 200)]
    Ready(Json<ReadinessDto>),
    #[oai(status = 503)]
    NotReady(Json<ReadinessDto>),
}

#[derive(Clone)]
pub struct HealthEndpoints {
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl HealthEndpoints {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        Self { probes }
    }
}

#[OpenApi]
impl HealthEndpoints {
    #[oai(path = "/health", method = "get", tag = EndpointsTags::Health)]
    pub async fn health(&self) -> PlainText<&'static str> {
        PlainText("OK")
    }

    /// Checks every backing dependency.
    #[oai(path = "/health/ready", method = "get", tag = EndpointsTags::Health)]
    pub async fn ready(&self) -> ReadinessResponse {
        let checks = join_all(self.probes.iter().map(|probe| async move {
            match probe.check().await {
                Ok(()) => ProbeDto {
                    name: probe.name().to_string(),
                    ok: true,
                    error: None,
                },
                Err(err) => ProbeDto {
                    name: probe.name().to_string(),
                    ok: false,
                    error: Some(err.to_string()),
                },
            }
        }))
        .await;

        if checks.iter().all(|check| check.ok) {
            ReadinessResponse::Ready(Json(ReadinessDto {
                status: "ready".to_string(),
                checks,
            }))
        } else {
            tracing::warn!(
                failing = ?checks.iter().filter(|c| !c.ok).map(|c| &c.name).collect::<Vec<_>>(),
                "readiness check failed"
            );
            ReadinessResponse::NotReady(Json(ReadinessDto {
                status: "unavailable".to_string(),
                checks,
            }))
        }
    }
}
