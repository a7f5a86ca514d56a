use async_trait::async_trait;

/// A dependency reported on by the readiness endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self) -> anyhow::Result<()>;
}
