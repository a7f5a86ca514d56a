use std::sync::Arc;

use crate::{
    application::services::{
        health::HealthProbe,
        store::{UserStore, ValidatorStore},
    },
    config::DatabaseConfig,
};

pub mod in_memory;
pub mod postgres;

/// One storage adapter seen through every contract the service needs from it.
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub validator: Arc<dyn ValidatorStore>,
    pub probe: Arc<dyn HealthProbe>,
}

impl Stores {
    pub async fn connect(database: Option<&DatabaseConfig>) -> anyhow::Result<Self> {
        match database {
            Some(database) => {
                let store = postgres::PostgresUserStore::connect(database).await?;
                tracing::info!("using postgres user store");
                Ok(Self {
                    users: store.clone(),
                    validator: store.clone(),
                    probe: store,
                })
            }
            None => {
                tracing::warn!("DATABASE_URL is not set, users are kept in memory");
                let store = Arc::new(in_memory::InMemoryUserStore::new());
                Ok(Self {
                    users: store.clone(),
                    validator: store.clone(),
                    probe: store,
                })
            }
        }
    }
}
