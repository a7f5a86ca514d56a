use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    application::{
        services::{
            health::HealthProbe,
            store::{FieldValue, UserStore, ValidatorStore},
        },
        usecases::create_user::CreateUserRequest,
    },
    domain::{
        errors::StoreError,
        models::{
            User, UserField,
            user::{USER_ENTITY, USER_ENTITY_ID},
        },
    },
};

/// Process-local user store. Emails are not deduplicated here.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<i64, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        let id = match request.id {
            Some(id) if users.contains_key(&id) => {
                return Err(StoreError::AlreadyExists {
                    entity: USER_ENTITY,
                    field: USER_ENTITY_ID,
                });
            }
            Some(id) => id,
            None => match users.keys().max() {
                None => 1,
                Some(max) => max.checked_add(1).ok_or_else(|| {
                    StoreError::Unavailable("user id space exhausted".to_string())
                })?,
            },
        };

        let user = User {
            id,
            email: request.email.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            gender: request.gender,
        };
        users.insert(id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ValidatorStore for InMemoryUserStore {
    async fn unique(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        Ok(!self.exists(entity, field, value).await?)
    }

    async fn exists(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        let field = UserField::resolve(entity, field)?;
        let users = self.users.read().await;
        Ok(users.values().any(|user| match (field, value) {
            (UserField::Id, FieldValue::Int(id)) => user.id == *id,
            (UserField::Email, FieldValue::Text(email)) => user.email.eq_ignore_ascii_case(email),
            _ => false,
        }))
    }
}

#[async_trait]
impl HealthProbe for InMemoryUserStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
