use async_trait::async_trait;

use crate::{
    application::usecases::create_user::CreateUserRequest,
    domain::{errors::StoreError, models::User},
};

/// A value looked up by [`ValidatorStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, StoreError>;
}

/// Read-only lookups the validator runs against persisted entities.
///
/// `entity` and `field` are entity/column names such as `users` and `email`.
/// Implementations reject names they do not know with
/// [`StoreError::UnknownField`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidatorStore: Send + Sync {
    /// `true` when no `entity` row has `field == value`.
    async fn unique(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError>;

    /// `true` when at least one `entity` row has `field == value`.
    async fn exists(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError>;
}
