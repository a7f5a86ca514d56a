use std::sync::Arc;

use poem::http::StatusCode;

use crate::{
    application::services::store::UserStore,
    domain::{
        errors::StoreError,
        models::{Gender, User},
    },
};

/// Transport-agnostic input of the create-user use case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub id: Option<i64>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
}

#[derive(Debug)]
pub struct CreateUserResponse {
    pub message: String,
    pub user: Option<User>,
    pub error: Option<StoreError>,
    pub status_code: StatusCode,
}

pub struct UserController {
    store: Arc<dyn UserStore>,
}

impl UserController {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Persists an already validated request.
    pub async fn create_user(&self, request: &CreateUserRequest) -> CreateUserResponse {
        match self.store.create_user(request).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, name = %user.full_name(), "user created");
                CreateUserResponse {
                    message: "user created!".to_string(),
                    user: Some(user),
                    error: None,
                    status_code: StatusCode::CREATED,
                }
            }
            Err(err) => {
                let status_code = store_error_status(&err);
                tracing::error!(error = %err, status = status_code.as_u16(), "user creation failed");
                CreateUserResponse {
                    message: "user creation failed".to_string(),
                    user: None,
                    error: Some(err),
                    status_code,
                }
            }
        }
    }
}

pub fn store_error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::UnknownField { .. } | StoreError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
