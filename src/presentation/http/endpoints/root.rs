use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::{services::store::ValidatorStore, usecases::create_user::UserController};

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<UserController>,
    pub validator_store: Arc<dyn ValidatorStore>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Users,
}
