use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Published by the identity provider once an account has been registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCreatedEvent {
    pub user_id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub gender: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
