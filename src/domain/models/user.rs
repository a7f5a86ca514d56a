use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::errors::StoreError;

pub const USER_ENTITY: &str = "users";
pub const USER_ENTITY_ID: &str = "id";
pub const USER_ENTITY_EMAIL: &str = "email";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown gender `{0}`, expected `male` or `female`")]
pub struct UnknownGender(pub String);

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(UnknownGender(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Columns of the `users` entity that lookups by name may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Id,
    Email,
}

impl UserField {
    pub fn resolve(entity: &str, field: &str) -> Result<Self, StoreError> {
        match (entity, field) {
            (USER_ENTITY, USER_ENTITY_ID) => Ok(UserField::Id),
            (USER_ENTITY, USER_ENTITY_EMAIL) => Ok(UserField::Email),
            _ => Err(StoreError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
        }
    }
}
