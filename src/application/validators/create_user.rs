use thiserror::Error;

use crate::{
    application::{
        services::store::{FieldValue, ValidatorStore},
        usecases::create_user::CreateUserRequest,
    },
    domain::{
        errors::{CreateUserError, FieldViolation, StoreError, ValidationError},
        models::user::{USER_ENTITY, USER_ENTITY_EMAIL, USER_ENTITY_ID},
    },
};

const EMAIL_MAX: usize = 254;
const NAME_MAX: usize = 100;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidateError> for CreateUserError {
    fn from(err: ValidateError) -> Self {
        match err {
            ValidateError::Invalid(err) => CreateUserError::Validation(err),
            ValidateError::Store(err) => CreateUserError::Store(err),
        }
    }
}

/// Checks a create-user request, collecting every violated rule.
///
/// Field-level rules run first; the store is consulted for a field only once
/// that field is well formed.
pub async fn validate_create_user(
    request: &CreateUserRequest,
    store: &dyn ValidatorStore,
) -> Result<(), ValidateError> {
    let mut violations = Vec::new();

    match email_problem(&request.email) {
        Some(message) => violations.push(FieldViolation::new(USER_ENTITY_EMAIL, message)),
        None => {
            let email = FieldValue::from(request.email.as_str());
            if !store.unique(USER_ENTITY, USER_ENTITY_EMAIL, &email).await? {
                violations.push(FieldViolation::new(
                    USER_ENTITY_EMAIL,
                    "email is already taken",
                ));
            }
        }
    }

    if request.first_name.trim().is_empty() {
        violations.push(FieldViolation::new("first_name", "first name is required"));
    } else if request.first_name.chars().count() > NAME_MAX {
        violations.push(FieldViolation::new(
            "first_name",
            format!("first name must be at most {NAME_MAX} characters"),
        ));
    }

    if request.last_name.chars().count() > NAME_MAX {
        violations.push(FieldViolation::new(
            "last_name",
            format!("last name must be at most {NAME_MAX} characters"),
        ));
    }

    if let Some(id) = request.id {
        if id <= 0 {
            violations.push(FieldViolation::new(USER_ENTITY_ID, "id must be positive"));
        } else if store
            .exists(USER_ENTITY, USER_ENTITY_ID, &FieldValue::Int(id))
            .await?
        {
            violations.push(FieldViolation::new(
                USER_ENTITY_ID,
                "a user with this id already exists",
            ));
        }
    }

    ValidationError::check(violations)?;
    Ok(())
}

fn email_problem(email: &str) -> Option<String> {
    if email.trim().is_empty() {
        return Some("email is required".to_string());
    }
    if email.chars().count() > EMAIL_MAX {
        return Some(format!("email must be at most {EMAIL_MAX} characters"));
    }
    if email.chars().any(char::is_whitespace) {
        return Some("email must not contain whitespace".to_string());
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && is_domain(domain) => None,
        _ => Some("email must be a valid address".to_string()),
    }
}

fn is_domain(domain: &str) -> bool {
    domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::store::MockValidatorStore;

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            id: None,
            email: "linus@example.org".to_string(),
            first_name: "Linus".to_string(),
            last_name: "Torvalds".to_string(),
            gender: None,
        }
    }

    fn permissive_store() -> MockValidatorStore {
        let mut store = MockValidatorStore::new();
        store.expect_unique().returning(|_, _, _| Ok(true));
        store.expect_exists().returning(|_, _, _| Ok(false));
        store
    }

    fn violated_fields(err: ValidateError) -> Vec<&'static str> {
        match err {
            ValidateError::Invalid(err) => err.violations().iter().map(|v| v.field).collect(),
            ValidateError::Store(err) => panic!("unexpected store error: {err}"),
        }
    }

    #[tokio::test]
    async fn accepts_well_formed_request() {
        let mut store = MockValidatorStore::new();
        store
            .expect_unique()
            .withf(|entity, field, value| {
                entity == "users"
                    && field == "email"
                    && matches!(value, FieldValue::Text(email) if email == "linus@example.org")
            })
            .times(1)
            .returning(|_, _, _| Ok(true));
        store.expect_exists().never();

        assert!(validate_create_user(&request(), &store).await.is_ok());
    }

    #[tokio::test]
    async fn collects_all_field_violations_without_store_lookups() {
        let mut store = MockValidatorStore::new();
        store.expect_unique().never();
        store.expect_exists().never();

        let request = CreateUserRequest {
            id: Some(0),
            email: "not-an-email".to_string(),
            first_name: "  ".to_string(),
            last_name: "x".repeat(NAME_MAX + 1),
            gender: None,
        };

        let err = validate_create_user(&request, &store).await.unwrap_err();
        assert_eq!(
            violated_fields(err),
            vec!["email", "first_name", "last_name", "id"]
        );
    }

    #[tokio::test]
    async fn rejects_malformed_emails() {
        let store = permissive_store();
        for email in [
            "",
            "@example.com",
            "a@b",
            "a@@example.com",
            "a@example..com",
            "a @example.com",
            "a@.example.com",
        ] {
            let request = CreateUserRequest {
                email: email.to_string(),
                ..request()
            };
            let err = validate_create_user(&request, &store).await.unwrap_err();
            assert_eq!(violated_fields(err), vec!["email"], "email {email:?}");
        }
    }

    #[tokio::test]
    async fn rejects_taken_email_and_existing_id() {
        let mut store = MockValidatorStore::new();
        store.expect_unique().times(1).returning(|_, _, _| Ok(false));
        store
            .expect_exists()
            .withf(|entity, field, value| {
                entity == "users" && field == "id" && matches!(value, FieldValue::Int(42))
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let request = CreateUserRequest {
            id: Some(42),
            ..request()
        };

        let err = validate_create_user(&request, &store).await.unwrap_err();
        assert_eq!(violated_fields(err), vec!["email", "id"]);
    }

    #[tokio::test]
    async fn surfaces_store_failures() {
        let mut store = MockValidatorStore::new();
        store
            .expect_unique()
            .returning(|_, _, _| Err(StoreError::Unavailable("connection refused".to_string())));

        let err = validate_create_user(&request(), &store).await.unwrap_err();
        assert!(matches!(err, ValidateError::Store(StoreError::Unavailable(_))));
        assert!(matches!(
            CreateUserError::from(err),
            CreateUserError::Store(_)
        ));
    }
}
