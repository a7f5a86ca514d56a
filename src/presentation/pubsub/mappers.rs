use crate::{
    application::usecases::create_user::CreateUserRequest,
    domain::{errors::BindError, events::IdentityCreatedEvent, models::Gender},
};

impl TryFrom<IdentityCreatedEvent> for CreateUserRequest {
    type Error = BindError;

    fn try_from(event: IdentityCreatedEvent) -> Result<Self, Self::Error> {
        let id = identity_number(&event.user_id)?;
        let email = event
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| BindError::new("email", "identity carries no email"))?;
        let gender = event
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|err| BindError::new("gender", err.to_string()))?;

        Ok(CreateUserRequest {
            id: Some(id),
            email,
            first_name: event.given_name.unwrap_or_default(),
            last_name: event.family_name.unwrap_or_default(),
            gender,
        })
    }
}

/// Identity ids look like `42` or `provider|42`.
fn identity_number(user_id: &str) -> Result<i64, BindError> {
    let digits = user_id.rsplit_once('|').map_or(user_id, |(_, tail)| tail);
    digits
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            BindError::new(
                "user_id",
                format!("`{user_id}` does not carry a numeric identity"),
            )
        })
}
