use crate::{
    application::usecases::create_user::CreateUserRequest,
    domain::{
        errors::{BindError, ValidationError},
        models::{Gender, User},
    },
    presentation::http::{
        requests::CreateUserRequestDto,
        responses::{FieldViolationDto, UserDto, ValidationErrorDto},
    },
};

impl TryFrom<CreateUserRequestDto> for CreateUserRequest {
    type Error = BindError;

    fn try_from(dto: CreateUserRequestDto) -> Result<Self, Self::Error> {
        let gender = dto
            .gender
            .as_deref()
            .filter(|gender| !gender.trim().is_empty())
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|err| BindError::new("gender", err.to_string()))?;

        Ok(CreateUserRequest {
            id: dto.id,
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            gender,
        })
    }
}

pub fn map_user(user: &User) -> UserDto {
    UserDto {
        id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        gender: user.gender.map(Into::into),
    }
}

pub fn map_validation_error(err: &ValidationError) -> ValidationErrorDto {
    ValidationErrorDto {
        message: "validation failed".to_string(),
        violations: err
            .violations()
            .iter()
            .map(|violation| FieldViolationDto {
                field: violation.field.to_string(),
                message: violation.message.clone(),
            })
            .collect(),
    }
}
