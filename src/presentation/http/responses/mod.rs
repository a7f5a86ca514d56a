use poem_openapi::Object;

use crate::presentation::models::GenderKind;

#[derive(Object, Debug)]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<GenderKind>,
}

#[derive(Object, Debug)]
pub struct CreateUserResponseDto {
    pub message: String,
    pub user: UserDto,
}

#[derive(Object, Debug)]
pub struct FieldViolationDto {
    pub field: String,
    pub message: String,
}

#[derive(Object, Debug)]
pub struct ValidationErrorDto {
    pub message: String,
    pub violations: Vec<FieldViolationDto>,
}

#[derive(Object, Debug)]
pub struct ProbeDto {
    pub name: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Object, Debug)]
pub struct ReadinessDto {
    pub status: String,
    pub checks: Vec<ProbeDto>,
}
