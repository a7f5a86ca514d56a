use std::sync::Arc;

use poem::{Error as PoemError, Result as PoemResult, http::StatusCode};
use poem_openapi::{
    ApiResponse, OpenApi,
    payload::{Json, PlainText},
};

use crate::{
    application::{
        usecases::create_user::{CreateUserRequest, store_error_status},
        validators::create_user::{ValidateError, validate_create_user},
    },
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_user, map_validation_error},
        requests::CreateUserRequestDto,
        responses::{CreateUserResponseDto, ValidationErrorDto},
    },
};

#[derive(ApiResponse)]
#[oai(bad_request_handler = "bad_request")]
pub enum CreateUserApiResponse {
    #[oai(status = 201)]
    Created(Json<CreateUserResponseDto>),
    #[oai(status = 400)]
    BadRequest(PlainText<String>),
    #[oai(status = 422)]
    Unprocessable(Json<ValidationErrorDto>),
}

fn bad_request(err: PoemError) -> CreateUserApiResponse {
    CreateUserApiResponse::BadRequest(PlainText(err.to_string()))
}

#[derive(Clone)]
pub struct UserEndpoints {
    state: Arc<ApiState>,
}

impl UserEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    async fn create(&self, dto: CreateUserRequestDto) -> PoemResult<CreateUserApiResponse> {
        let request = match CreateUserRequest::try_from(dto) {
            Ok(request) => request,
            Err(err) => return Ok(CreateUserApiResponse::BadRequest(PlainText(err.to_string()))),
        };

        match validate_create_user(&request, self.state.validator_store.as_ref()).await {
            Ok(()) => {}
            Err(ValidateError::Invalid(err)) => {
                return Ok(CreateUserApiResponse::Unprocessable(Json(
                    map_validation_error(&err),
                )));
            }
            Err(ValidateError::Store(err)) => {
                return Err(error_body(&err, store_error_status(&err)));
            }
        }

        let response = self.state.controller.create_user(&request).await;
        if let Some(err) = &response.error {
            return Err(error_body(err, response.status_code));
        }
        let Some(user) = &response.user else {
            return Err(error_body(
                &"no user returned",
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        };

        Ok(CreateUserApiResponse::Created(Json(CreateUserResponseDto {
            message: response.message.clone(),
            user: map_user(user),
        })))
    }
}

fn error_body(err: &impl std::fmt::Display, status: StatusCode) -> PoemError {
    PoemError::from_string(format!("the error is {err}"), status)
}

#[OpenApi]
impl UserEndpoints {
    #[oai(path = "/create-user", method = "post", tag = EndpointsTags::Users)]
    pub async fn create_user(
        &self,
        request: Json<CreateUserRequestDto>,
    ) -> PoemResult<CreateUserApiResponse> {
        self.create(request.0).await
    }

    #[oai(
        path = "/v1/user",
        method = "post",
        tag = EndpointsTags::Users,
        deprecated
    )]
    pub async fn create_user_v1(
        &self,
        request: Json<CreateUserRequestDto>,
    ) -> PoemResult<CreateUserApiResponse> {
        self.create(request.0).await
    }
}
