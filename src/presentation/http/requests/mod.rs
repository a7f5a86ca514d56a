use poem_openapi::Object;

#[derive(Object, Debug, Clone)]
pub struct CreateUserRequestDto {
    pub id: Option<i64>,
    pub email: String,
    #[oai(default)]
    pub first_name: String,
    #[oai(default)]
    pub last_name: String,
    /// `male` or `female`.
    pub gender: Option<String>,
}
