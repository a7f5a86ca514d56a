use poem_openapi::Enum;

use crate::domain::models::Gender;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum GenderKind {
    #[oai(rename = "male")]
    Male,
    #[oai(rename = "female")]
    Female,
}

impl From<Gender> for GenderKind {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Male => GenderKind::Male,
            Gender::Female => GenderKind::Female,
        }
    }
}
