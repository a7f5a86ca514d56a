pub mod services;
pub mod usecases;
pub mod validators;
