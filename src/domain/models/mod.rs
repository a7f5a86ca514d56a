pub mod user;

pub use user::{Gender, User, UserField};
