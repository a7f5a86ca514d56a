pub mod guard;
pub mod http;
pub mod models;
pub mod pubsub;
