use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    application::{
        services::store::ValidatorStore,
        usecases::create_user::{CreateUserRequest, UserController},
        validators::create_user::validate_create_user,
    },
    domain::{errors::CreateUserError, events::IdentityCreatedEvent},
};

/// What the subscription should do with a delivered message.
#[derive(Debug)]
pub enum Outcome {
    Ack,
    /// Acknowledged without processing; redelivery could never succeed.
    Drop { reason: String },
    /// Left for the broker to redeliver.
    Nack(CreateUserError),
}

impl Outcome {
    pub fn acknowledges(&self) -> bool {
        !matches!(self, Outcome::Nack(_))
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Outcome;
}

/// Creates a user for every identity-created event.
pub struct CreateUserMessageHandler {
    controller: Arc<UserController>,
    validator_store: Arc<dyn ValidatorStore>,
}

impl CreateUserMessageHandler {
    pub fn new(controller: Arc<UserController>, validator_store: Arc<dyn ValidatorStore>) -> Self {
        Self {
            controller,
            validator_store,
        }
    }

    async fn create_user(&self, event: IdentityCreatedEvent) -> Result<(), CreateUserError> {
        let request = CreateUserRequest::try_from(event)?;
        validate_create_user(&request, self.validator_store.as_ref()).await?;

        let response = self.controller.create_user(&request).await;
        match response.error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageHandler for CreateUserMessageHandler {
    async fn handle(&self, payload: &[u8]) -> Outcome {
        let event: IdentityCreatedEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                return Outcome::Drop {
                    reason: err.to_string(),
                };
            }
        };

        match self.create_user(event).await {
            Ok(()) => Outcome::Ack,
            Err(err) => Outcome::Nack(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        application::services::store::{FieldValue, MockUserStore, MockValidatorStore},
        domain::errors::StoreError,
        infrastructure::repositories::in_memory::InMemoryUserStore,
    };

    fn payload(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn identity() -> serde_json::Value {
        json!({
            "user_id": "auth0|5",
            "email": "margaret@example.com",
            "given_name": "Margaret",
            "family_name": "Hamilton",
            "gender": "female",
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    fn in_memory_handler() -> (CreateUserMessageHandler, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let handler = CreateUserMessageHandler::new(
            Arc::new(UserController::new(store.clone())),
            store.clone(),
        );
        (handler, store)
    }

    fn untouched_handler() -> CreateUserMessageHandler {
        let mut users = MockUserStore::new();
        users.expect_create_user().never();
        let mut validator = MockValidatorStore::new();
        validator.expect_unique().never();
        validator.expect_exists().never();
        CreateUserMessageHandler::new(
            Arc::new(UserController::new(Arc::new(users))),
            Arc::new(validator),
        )
    }

    #[tokio::test]
    async fn acks_created_users() {
        let (handler, store) = in_memory_handler();

        let outcome = handler.handle(&payload(identity())).await;

        assert!(matches!(outcome, Outcome::Ack));
        assert!(
            store
                .exists("users", "id", &FieldValue::Int(5))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn drops_undecodable_payloads() {
        let handler = untouched_handler();

        for raw in [&b"\x08\x96\x01"[..], &b"{\"email\": 12}"[..], &b""[..]] {
            let outcome = handler.handle(raw).await;
            assert!(matches!(outcome, Outcome::Drop { .. }));
            assert!(outcome.acknowledges());
        }
    }

    #[tokio::test]
    async fn nacks_unbindable_events() {
        let handler = untouched_handler();
        let mut event = identity();
        event["email"] = serde_json::Value::Null;

        let outcome = handler.handle(&payload(event)).await;

        assert!(matches!(outcome, Outcome::Nack(CreateUserError::Bind(_))));
        assert!(!outcome.acknowledges());
    }

    #[tokio::test]
    async fn nacks_invalid_events() {
        let handler = untouched_handler();
        let mut event = identity();
        event["email"] = json!("margaret");

        let outcome = handler.handle(&payload(event)).await;

        assert!(matches!(
            outcome,
            Outcome::Nack(CreateUserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn nacks_redelivered_identity() {
        let (handler, _store) = in_memory_handler();

        assert!(handler.handle(&payload(identity())).await.acknowledges());
        let outcome = handler.handle(&payload(identity())).await;

        assert!(matches!(
            outcome,
            Outcome::Nack(CreateUserError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn nacks_store_failures() {
        let mut users = MockUserStore::new();
        users
            .expect_create_user()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection reset".to_string())));
        let mut validator = MockValidatorStore::new();
        validator.expect_unique().returning(|_, _, _| Ok(true));
        validator.expect_exists().returning(|_, _, _| Ok(false));
        let handler = CreateUserMessageHandler::new(
            Arc::new(UserController::new(Arc::new(users))),
            Arc::new(validator),
        );

        let outcome = handler.handle(&payload(identity())).await;

        assert!(matches!(
            outcome,
            Outcome::Nack(CreateUserError::Store(StoreError::Unavailable(_)))
        ));
    }
}
