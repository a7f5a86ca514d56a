use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};

use crate::{
    application::{
        services::{
            health::HealthProbe,
            store::{FieldValue, UserStore, ValidatorStore},
        },
        usecases::create_user::CreateUserRequest,
    },
    config::DatabaseConfig,
    domain::{
        errors::StoreError,
        models::{
            Gender, User, UserField,
            user::{USER_ENTITY, USER_ENTITY_EMAIL, USER_ENTITY_ID},
        },
    },
};

pub type PgPool = Pool<Postgres>;

const INSERT_USER: &str = r#"
    INSERT INTO users (email, first_name, last_name, gender)
    VALUES ($1, $2, $3, $4)
    RETURNING id, email, first_name, last_name, gender
"#;

const INSERT_USER_WITH_ID: &str = r#"
    INSERT INTO users (id, email, first_name, last_name, gender)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, email, first_name, last_name, gender
"#;

// Never moves the sequence backwards; `nextval` covers concurrent allocations.
const ADVANCE_USER_ID: &str = r#"
    SELECT setval(
        pg_get_serial_sequence('users', 'id'),
        GREATEST($1, nextval(pg_get_serial_sequence('users', 'id')))
    )
"#;

#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<Self>> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, StoreError> {
        let Some(id) = request.id else {
            let record = bind_user(sqlx::query_as::<_, UserRecord>(INSERT_USER), request)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            return User::try_from(record);
        };

        // explicit ids bypass the sequence; move it past them in the same transaction
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let record = bind_user(
            sqlx::query_as::<_, UserRecord>(INSERT_USER_WITH_ID).bind(id),
            request,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        sqlx::query(ADVANCE_USER_ID)
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        User::try_from(record)
    }
}

type UserQuery<'q> = sqlx::query::QueryAs<'q, Postgres, UserRecord, sqlx::postgres::PgArguments>;

fn bind_user<'q>(query: UserQuery<'q>, request: &'q CreateUserRequest) -> UserQuery<'q> {
    query
        .bind(&request.email)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.gender.map(Gender::as_str))
}

#[async_trait]
impl ValidatorStore for PostgresUserStore {
    async fn unique(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        Ok(!self.exists(entity, field, value).await?)
    }

    async fn exists(
        &self,
        entity: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<bool, StoreError> {
        let result = match (UserField::resolve(entity, field)?, value) {
            (UserField::Id, FieldValue::Int(id)) => {
                sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                    .bind(*id)
                    .fetch_one(&self.pool)
                    .await
            }
            (UserField::Email, FieldValue::Text(email)) => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))",
                )
                .bind(email)
                .fetch_one(&self.pool)
                .await
            }
            // no row can match a value of the wrong type
            _ => return Ok(false),
        };
        result.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl HealthProbe for PostgresUserStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    gender: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let gender = record
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|err| StoreError::Other(err.into()))?;

        Ok(User {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            gender,
        })
    }
}

const SEQUENCE_LIMIT_EXCEEDED: &str = "2200H";

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists {
            entity: USER_ENTITY,
            field: constraint_field(db.constraint()),
        },
        sqlx::Error::Database(db) if db.code().as_deref() == Some(SEQUENCE_LIMIT_EXCEEDED) => {
            StoreError::Unavailable("user id space exhausted".to_string())
        }
        err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Other(other.into()),
    }
}

fn constraint_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => USER_ENTITY_EMAIL,
        _ => USER_ENTITY_ID,
    }
}
