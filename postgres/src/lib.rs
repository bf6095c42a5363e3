//! `PostgreSQL` ticket store for Ticketbooth.
//!
//! Implements [`TicketStore`] over a `sqlx` connection pool. Users and issued
//! tickets live in two tables (see `migrations/`); the number of rows in
//! `payment_tokens` is the sold inventory.
//!
//! # Issuance
//!
//! [`TicketStore::begin_issuance`] opens a transaction and takes
//! `pg_advisory_xact_lock` on a fixed key. Every issuance transaction takes the
//! same lock, so they run one at a time, and the lock is released by commit or
//! rollback. A scope dropped without committing is rolled back by `sqlx`.
//!
//! # Example
//!
//! ```no_run
//! use ticketbooth_postgres::PostgresTicketStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresTicketStore::connect("postgres://localhost/ticketbooth").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use ticketbooth_core::store::{IssuanceScope, TicketStore};
use ticketbooth_core::types::{PaymentId, PaymentToken, TicketToken, User, UserId};
use ticketbooth_core::{Result, TicketingError};
use uuid::Uuid;

/// Advisory lock key shared by every issuance transaction ("TICKETS" in ASCII).
pub const ISSUANCE_LOCK_KEY: i64 = 0x0054_4943_4B45_5453;

/// `PostgreSQL` implementation of [`TicketStore`].
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database can't be reached.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(unavailable("connect"))?;
        Ok(Self::from_pool(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TicketingError::StorageUnavailable(format!("Migration failed: {e}")))?;
        tracing::info!("Ticket store migrations applied");
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Row mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    title: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    age: i16,
    gender: String,
    number_of_tickets: i32,
    address1: String,
    address2: Option<String>,
    city: String,
    post_code: String,
    registered_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = TicketingError;

    fn try_from(row: UserRow) -> Result<Self> {
        let corrupt = |field: &str| {
            TicketingError::StorageUnavailable(format!(
                "user {} has an out-of-range {field}",
                row.user_id
            ))
        };
        let age = u8::try_from(row.age).map_err(|_| corrupt("age"))?;
        let number_of_tickets =
            u32::try_from(row.number_of_tickets).map_err(|_| corrupt("number_of_tickets"))?;

        Ok(Self {
            id: UserId::from_uuid(row.user_id),
            title: row.title,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            age,
            gender: row.gender,
            number_of_tickets,
            address1: row.address1,
            address2: row.address2,
            city: row.city,
            post_code: row.post_code,
            registered_at: row.registered_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    user_id: Uuid,
    token: String,
    payment_id: String,
    issued_at: DateTime<Utc>,
}

impl From<TokenRow> for PaymentToken {
    fn from(row: TokenRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            token: TicketToken::new(row.token),
            payment_id: PaymentId::new(row.payment_id),
            issued_at: row.issued_at,
        }
    }
}

const SELECT_TOKENS_BY_PAYMENT: &str = r"
    SELECT user_id, token, payment_id, issued_at
    FROM payment_tokens
    WHERE payment_id = $1
    ORDER BY id
";

fn count_from(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn unavailable(operation: &'static str) -> impl FnOnce(sqlx::Error) -> TicketingError {
    move |e| {
        metrics::counter!("ticketbooth_store_errors_total", "operation" => operation).increment(1);
        tracing::error!(operation, error = %e, "Ticket store query failed");
        TicketingError::StorageUnavailable(format!("{operation}: {e}"))
    }
}

fn persist_failed(operation: &'static str) -> impl FnOnce(sqlx::Error) -> TicketingError {
    move |e| {
        metrics::counter!("ticketbooth_store_errors_total", "operation" => operation).increment(1);
        tracing::error!(operation, error = %e, "Ticket store write failed");
        TicketingError::PersistFailed(format!("{operation}: {e}"))
    }
}

// ============================================================================
// TicketStore
// ============================================================================

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unavailable("ping"))?;
        Ok(())
    }

    async fn count_tokens(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_tokens")
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable("count_tokens"))?;
        Ok(count_from(count))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT user_id, title, first_name, last_name, email, phone_number, age, gender,
                   number_of_tickets, address1, address2, city, post_code, registered_at
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable("find_user"))?;

        row.map(User::try_from).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let number_of_tickets = i32::try_from(user.number_of_tickets)
            .map_err(|_| TicketingError::PersistFailed("number_of_tickets out of range".to_string()))?;

        sqlx::query(
            r"
            INSERT INTO users (
                user_id, title, first_name, last_name, email, phone_number, age, gender,
                number_of_tickets, address1, address2, city, post_code, registered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(user.id.as_uuid())
        .bind(&user.title)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(i16::from(user.age))
        .bind(&user.gender)
        .bind(number_of_tickets)
        .bind(&user.address1)
        .bind(&user.address2)
        .bind(&user.city)
        .bind(&user.post_code)
        .bind(user.registered_at)
        .execute(&self.pool)
        .await
        .map_err(persist_failed("insert_user"))?;

        Ok(())
    }

    async fn find_tokens_by_payment_id(&self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>> {
        let rows = sqlx::query_as::<_, TokenRow>(SELECT_TOKENS_BY_PAYMENT)
            .bind(payment_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("find_tokens_by_payment_id"))?;
        Ok(rows.into_iter().map(PaymentToken::from).collect())
    }

    async fn find_tokens_by_user_id(&self, user_id: UserId) -> Result<Vec<PaymentToken>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r"
            SELECT user_id, token, payment_id, issued_at
            FROM payment_tokens
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable("find_tokens_by_user_id"))?;
        Ok(rows.into_iter().map(PaymentToken::from).collect())
    }

    async fn begin_issuance(&self) -> Result<Box<dyn IssuanceScope>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(unavailable("begin_issuance"))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ISSUANCE_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(unavailable("issuance_lock"))?;

        Ok(Box::new(PostgresIssuance { tx: Some(tx) }))
    }
}

/// Issuance transaction holding the advisory lock.
struct PostgresIssuance {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresIssuance {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or_else(|| {
            TicketingError::StorageUnavailable("issuance scope already committed".to_string())
        })
    }
}

#[async_trait]
impl IssuanceScope for PostgresIssuance {
    async fn count_tokens(&mut self) -> Result<u64> {
        let tx = self.tx()?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_tokens")
            .fetch_one(&mut **tx)
            .await
            .map_err(unavailable("count_tokens"))?;
        Ok(count_from(count))
    }

    async fn find_tokens_by_payment_id(&mut self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>> {
        let tx = self.tx()?;
        let rows = sqlx::query_as::<_, TokenRow>(SELECT_TOKENS_BY_PAYMENT)
            .bind(payment_id.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(unavailable("find_tokens_by_payment_id"))?;
        Ok(rows.into_iter().map(PaymentToken::from).collect())
    }

    async fn insert_tokens_atomic(&mut self, tokens: &[PaymentToken]) -> Result<()> {
        let mut tx = self.tx.take().ok_or_else(|| {
            TicketingError::PersistFailed("issuance scope already committed".to_string())
        })?;

        let user_ids: Vec<Uuid> = tokens.iter().map(|row| *row.user_id.as_uuid()).collect();
        let values: Vec<&str> = tokens.iter().map(|row| row.token.as_str()).collect();
        let payment_ids: Vec<&str> = tokens.iter().map(|row| row.payment_id.as_str()).collect();
        let issued_at: Vec<DateTime<Utc>> = tokens.iter().map(|row| row.issued_at).collect();

        // Single statement: either every row lands or none does
        sqlx::query(
            r"
            INSERT INTO payment_tokens (user_id, token, payment_id, issued_at)
            SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::text[], $4::timestamptz[])
            ",
        )
        .bind(&user_ids)
        .bind(&values)
        .bind(&payment_ids)
        .bind(&issued_at)
        .execute(&mut *tx)
        .await
        .map_err(persist_failed("insert_tokens"))?;

        tx.commit().await.map_err(persist_failed("commit_tokens"))?;

        tracing::debug!(rows = tokens.len(), "Issuance committed");
        Ok(())
    }
}
