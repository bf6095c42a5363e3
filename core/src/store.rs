//! Persistent store abstraction.
//!
//! The ticket table is the single source of truth for inventory: sold tickets
//! are counted, never tracked in a separate counter.
//!
//! # Issuance scope
//!
//! Reconciliation needs "no tokens for this payment yet" and "enough capacity
//! left" to still hold when its insert commits. [`TicketStore::begin_issuance`]
//! opens a scope that is serialized against every other issuance scope (a
//! single-writer point for the whole ticket table). Reads made through the
//! scope therefore see every committed issuance, and nothing can commit
//! between them and [`IssuanceScope::insert_tokens_atomic`].
//!
//! Dropping a scope without inserting releases it and discards nothing.

use crate::error::Result;
use crate::types::{PaymentId, PaymentToken, User, UserId};
use async_trait::async_trait;

/// Storage for users and issued tickets.
///
/// Implementations map driver failures on reads to
/// [`TicketingError::StorageUnavailable`](crate::TicketingError::StorageUnavailable)
/// and failures on ticket writes to
/// [`TicketingError::PersistFailed`](crate::TicketingError::PersistFailed).
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Cheap round trip used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store can't be reached.
    async fn ping(&self) -> Result<()>;

    /// Number of issued tickets across all users.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn count_tokens(&self) -> Result<u64>;

    /// Look up a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Persist a newly registered user.
    ///
    /// # Errors
    ///
    /// Returns `PersistFailed` if the insert fails.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Tickets issued from one payment, in issue order.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn find_tokens_by_payment_id(&self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>>;

    /// Tickets owned by one user, in issue order.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn find_tokens_by_user_id(&self, user_id: UserId) -> Result<Vec<PaymentToken>>;

    /// Open a serialized issuance scope.
    ///
    /// Waits until every other scope has been committed or dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the scope can't be opened.
    async fn begin_issuance(&self) -> Result<Box<dyn IssuanceScope>>;
}

/// Serialized unit of work in which tickets are issued.
#[async_trait]
pub trait IssuanceScope: Send {
    /// Number of issued tickets, as seen inside the scope.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn count_tokens(&mut self) -> Result<u64>;

    /// Tickets already issued from `payment_id`, as seen inside the scope.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the query fails.
    async fn find_tokens_by_payment_id(&mut self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>>;

    /// Insert every ticket or none of them, then commit and close the scope.
    ///
    /// # Errors
    ///
    /// Returns `PersistFailed` if any row is rejected (duplicate token, broken
    /// connection) or the scope was already committed. No row is persisted in
    /// that case.
    async fn insert_tokens_atomic(&mut self, tokens: &[PaymentToken]) -> Result<()>;
}
