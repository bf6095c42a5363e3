//! In-memory ticket store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use ticketbooth_core::store::{IssuanceScope, TicketStore};
use ticketbooth_core::types::{PaymentId, PaymentToken, TicketToken, User, UserId};
use ticketbooth_core::{Result, TicketingError};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tokens: Vec<PaymentToken>,
}

/// `TicketStore` backed by in-process maps.
///
/// Issuance scopes hold an owned async mutex guard, so they are serialized
/// exactly like the Postgres advisory lock serializes transactions. Token
/// uniqueness is checked on insert, mirroring the database constraint.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tables: Arc<RwLock<Tables>>,
    issuance: Arc<Mutex<()>>,
    fail_next_insert: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryTicketStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_tokens_atomic` fail with `PersistFailed` before
    /// writing anything.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Make every read fail with `StorageUnavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every issued row, in issue order
    #[must_use]
    pub fn tokens(&self) -> Vec<PaymentToken> {
        self.tables
            .read()
            .map(|tables| tables.tokens.clone())
            .unwrap_or_default()
    }

    /// Number of issued rows
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tables.read().map(|tables| tables.tokens.len()).unwrap_or_default()
    }

    /// Number of registered users
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.tables.read().map(|tables| tables.users.len()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TicketingError::StorageUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        self.check_available()?;
        self.tables
            .read()
            .map(|tables| f(&tables))
            .map_err(|_| TicketingError::StorageUnavailable("lock poisoned".to_string()))
    }
}

fn by_payment(tables: &Tables, payment_id: &PaymentId) -> Vec<PaymentToken> {
    tables
        .tokens
        .iter()
        .filter(|row| &row.payment_id == payment_id)
        .cloned()
        .collect()
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn count_tokens(&self) -> Result<u64> {
        self.read(|tables| tables.tokens.len() as u64)
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.read(|tables| tables.users.get(&user_id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.check_available()
            .map_err(|e| TicketingError::PersistFailed(e.to_string()))?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| TicketingError::PersistFailed("lock poisoned".to_string()))?;
        if tables.users.contains_key(&user.id) {
            return Err(TicketingError::PersistFailed(format!(
                "user {} already exists",
                user.id
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_tokens_by_payment_id(&self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>> {
        self.read(|tables| by_payment(tables, payment_id))
    }

    async fn find_tokens_by_user_id(&self, user_id: UserId) -> Result<Vec<PaymentToken>> {
        self.read(|tables| {
            tables
                .tokens
                .iter()
                .filter(|row| row.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    async fn begin_issuance(&self) -> Result<Box<dyn IssuanceScope>> {
        self.check_available()?;
        let guard = Arc::clone(&self.issuance).lock_owned().await;
        Ok(Box::new(InMemoryIssuance {
            store: self.clone(),
            guard: Some(guard),
        }))
    }
}

struct InMemoryIssuance {
    store: InMemoryTicketStore,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InMemoryIssuance {
    fn ensure_open(&self) -> Result<()> {
        if self.guard.is_none() {
            return Err(TicketingError::PersistFailed(
                "issuance scope already committed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl IssuanceScope for InMemoryIssuance {
    async fn count_tokens(&mut self) -> Result<u64> {
        self.ensure_open()
            .map_err(|e| TicketingError::StorageUnavailable(e.to_string()))?;
        self.store.read(|tables| tables.tokens.len() as u64)
    }

    async fn find_tokens_by_payment_id(&mut self, payment_id: &PaymentId) -> Result<Vec<PaymentToken>> {
        self.ensure_open()
            .map_err(|e| TicketingError::StorageUnavailable(e.to_string()))?;
        self.store.read(|tables| by_payment(tables, payment_id))
    }

    async fn insert_tokens_atomic(&mut self, tokens: &[PaymentToken]) -> Result<()> {
        self.ensure_open()?;

        if self.store.fail_next_insert.swap(false, Ordering::SeqCst) {
            self.guard = None;
            return Err(TicketingError::PersistFailed(
                "injected insert failure".to_string(),
            ));
        }

        let mut tables = self
            .store
            .tables
            .write()
            .map_err(|_| TicketingError::PersistFailed("lock poisoned".to_string()))?;

        let mut seen: HashSet<&TicketToken> = tables.tokens.iter().map(|row| &row.token).collect();
        for row in tokens {
            if !tables.users.contains_key(&row.user_id) {
                return Err(TicketingError::PersistFailed(format!(
                    "unknown user {}",
                    row.user_id
                )));
            }
            if !seen.insert(&row.token) {
                return Err(TicketingError::PersistFailed(format!(
                    "duplicate token {}",
                    row.token
                )));
            }
        }

        tables.tokens.extend_from_slice(tokens);
        drop(tables);
        self.guard = None;
        Ok(())
    }
}
