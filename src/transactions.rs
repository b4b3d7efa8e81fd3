//! Transactions and the polymorphic association accessor.
//!
//! Every transaction row carries an `(owner_type, owner_id)` pair; the same
//! `transactions` table serves all owner kinds, and lookups match on both
//! fields so numerically colliding ids from different kinds never mix.

use crate::error::LedgerResult;
use crate::orm::{Db, Migration, Model};
use crate::owner::{Owner, OwnerKind, OwnerRef};
use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settlement state of a transaction, stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Settled,
    Voided,
}

/// A stored financial transaction.
///
/// The `(owner_type, owner_id)` pair is written once at record time and never
/// reassigned. There is no deletion path; voiding is a status change.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    /// Signed amount in minor currency units.
    pub amount_cents: i64,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// The stored discriminator resolved back into a kind.
    pub fn owner_kind(&self) -> LedgerResult<OwnerKind> {
        OwnerKind::from_tag(&self.owner_type)
    }
}

impl Model for Transaction {
    fn table_name() -> &'static str {
        "transactions"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_type TEXT NOT NULL,
            owner_id INTEGER NOT NULL,
            amount_cents INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            note TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        vec![
            ("owner_type".into(), "TEXT".into()),
            ("owner_id".into(), "INTEGER".into()),
            ("amount_cents".into(), "INTEGER".into()),
            ("status".into(), "TEXT".into()),
            ("note".into(), "TEXT".into()),
            ("created_at".into(), "DATETIME".into()),
            ("updated_at".into(), "DATETIME".into()),
        ]
    }

    fn index_sql() -> Vec<String> {
        vec![
            "CREATE INDEX IF NOT EXISTS idx_transactions_owner \
             ON transactions (owner_type, owner_id)"
                .to_string(),
        ]
    }
}

inventory::submit! {
    Migration(|db: Arc<Db>| Box::pin(async move { Transaction::migrate(db).await }))
}

/// Fields a caller supplies when recording a transaction; everything else is
/// stamped by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount_cents: i64,
    pub status: TransactionStatus,
    pub note: Option<String>,
}

impl NewTransaction {
    pub fn amount(amount_cents: i64) -> Self {
        NewTransaction {
            amount_cents,
            ..Default::default()
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, owner_type, owner_id, amount_cents, status, note, created_at, updated_at";

/// Read/write access to the shared transactions table.
///
/// Cheap to clone; all methods issue a single bound-parameter statement
/// against the pool, so concurrent callers need no extra coordination.
#[derive(Clone)]
pub struct TransactionStore {
    db: Db,
}

impl TransactionStore {
    pub fn new(db: Db) -> Self {
        TransactionStore { db }
    }

    /// All transactions belonging to `owner`, in insertion order.
    ///
    /// Returns an empty vec (never an error) when the owner has no
    /// transactions. Fails with `InvalidOwner` before touching the store if
    /// the owner has no persisted id.
    pub async fn transactions_for(&self, owner: &dyn Owner) -> LedgerResult<Vec<Transaction>> {
        let owner_ref = OwnerRef::resolve(owner)?;
        self.transactions_for_ref(owner_ref).await
    }

    /// Same as `transactions_for`, for callers that already hold a validated
    /// `(kind, id)` pair.
    pub async fn transactions_for_ref(
        &self,
        owner_ref: OwnerRef,
    ) -> LedgerResult<Vec<Transaction>> {
        debug!("Fetching transactions for owner {}", owner_ref);
        let sql = format!(
            "SELECT {} FROM transactions WHERE owner_type = ? AND owner_id = ? ORDER BY id",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, Transaction>(&sql)
            .bind(owner_ref.kind.as_tag())
            .bind(owner_ref.id)
            .fetch_all(self.db.pool())
            .await?;
        debug!("Owner {} has {} transactions", owner_ref, rows.len());
        Ok(rows)
    }

    /// Number of transactions recorded against `owner`.
    pub async fn count_for(&self, owner: &dyn Owner) -> LedgerResult<i64> {
        let owner_ref = OwnerRef::resolve(owner)?;
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM transactions WHERE owner_type = ? AND owner_id = ?",
        )
        .bind(owner_ref.kind.as_tag())
        .bind(owner_ref.id)
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    /// Record a new transaction against `owner` and return the stored row.
    ///
    /// The owner's discriminator tag comes from `OwnerKind`, so only tags in
    /// the enumerated set can ever reach the `owner_type` column.
    pub async fn record(
        &self,
        owner: &dyn Owner,
        new: NewTransaction,
    ) -> LedgerResult<Transaction> {
        let owner_ref = OwnerRef::resolve(owner)?;
        self.record_for_ref(owner_ref, new).await
    }

    /// Record a new transaction against an already-validated owner reference.
    pub async fn record_for_ref(
        &self,
        owner_ref: OwnerRef,
        new: NewTransaction,
    ) -> LedgerResult<Transaction> {
        debug!(
            "Recording transaction of {} cents for owner {}",
            new.amount_cents, owner_ref
        );
        let result = sqlx::query(
            "INSERT INTO transactions (owner_type, owner_id, amount_cents, status, note) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(owner_ref.kind.as_tag())
        .bind(owner_ref.id)
        .bind(new.amount_cents)
        .bind(new.status)
        .bind(&new.note)
        .execute(self.db.pool())
        .await?;

        let sql = format!("SELECT {} FROM transactions WHERE id = ?", SELECT_COLUMNS);
        let stored = sqlx::query_as::<_, Transaction>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(self.db.pool())
            .await?;
        Ok(stored)
    }
}
