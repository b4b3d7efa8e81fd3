//! Owner kinds and owner identity for the polymorphic transactions relation.
//!
//! A transaction row stores an `(owner_type, owner_id)` pair instead of a
//! foreign key into a single table. `OwnerKind` is the closed set of valid
//! `owner_type` tags; anything persisting or querying by owner goes through
//! `OwnerRef`, which is only constructible from a valid kind and a positive
//! identifier.

use crate::error::{LedgerError, LedgerResult};
use crate::orm::{Db, Migration, Model};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape every stored discriminator tag must have: short lowercase code.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// The enumerated set of entity kinds that can own transactions.
///
/// Tags are stable short codes, not type names; they are part of the stored
/// data format and must never be renamed once rows exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Order,
    Account,
    Invoice,
}

impl OwnerKind {
    /// The discriminator tag stored in the `owner_type` column.
    pub fn as_tag(&self) -> &'static str {
        match self {
            OwnerKind::Order => "order",
            OwnerKind::Account => "account",
            OwnerKind::Invoice => "invoice",
        }
    }

    /// Parse a raw stored tag back into a kind.
    ///
    /// Rejects tags outside the enumerated set, including well-formed but
    /// unknown codes, so a bad writer cannot smuggle rows past read-side
    /// validation.
    pub fn from_tag(tag: &str) -> LedgerResult<Self> {
        if !TAG_RE.is_match(tag) {
            return Err(LedgerError::UnknownOwnerKind(tag.to_string()));
        }
        match tag {
            "order" => Ok(OwnerKind::Order),
            "account" => Ok(OwnerKind::Account),
            "invoice" => Ok(OwnerKind::Invoice),
            other => Err(LedgerError::UnknownOwnerKind(other.to_string())),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Anything transactions can be recorded against.
///
/// `owner_id` returns `None` for records that have not been persisted yet;
/// such owners cannot be queried and fail with `InvalidOwner`.
pub trait Owner: Send + Sync {
    fn owner_kind(&self) -> OwnerKind;
    fn owner_id(&self) -> Option<i64>;
}

/// A validated `(kind, id)` pair identifying one owner row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: i64,
}

impl OwnerRef {
    pub fn new(kind: OwnerKind, id: i64) -> LedgerResult<Self> {
        if id <= 0 {
            return Err(LedgerError::InvalidOwner(format!(
                "{} owner id must be positive, got {}",
                kind, id
            )));
        }
        Ok(OwnerRef { kind, id })
    }

    /// Resolve an owner instance into a queryable reference.
    pub fn resolve(owner: &dyn Owner) -> LedgerResult<Self> {
        let kind = owner.owner_kind();
        let id = owner.owner_id().ok_or_else(|| {
            LedgerError::InvalidOwner(format!("{} owner has no persisted id", kind))
        })?;
        OwnerRef::new(kind, id)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// A customer order. One of the owner kinds shipped with the crate.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<i64>,
    pub reference: String,
    pub total_cents: i64,
    pub created_at: Option<NaiveDateTime>,
}

impl Model for Order {
    fn table_name() -> &'static str {
        "orders"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference TEXT NOT NULL,
            total_cents INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        vec![
            ("reference".into(), "TEXT".into()),
            ("total_cents".into(), "INTEGER".into()),
            ("created_at".into(), "DATETIME".into()),
        ]
    }
}

impl Owner for Order {
    fn owner_kind(&self) -> OwnerKind {
        OwnerKind::Order
    }

    fn owner_id(&self) -> Option<i64> {
        self.id
    }
}

inventory::submit! {
    Migration(|db: Arc<Db>| Box::pin(async move { Order::migrate(db).await }))
}

/// A billing account, the second built-in owner kind.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<i64>,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Model for Account {
    fn table_name() -> &'static str {
        "accounts"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        vec![
            ("name".into(), "TEXT".into()),
            ("created_at".into(), "DATETIME".into()),
        ]
    }
}

impl Owner for Account {
    fn owner_kind(&self) -> OwnerKind {
        OwnerKind::Account
    }

    fn owner_id(&self) -> Option<i64> {
        self.id
    }
}

inventory::submit! {
    Migration(|db: Arc<Db>| Box::pin(async move { Account::migrate(db).await }))
}
