pub mod error;
pub mod forms;
pub mod orm;
pub mod owner;
pub mod settings;
pub mod transactions;

pub use error::{LedgerError, LedgerResult};
pub use owner::{Owner, OwnerKind, OwnerRef};
pub use transactions::{NewTransaction, Transaction, TransactionStatus, TransactionStore};

inventory::collect!(crate::orm::Migration);
