//! Pure domain models (Identity, Account, Transaction). No I/O.

pub mod account;
pub mod common;
pub mod identity;
pub mod transaction;

pub use account::Account;
pub use common::{find_by_id, Identifiable, ACCOUNT_COLORS, DEFAULT_CATEGORIES, UNKNOWN_ACCOUNT};
pub use identity::{Identity, IdentityMode, GUEST_UID};
pub use transaction::{NewTransaction, Transaction, TransactionType};
