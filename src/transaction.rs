//! Transaction identity.
//!
//! Transactions are only identities here: pages remember which transaction
//! dirtied them, and page access carries a requested permission, but no
//! locking or recovery is enforced.

pub mod id;
pub mod permissions;

pub use id::{TransactionId, TransactionIdGenerator};
pub use permissions::Permissions;
