//! Domain module
//!
//! Core entity types for stores, transactions and users.

pub mod amount;
pub mod clock;
pub mod context;
pub mod store;
pub mod transaction;
pub mod user;

pub use amount::{parse_amount, AmountError};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::Principal;
pub use store::{NewStore, Store, StorePatch, StoreRef, StoreStats, StoreView, UserRef};
pub use transaction::{
    NewTransaction, PaymentUpdate, Transaction, TransactionFilter, TransactionPatch,
    TransactionStatus, TransactionView,
};
pub use user::{NewUser, Role, User, UserPatch};
