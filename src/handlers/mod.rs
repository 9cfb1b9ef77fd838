//! Lifecycle managers
//!
//! Business operations over stores, transactions and users.
//! Each manager coordinates repositories and stamps the acting user.

mod commands;
mod store_handler;
mod transaction_handler;
mod user_handler;


pub use commands::*;
pub use store_handler::StoreManager;
pub use transaction_handler::TransactionManager;
pub use user_handler::UserManager;
