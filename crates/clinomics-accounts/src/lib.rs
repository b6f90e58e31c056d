//! clinomics-accounts: User accounts, plans and the daily search quota.
//!
//! Accounts live in a single pretty-printed JSON file. Passwords are stored as
//! argon2 PHC strings.

pub mod error;
pub mod store;

pub use error::AccountError;
pub use store::{Account, Plan, UserStore, DEFAULT_FREE_DAILY_LIMIT};
