mod account;
mod transaction;
mod user;

pub use account::*;
pub use transaction::*;
pub use user::*;

/// Money is represented as an integer number of the smallest currency unit
/// to avoid floating-point precision issues.
pub type Amount = i64;
