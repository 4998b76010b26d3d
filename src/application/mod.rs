// Application layer - the two services callers interact with:
// account lifecycle (create/close/list) and the balance ledger (use/cancel/query).

pub mod accounts;
pub mod error;
pub mod transactions;

pub use accounts::*;
pub use error::*;
pub use transactions::*;
