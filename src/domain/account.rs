use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Open for balance mutations
    Active,
    /// Permanently closed; a closed account never becomes active again
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank-style account. The balance is only ever mutated while the caller
/// holds the per-account lock; the invariant balance >= 0 is enforced by the
/// services before calling `debit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Globally unique, numerically monotonic account number
    pub account_number: String,
    /// Owning user (foreign key, not an embedded object)
    pub user_id: UserId,
    pub status: AccountStatus,
    pub balance: Amount,
    pub registered_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new active account with the given initial balance.
    pub fn open(account_number: String, user_id: UserId, initial_balance: Amount) -> Self {
        assert!(initial_balance >= 0, "Initial balance must be non-negative");
        Self {
            account_number,
            user_id,
            status: AccountStatus::Active,
            balance: initial_balance,
            registered_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == AccountStatus::Closed
    }

    /// Subtract `amount` from the balance. Callers must have validated that
    /// the amount does not exceed the current balance.
    pub fn debit(&mut self, amount: Amount) {
        assert!(amount > 0, "Debit amount must be positive");
        assert!(amount <= self.balance, "Debit must not exceed balance");
        self.balance -= amount;
    }

    /// Add `amount` back onto the balance.
    pub fn credit(&mut self, amount: Amount) {
        assert!(amount > 0, "Credit amount must be positive");
        self.balance += amount;
    }

    /// Mark the account as closed. Requires a zero balance.
    pub fn close(&mut self) {
        assert_eq!(self.balance, 0, "Account must be empty before closure");
        self.status = AccountStatus::Closed;
        self.closed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [AccountStatus::Active, AccountStatus::Closed] {
            let parsed = AccountStatus::from_str(status.as_str()).unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_open_account_is_active() {
        let account = Account::open("1000000001".into(), 1, 1000);
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.balance, 1000);
        assert!(account.closed_at.is_none());
    }

    #[test]
    fn test_debit_and_credit() {
        let mut account = Account::open("1000000001".into(), 1, 1000);
        account.debit(300);
        assert_eq!(account.balance, 700);
        account.credit(300);
        assert_eq!(account.balance, 1000);
    }

    #[test]
    #[should_panic(expected = "Debit must not exceed balance")]
    fn test_debit_cannot_overdraw() {
        let mut account = Account::open("1000000001".into(), 1, 100);
        account.debit(101);
    }

    #[test]
    fn test_close_sets_status_and_timestamp() {
        let mut account = Account::open("1000000001".into(), 1, 0);
        account.close();
        assert!(account.is_closed());
        assert!(account.closed_at.is_some());
    }

    #[test]
    #[should_panic(expected = "Account must be empty before closure")]
    fn test_close_requires_zero_balance() {
        let mut account = Account::open("1000000001".into(), 1, 50);
        account.close();
    }
}
