use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Amount;

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Balance debit
    Use,
    /// Reversal of a prior use
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Use => "use",
            TransactionType::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "use" => Some(TransactionType::Use),
            "cancel" => Some(TransactionType::Cancel),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionResult {
    Success,
    Fail,
}

impl TransactionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionResult::Success => "success",
            TransactionResult::Fail => "fail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(TransactionResult::Success),
            "fail" => Some(TransactionResult::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single balance-mutation attempt, successful or failed.
/// Transactions are immutable - created once per attempt, never updated or
/// deleted. Failed attempts carry the balance as it stood at the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Account the transaction applies to (foreign key)
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result: TransactionResult,
    /// Attempted amount (always positive)
    pub amount: Amount,
    /// Account balance immediately after this transaction was applied;
    /// for failed attempts, the unchanged balance at the time of the attempt
    pub balance_snapshot: Amount,
    /// For cancellations, the use transaction being reversed
    pub reverses: Option<TransactionId>,
    pub transacted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_number: String,
        transaction_type: TransactionType,
        result: TransactionResult,
        amount: Amount,
        balance_snapshot: Amount,
    ) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            account_number,
            transaction_type,
            result,
            amount,
            balance_snapshot,
            reverses: None,
            transacted_at: Utc::now(),
        }
    }

    pub fn with_reverses(mut self, original_id: TransactionId) -> Self {
        self.reverses = Some(original_id);
        self
    }

    pub fn with_transacted_at(mut self, transacted_at: DateTime<Utc>) -> Self {
        self.transacted_at = transacted_at;
        self
    }

    pub fn is_success(&self) -> bool {
        self.result == TransactionResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_and_result_roundtrip() {
        for tt in [TransactionType::Use, TransactionType::Cancel] {
            assert_eq!(TransactionType::from_str(tt.as_str()), Some(tt));
        }
        for tr in [TransactionResult::Success, TransactionResult::Fail] {
            assert_eq!(TransactionResult::from_str(tr.as_str()), Some(tr));
        }
    }

    #[test]
    fn test_create_transaction() {
        let tx = Transaction::new(
            "1000000001".into(),
            TransactionType::Use,
            TransactionResult::Success,
            200,
            800,
        );
        assert_eq!(tx.amount, 200);
        assert_eq!(tx.balance_snapshot, 800);
        assert!(tx.is_success());
        assert!(tx.reverses.is_none());
    }

    #[test]
    fn test_cancel_references_original() {
        let original = Transaction::new(
            "1000000001".into(),
            TransactionType::Use,
            TransactionResult::Success,
            200,
            800,
        );
        let cancel = Transaction::new(
            "1000000001".into(),
            TransactionType::Cancel,
            TransactionResult::Success,
            200,
            1000,
        )
        .with_reverses(original.id);
        assert_eq!(cancel.reverses, Some(original.id));
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::new(
            "1000000001".into(),
            TransactionType::Use,
            TransactionResult::Fail,
            0,
            100,
        );
    }
}
