use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::{
    Account, AccountUser, Amount, Transaction, TransactionId, TransactionResult, TransactionType,
    UserId,
};
use crate::lock::BalanceLock;
use crate::storage::Repository;

use super::AppError;

/// Transactions older than this can no longer be cancelled.
const CANCEL_WINDOW_DAYS: i64 = 365;

/// Result snapshot returned from a balance mutation.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    pub account_number: String,
    pub transaction_result: TransactionResult,
    pub transaction_id: TransactionId,
    pub amount: Amount,
    pub balance_snapshot: Amount,
    pub transacted_at: DateTime<Utc>,
}

/// Public projection of a recorded transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetails {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub transaction_result: TransactionResult,
    pub transaction_id: TransactionId,
    pub amount: Amount,
    pub transacted_at: DateTime<Utc>,
}

/// The balance ledger: use/cancel mutations guarded by a per-account lock,
/// every attempt recorded as an immutable transaction.
pub struct TransactionService<L: BalanceLock> {
    repo: Repository,
    lock: L,
}

impl<L: BalanceLock> TransactionService<L> {
    pub fn new(repo: Repository, lock: L) -> Self {
        Self { repo, lock }
    }

    /// Debit `amount` from the account. The caller must own the account,
    /// the account must be active, and the amount must not exceed the
    /// balance. Validation failures after the account is resolved are still
    /// recorded as failed transactions.
    pub async fn use_balance(
        &self,
        user_id: UserId,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionOutcome, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }

        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let token = self.lock.acquire(account_number).await?;
        let result = self.use_balance_locked(&user, account_number, amount).await;
        self.lock.release(token);
        result
    }

    async fn use_balance_locked(
        &self,
        user: &AccountUser,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionOutcome, AppError> {
        let mut account = self
            .repo
            .get_account(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))?;

        if let Err(err) = validate_use(&account, user.id, amount) {
            // The ledger reflects every attempt: record the failure against
            // the unchanged balance before surfacing the error.
            self.record(&account, TransactionType::Use, TransactionResult::Fail, amount, None)
                .await?;
            return Err(err);
        }

        account.debit(amount);
        self.repo.update_account(&account).await?;

        let tx = self
            .record(
                &account,
                TransactionType::Use,
                TransactionResult::Success,
                amount,
                None,
            )
            .await?;
        Ok(outcome(&tx))
    }

    /// Reverse a previously successful use in full. Cancellation is locked
    /// on the same account number so it cannot interleave with a concurrent
    /// use.
    pub async fn cancel_balance(
        &self,
        transaction_id: TransactionId,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionOutcome, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }

        let original = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))?;

        let token = self.lock.acquire(account_number).await?;
        let result = self
            .cancel_balance_locked(&original, account_number, amount)
            .await;
        self.lock.release(token);
        result
    }

    async fn cancel_balance_locked(
        &self,
        original: &Transaction,
        account_number: &str,
        amount: Amount,
    ) -> Result<TransactionOutcome, AppError> {
        let mut account = self
            .repo
            .get_account(account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))?;

        if let Err(err) = validate_cancel(original, &account, amount) {
            self.record(
                &account,
                TransactionType::Cancel,
                TransactionResult::Fail,
                amount,
                Some(original.id),
            )
            .await?;
            return Err(err);
        }

        account.credit(amount);
        self.repo.update_account(&account).await?;

        let tx = self
            .record(
                &account,
                TransactionType::Cancel,
                TransactionResult::Success,
                amount,
                Some(original.id),
            )
            .await?;
        Ok(outcome(&tx))
    }

    /// Look up a recorded transaction. Read-only; takes no lock.
    pub async fn query_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<TransactionDetails, AppError> {
        let tx = self
            .repo
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))?;

        Ok(TransactionDetails {
            account_number: tx.account_number,
            transaction_type: tx.transaction_type,
            transaction_result: tx.result,
            transaction_id: tx.id,
            amount: tx.amount,
            transacted_at: tx.transacted_at,
        })
    }

    /// Append a transaction row for this attempt. The snapshot is the
    /// account balance as it stands now: post-mutation for successes,
    /// untouched for failures.
    async fn record(
        &self,
        account: &Account,
        transaction_type: TransactionType,
        result: TransactionResult,
        amount: Amount,
        reverses: Option<TransactionId>,
    ) -> Result<Transaction, AppError> {
        let mut tx = Transaction::new(
            account.account_number.clone(),
            transaction_type,
            result,
            amount,
            account.balance,
        );
        if let Some(original_id) = reverses {
            tx = tx.with_reverses(original_id);
        }
        self.repo.save_transaction(&tx).await?;
        Ok(tx)
    }
}

fn validate_use(account: &Account, user_id: UserId, amount: Amount) -> Result<(), AppError> {
    if account.user_id != user_id {
        return Err(AppError::UserAccountMismatch {
            user_id,
            account_number: account.account_number.clone(),
        });
    }
    if account.is_closed() {
        return Err(AppError::AlreadyUnregistered(
            account.account_number.clone(),
        ));
    }
    if amount > account.balance {
        return Err(AppError::AmountExceedsBalance {
            account_number: account.account_number.clone(),
            balance: account.balance,
            requested: amount,
        });
    }
    Ok(())
}

fn validate_cancel(
    original: &Transaction,
    account: &Account,
    amount: Amount,
) -> Result<(), AppError> {
    if original.account_number != account.account_number {
        return Err(AppError::TransactionAccountMismatch {
            transaction_id: original.id.to_string(),
            account_number: account.account_number.clone(),
        });
    }
    if amount != original.amount {
        return Err(AppError::CancelMustBeFull {
            original: original.amount,
            requested: amount,
        });
    }
    if Utc::now() - original.transacted_at > Duration::days(CANCEL_WINDOW_DAYS) {
        return Err(AppError::TooOldToCancel {
            transacted_at: original.transacted_at,
        });
    }
    Ok(())
}

fn outcome(tx: &Transaction) -> TransactionOutcome {
    TransactionOutcome {
        account_number: tx.account_number.clone(),
        transaction_result: tx.result,
        transaction_id: tx.id,
        amount: tx.amount,
        balance_snapshot: tx.balance_snapshot,
        transacted_at: tx.transacted_at,
    }
}
