use serde::Serialize;

use crate::domain::{Account, AccountStatus, AccountUser, Amount, UserId};
use crate::storage::Repository;

use super::AppError;

/// A user may hold at most this many active accounts at once.
const MAX_ACCOUNTS_PER_USER: i64 = 10;

/// Account number handed to the very first account in the store. Later
/// accounts take the highest existing number plus one, a single global
/// monotonic sequence.
const FIRST_ACCOUNT_NUMBER: i64 = 1_000_000_001;

/// Active-account projection returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account_number: String,
    pub balance: Amount,
}

/// Account lifecycle operations: user registration, account creation and
/// closure. These are single-writer operations and take no account lock.
pub struct AccountService {
    repo: Repository,
}

impl AccountService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Register a new account user. Private numbers are unique across users.
    pub async fn create_user(
        &self,
        name: &str,
        private_number: &str,
    ) -> Result<AccountUser, AppError> {
        if name.trim().is_empty() || private_number.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Name and private number must not be empty".to_string(),
            ));
        }

        if self
            .repo
            .get_user_by_private_number(private_number)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicatePrivateNumber(private_number.to_string()));
        }

        Ok(self.repo.save_user(name, private_number).await?)
    }

    /// Open a new account for a user, deriving the next account number from
    /// the highest one in the store.
    pub async fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Amount,
    ) -> Result<Account, AppError> {
        if initial_balance < 0 {
            return Err(AppError::InvalidRequest(
                "Initial balance must be non-negative".to_string(),
            ));
        }

        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let active = self
            .repo
            .count_accounts_by_status(user.id, AccountStatus::Active)
            .await?;
        if active >= MAX_ACCOUNTS_PER_USER {
            return Err(AppError::MaxAccountsPerUser(user.id));
        }

        let account_number = self.next_account_number().await?;
        let account = Account::open(account_number, user.id, initial_balance);
        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Close an account. The account must belong to the user, still be
    /// active, and hold no balance.
    pub async fn close_account(
        &self,
        user_id: UserId,
        account_number: &str,
    ) -> Result<Account, AppError> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let mut account = self
            .repo
            .get_account_for_user(user.id, account_number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(account_number.to_string()))?;

        if account.is_closed() {
            return Err(AppError::AlreadyUnregistered(account_number.to_string()));
        }
        if account.balance != 0 {
            return Err(AppError::ExistsBalance {
                account_number: account_number.to_string(),
                balance: account.balance,
            });
        }
        if account.user_id != user.id {
            return Err(AppError::UserAccountMismatch {
                user_id: user.id,
                account_number: account_number.to_string(),
            });
        }

        account.close();
        self.repo.update_account(&account).await?;
        Ok(account)
    }

    /// List the user's active accounts as {account_number, balance} pairs.
    pub async fn list_active_accounts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AccountSummary>, AppError> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let accounts = self
            .repo
            .list_accounts_by_status(user.id, AccountStatus::Active)
            .await?;
        if accounts.is_empty() {
            return Err(AppError::AccountNotFound(format!(
                "no active accounts for user {user_id}"
            )));
        }

        Ok(accounts
            .into_iter()
            .map(|account| AccountSummary {
                account_number: account.account_number,
                balance: account.balance,
            })
            .collect())
    }

    async fn next_account_number(&self) -> Result<String, AppError> {
        let next = match self.repo.highest_account_number().await? {
            Some(number) => {
                let current: i64 = number.parse().map_err(|_| {
                    AppError::Database(anyhow::anyhow!("Non-numeric account number: {number}"))
                })?;
                current + 1
            }
            None => FIRST_ACCOUNT_NUMBER,
        };
        Ok(next.to_string())
    }
}
