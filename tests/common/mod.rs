// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use kassa::application::{AccountService, TransactionService};
use kassa::domain::Amount;
use kassa::lock::KeyedAccountLock;
use kassa::storage::Repository;
use tempfile::TempDir;

/// Services wired to a shared temporary database.
pub struct TestContext {
    pub repo: Repository,
    pub accounts: AccountService,
    pub transactions: TransactionService<Arc<KeyedAccountLock>>,
    pub lock: Arc<KeyedAccountLock>,
}

/// Helper to create test services backed by a temporary database.
pub async fn test_context() -> Result<(TestContext, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());
    let repo = Repository::init(&db_url).await?;

    let lock = Arc::new(KeyedAccountLock::new());
    let ctx = TestContext {
        repo: repo.clone(),
        accounts: AccountService::new(repo.clone()),
        transactions: TransactionService::new(repo, lock.clone()),
        lock,
    };
    Ok((ctx, temp_dir))
}

/// Create a user with the given private number and one account holding
/// `balance`. Returns (user_id, account_number).
pub async fn funded_account(
    ctx: &TestContext,
    private_number: &str,
    balance: Amount,
) -> Result<(i64, String)> {
    let user = ctx.accounts.create_user("tester", private_number).await?;
    let account = ctx.accounts.create_account(user.id, balance).await?;
    Ok((user.id, account.account_number))
}
