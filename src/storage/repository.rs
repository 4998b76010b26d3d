use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountStatus, AccountUser, Transaction, TransactionId, TransactionResult,
    TransactionType, UserId,
};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying users, accounts and transactions.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Insert a new user and return it with its store-assigned id.
    pub async fn save_user(&self, name: &str, private_number: &str) -> Result<AccountUser> {
        let registered_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, private_number, registered_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(private_number)
        .bind(registered_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;

        Ok(AccountUser {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            private_number: private_number.to_string(),
            registered_at,
        })
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: UserId) -> Result<Option<AccountUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, private_number, registered_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a user by private identifying number.
    pub async fn get_user_by_private_number(
        &self,
        private_number: &str,
    ) -> Result<Option<AccountUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, private_number, registered_at
            FROM users
            WHERE private_number = ?
            "#,
        )
        .bind(private_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by private number")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<AccountUser> {
        let registered_at_str: String = row.get("registered_at");

        Ok(AccountUser {
            id: row.get("id"),
            name: row.get("name"),
            private_number: row.get("private_number"),
            registered_at: DateTime::parse_from_rfc3339(&registered_at_str)
                .context("Invalid registered_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_number, user_id, status, balance, registered_at, closed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.account_number)
        .bind(account.user_id)
        .bind(account.status.as_str())
        .bind(account.balance)
        .bind(account.registered_at.to_rfc3339())
        .bind(account.closed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Persist the mutable fields of an existing account.
    pub async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET status = ?, balance = ?, closed_at = ?
            WHERE account_number = ?
            "#,
        )
        .bind(account.status.as_str())
        .bind(account.balance)
        .bind(account.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(&account.account_number)
        .execute(&self.pool)
        .await
        .context("Failed to update account")?;
        Ok(())
    }

    /// Get an account by account number.
    pub async fn get_account(&self, account_number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT account_number, user_id, status, balance, registered_at, closed_at
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by owner and account number.
    pub async fn get_account_for_user(
        &self,
        user_id: UserId,
        account_number: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT account_number, user_id, status, balance, registered_at, closed_at
            FROM accounts
            WHERE user_id = ? AND account_number = ?
            "#,
        )
        .bind(user_id)
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account for user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List a user's accounts with the given status, ordered by account number.
    pub async fn list_accounts_by_status(
        &self,
        user_id: UserId,
        status: AccountStatus,
    ) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT account_number, user_id, status, balance, registered_at, closed_at
            FROM accounts
            WHERE user_id = ? AND status = ?
            ORDER BY CAST(account_number AS INTEGER)
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Count a user's accounts with the given status.
    pub async fn count_accounts_by_status(
        &self,
        user_id: UserId,
        status: AccountStatus,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM accounts
            WHERE user_id = ? AND status = ?
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count accounts")?;

        Ok(row.get("count"))
    }

    /// Get the numerically highest account number across all accounts, if any.
    pub async fn highest_account_number(&self) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT account_number
            FROM accounts
            ORDER BY CAST(account_number AS INTEGER) DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch highest account number")?;

        Ok(row.map(|r| r.get("account_number")))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let status_str: String = row.get("status");
        let registered_at_str: String = row.get("registered_at");
        let closed_at_str: Option<String> = row.get("closed_at");

        Ok(Account {
            account_number: row.get("account_number"),
            user_id: row.get("user_id"),
            status: AccountStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            balance: row.get("balance"),
            registered_at: DateTime::parse_from_rfc3339(&registered_at_str)
                .context("Invalid registered_at timestamp")?
                .with_timezone(&Utc),
            closed_at: closed_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid closed_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a transaction to the ledger. Insert only; there is no update
    /// or delete path for transactions.
    pub async fn save_transaction(&self, tx: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_number, transaction_type, result, amount, balance_snapshot, reverses, transacted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.id.to_string())
        .bind(&tx.account_number)
        .bind(tx.transaction_type.as_str())
        .bind(tx.result.as_str())
        .bind(tx.amount)
        .bind(tx.balance_snapshot)
        .bind(tx.reverses.map(|id| id.to_string()))
        .bind(tx.transacted_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_number, transaction_type, result, amount, balance_snapshot, reverses, transacted_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List all transactions recorded against an account, oldest first.
    pub async fn list_transactions_for_account(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_number, transaction_type, result, amount, balance_snapshot, reverses, transacted_at
            FROM transactions
            WHERE account_number = ?
            ORDER BY transacted_at
            "#,
        )
        .bind(account_number)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("transaction_type");
        let result_str: String = row.get("result");
        let reverses_str: Option<String> = row.get("reverses");
        let transacted_at_str: String = row.get("transacted_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            account_number: row.get("account_number"),
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            result: TransactionResult::from_str(&result_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction result: {}", result_str))?,
            amount: row.get("amount"),
            balance_snapshot: row.get("balance_snapshot"),
            reverses: reverses_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid reverses ID")?,
            transacted_at: DateTime::parse_from_rfc3339(&transacted_at_str)
                .context("Invalid transacted_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
