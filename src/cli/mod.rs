use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{AccountService, TransactionService};
use crate::domain::Amount;
use crate::lock::KeyedAccountLock;
use crate::storage::Repository;

/// Kassa - lock-guarded account and transaction ledger
#[derive(Parser)]
#[command(name = "kassa")]
#[command(about = "A bank-style account ledger with lock-guarded balance mutations")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "kassa.db")]
    pub database: String,

    /// Print results as JSON instead of text
    #[arg(short, long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Register a new account user
    CreateUser {
        /// Display name
        name: String,

        /// Unique private identifying number
        #[arg(long)]
        private_number: String,
    },

    /// Open a new account for a user
    CreateAccount {
        /// Owning user id
        user_id: i64,

        /// Initial balance in the smallest currency unit
        #[arg(long, default_value = "0")]
        initial_balance: Amount,
    },

    /// Close an account (requires zero balance)
    CloseAccount {
        /// Owning user id
        user_id: i64,

        /// Account number to close
        account_number: String,
    },

    /// List a user's active accounts
    Accounts {
        /// User id
        user_id: i64,
    },

    /// Use balance from an account
    Use {
        /// Owning user id
        user_id: i64,

        /// Account number to debit
        account_number: String,

        /// Amount in the smallest currency unit
        amount: Amount,
    },

    /// Cancel a previous use in full
    Cancel {
        /// Transaction id of the use to reverse
        transaction_id: String,

        /// Account the original transaction occurred on
        account_number: String,

        /// Amount of the original transaction (full cancellation only)
        amount: Amount,
    },

    /// Show a recorded transaction
    Transaction {
        /// Transaction id
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                let db_url = format!("sqlite:{}?mode=rwc", self.database);
                Repository::init(&db_url).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::CreateUser {
                name,
                private_number,
            } => {
                let service = AccountService::new(self.repository().await?);
                let user = service.create_user(name, private_number).await?;
                if self.json {
                    print_json(&user)?;
                } else {
                    println!("Created user {} ({})", user.name, user.id);
                }
            }

            Commands::CreateAccount {
                user_id,
                initial_balance,
            } => {
                let service = AccountService::new(self.repository().await?);
                let account = service.create_account(*user_id, *initial_balance).await?;
                if self.json {
                    print_json(&account)?;
                } else {
                    println!(
                        "Opened account {} for user {} with balance {}",
                        account.account_number, account.user_id, account.balance
                    );
                }
            }

            Commands::CloseAccount {
                user_id,
                account_number,
            } => {
                let service = AccountService::new(self.repository().await?);
                let account = service.close_account(*user_id, account_number).await?;
                if self.json {
                    print_json(&account)?;
                } else {
                    println!("Closed account {}", account.account_number);
                }
            }

            Commands::Accounts { user_id } => {
                let service = AccountService::new(self.repository().await?);
                let accounts = service.list_active_accounts(*user_id).await?;
                if self.json {
                    print_json(&accounts)?;
                } else {
                    println!("{:<14} {:>12}", "ACCOUNT", "BALANCE");
                    println!("{}", "-".repeat(27));
                    for account in accounts {
                        println!("{:<14} {:>12}", account.account_number, account.balance);
                    }
                }
            }

            Commands::Use {
                user_id,
                account_number,
                amount,
            } => {
                let service = self.transaction_service().await?;
                let result = service
                    .use_balance(*user_id, account_number, *amount)
                    .await?;
                if self.json {
                    print_json(&result)?;
                } else {
                    println!(
                        "Used {} from account {} (transaction {}), balance now {}",
                        result.amount,
                        result.account_number,
                        result.transaction_id,
                        result.balance_snapshot
                    );
                }
            }

            Commands::Cancel {
                transaction_id,
                account_number,
                amount,
            } => {
                let transaction_id = Uuid::parse_str(transaction_id)
                    .context("Invalid transaction ID format (expected UUID)")?;
                let service = self.transaction_service().await?;
                let result = service
                    .cancel_balance(transaction_id, account_number, *amount)
                    .await?;
                if self.json {
                    print_json(&result)?;
                } else {
                    println!(
                        "Cancelled {} on account {} (transaction {}), balance now {}",
                        result.amount,
                        result.account_number,
                        result.transaction_id,
                        result.balance_snapshot
                    );
                }
            }

            Commands::Transaction { id } => {
                let transaction_id =
                    Uuid::parse_str(id).context("Invalid transaction ID format (expected UUID)")?;
                let service = self.transaction_service().await?;
                let details = service.query_transaction(transaction_id).await?;
                if self.json {
                    print_json(&details)?;
                } else {
                    println!("Transaction {}", details.transaction_id);
                    println!("  account:     {}", details.account_number);
                    println!("  type:        {}", details.transaction_type);
                    println!("  result:      {}", details.transaction_result);
                    println!("  amount:      {}", details.amount);
                    println!("  transacted:  {}", details.transacted_at.to_rfc3339());
                }
            }
        }

        Ok(())
    }

    async fn repository(&self) -> Result<Repository> {
        let db_url = format!("sqlite:{}", self.database);
        Repository::connect(&db_url).await
    }

    async fn transaction_service(&self) -> Result<TransactionService<KeyedAccountLock>> {
        let repo = self.repository().await?;
        Ok(TransactionService::new(repo, KeyedAccountLock::new()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
