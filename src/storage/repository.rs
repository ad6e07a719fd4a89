use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Row, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::domain::{Account, AccountId, Cents, Customer, CustomerId, OperationKind, Transaction};

use super::MIGRATION_001_INITIAL;

const CUSTOMER_COLUMNS: &str = "id, external_id, name, email, created_at";
const ACCOUNT_COLUMNS: &str =
    "id, number, balance, overdraft_limit, currency, customer_id, created_at";
const TRANSACTION_COLUMNS: &str =
    "id, timestamp, amount, kind, currency, performed_by, balance_after, account_id";

/// Persistence for customers, accounts and transactions.
///
/// Plain methods run against the pool and see committed data only. Anything
/// that mutates a balance goes through a [`UnitOfWork`] from [`Repository::begin`].
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open an atomic unit of work. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(UnitOfWork { tx })
    }

    // ========================
    // Customers
    // ========================

    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, external_id, name, email, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.external_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(encode_timestamp(customer.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        row.as_ref().map(row_to_customer).transpose()
    }

    pub async fn find_customer_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE external_id = ?"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer by external id")?;

        row.as_ref().map(row_to_customer).transpose()
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list customers")?;

        rows.iter().map(row_to_customer).collect()
    }

    // ========================
    // Accounts
    // ========================

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, number, balance, overdraft_limit, currency, customer_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.number)
        .bind(account.balance)
        .bind(account.overdraft_limit)
        .bind(&account.currency)
        .bind(account.customer_id.to_string())
        .bind(encode_timestamp(account.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn find_account_by_number(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE number = ?"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        row.as_ref().map(row_to_account).transpose()
    }

    pub async fn find_accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE customer_id = ? ORDER BY number"
        ))
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for customer")?;

        rows.iter().map(row_to_account).collect()
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY number"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(row_to_account).collect()
    }

    pub async fn exists_account_owned_by(
        &self,
        account_id: AccountId,
        customer_id: CustomerId,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ? AND customer_id = ?) AS owned
            "#,
        )
        .bind(account_id.to_string())
        .bind(customer_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check account ownership")?;

        Ok(row.get::<i64, _>("owned") != 0)
    }

    // ========================
    // Transactions
    // ========================

    /// Transactions of one account, most recent first.
    pub async fn find_transactions_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        fetch_transactions_by_account(&self.pool, account_id).await
    }
}

/// One atomic read-modify-write against the store.
///
/// Balance writes are compare-and-set against the balance the caller read:
/// if another writer committed in between, the write affects no row and the
/// whole unit fails instead of losing that update.
pub struct UnitOfWork {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    pub async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>> {
        fetch_account(&mut *self.tx, id).await
    }

    pub async fn find_transactions_by_account(
        &mut self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        fetch_transactions_by_account(&mut *self.tx, account_id).await
    }

    /// Persist a single-account posting: the updated account and its new transaction.
    pub async fn save_posting(
        &mut self,
        account: &Account,
        previous_balance: Cents,
        transaction: &Transaction,
    ) -> Result<()> {
        self.update_balance(account, previous_balance).await?;
        self.insert_transaction(transaction).await
    }

    /// Persist both sides of a transfer.
    pub async fn save_transfer(
        &mut self,
        (from, from_previous): (&Account, Cents),
        (to, to_previous): (&Account, Cents),
        debit: &Transaction,
        credit: &Transaction,
    ) -> Result<()> {
        self.update_balance(from, from_previous).await?;
        self.update_balance(to, to_previous).await?;
        self.insert_transaction(debit).await?;
        self.insert_transaction(credit).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")
    }

    async fn update_balance(&mut self, account: &Account, previous_balance: Cents) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = ?
            WHERE id = ? AND balance = ?
            "#,
        )
        .bind(account.balance)
        .bind(account.id.to_string())
        .bind(previous_balance)
        .execute(&mut *self.tx)
        .await
        .context("Failed to update account balance")?;

        if result.rows_affected() != 1 {
            bail!("Concurrent modification of account {}", account.number);
        }
        Ok(())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, timestamp, amount, kind, currency, performed_by, balance_after, account_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(encode_timestamp(transaction.timestamp))
        .bind(transaction.amount)
        .bind(transaction.kind.as_str())
        .bind(&transaction.currency)
        .bind(&transaction.performed_by)
        .bind(transaction.balance_after)
        .bind(transaction.account_id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }
}

async fn fetch_account<'e>(
    executor: impl SqliteExecutor<'e>,
    id: AccountId,
) -> Result<Option<Account>> {
    let row = sqlx::query(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

async fn fetch_transactions_by_account<'e>(
    executor: impl SqliteExecutor<'e>,
    account_id: AccountId,
) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions
        WHERE account_id = ?
        ORDER BY timestamp DESC, rowid DESC
        "#
    ))
    .bind(account_id.to_string())
    .fetch_all(executor)
    .await
    .context("Failed to list transactions for account")?;

    rows.iter().map(row_to_transaction).collect()
}

/// Fixed-width UTC timestamps so that SQL text ordering is chronological.
fn encode_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(s: &str, what: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid {what} timestamp"))?
        .with_timezone(&Utc))
}

fn decode_id(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid {what} ID"))
}

fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
    let id_str: String = row.get("id");
    let created_at_str: String = row.get("created_at");

    Ok(Customer {
        id: decode_id(&id_str, "customer")?,
        external_id: row.get("external_id"),
        name: row.get("name"),
        email: row.get("email"),
        created_at: decode_timestamp(&created_at_str, "created_at")?,
    })
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let id_str: String = row.get("id");
    let customer_id_str: String = row.get("customer_id");
    let created_at_str: String = row.get("created_at");

    Ok(Account {
        id: decode_id(&id_str, "account")?,
        number: row.get("number"),
        balance: row.get("balance"),
        overdraft_limit: row.get("overdraft_limit"),
        currency: row.get("currency"),
        customer_id: decode_id(&customer_id_str, "customer")?,
        created_at: decode_timestamp(&created_at_str, "created_at")?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let id_str: String = row.get("id");
    let account_id_str: String = row.get("account_id");
    let timestamp_str: String = row.get("timestamp");
    let kind_str: String = row.get("kind");

    Ok(Transaction {
        id: decode_id(&id_str, "transaction")?,
        timestamp: decode_timestamp(&timestamp_str, "transaction")?,
        amount: row.get("amount"),
        kind: OperationKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid operation kind: {}", kind_str))?,
        currency: row.get("currency"),
        performed_by: row.get("performed_by"),
        balance_after: row.get("balance_after"),
        account_id: decode_id(&account_id_str, "account")?,
    })
}
