// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use bank_ledger::application::LedgerService;
use bank_ledger::domain::{Account, Caller, Customer};
use bank_ledger::storage::Repository;
use tempfile::TempDir;

pub const JANE_SUBJECT: &str = "11111111-1111-1111-1111-111111111111";
pub const JOHN_SUBJECT: &str = "22222222-2222-2222-2222-222222222222";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// A second connection to the database behind `test_service`, for driving
/// the store directly.
pub async fn test_repository(temp_dir: &TempDir) -> Result<Repository> {
    let db_path = temp_dir.path().join("test.db");
    Repository::connect(&format!("sqlite:{}", db_path.display())).await
}

pub fn jane() -> Caller {
    Caller::new(JANE_SUBJECT).with_username("jane")
}

pub fn john() -> Caller {
    Caller::new(JOHN_SUBJECT).with_username("john")
}

/// Test fixture: two customers, Jane with two EUR accounts and John with one
/// EUR and one USD account.
pub struct Bank {
    pub jane: Customer,
    pub john: Customer,
    /// 100.00, overdraft -200.00
    pub jane_main: Account,
    /// 50.00, no overdraft
    pub jane_savings: Account,
    /// 2000.00, overdraft -150.00
    pub john_main: Account,
    /// 10.00 USD, no overdraft
    pub john_usd: Account,
}

impl Bank {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let jane = service
            .onboard_customer(JANE_SUBJECT, "Jane Smith", "jane@example.com")
            .await?;
        let john = service
            .onboard_customer(JOHN_SUBJECT, "John Doe", "john@example.com")
            .await?;

        let jane_main = service
            .open_account(&self::jane(), "ACC-JANE-001", "EUR", -20_000, 10_000)
            .await?;
        let jane_savings = service
            .open_account(&self::jane(), "ACC-JANE-002", "EUR", 0, 5_000)
            .await?;
        let john_main = service
            .open_account(&self::john(), "ACC-JOHN-001", "EUR", -15_000, 200_000)
            .await?;
        let john_usd = service
            .open_account(&self::john(), "ACC-JOHN-002", "usd", 0, 1_000)
            .await?;

        Ok(Self {
            jane,
            john,
            jane_main,
            jane_savings,
            john_main,
            john_usd,
        })
    }
}

/// Current balance of an account as seen by its owner.
pub async fn balance_of(
    service: &LedgerService,
    caller: &Caller,
    account: &Account,
) -> Result<i64> {
    Ok(service.account_history(caller, account.id).await?.account.balance)
}
