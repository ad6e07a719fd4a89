use tracing::{debug, info, instrument, warn};

use crate::domain::{
    Account, AccountId, AccountView, Caller, Cents, Customer, CustomerId, Depth, IntegrityReport,
    OperationKind, Transaction, TransactionView, now, project_account, project_transaction,
};
use crate::storage::{Repository, UnitOfWork};

use super::LedgerError;

/// The ledger core: ownership- and overdraft-checked balance mutations plus
/// the read paths over accounts and their history.
///
/// Every operation takes the [`Caller`] explicitly and runs as one unit of
/// work: validation happens before any write, and either all writes of an
/// operation commit or none do. Nothing is retried here.
pub struct LedgerService {
    repo: Repository,
}

/// A committed transaction together with the account it was posted to,
/// as it stood right after the posting.
#[derive(Debug, Clone)]
pub struct Posting {
    pub transaction: Transaction,
    pub account: Account,
}

impl Posting {
    pub fn view(&self) -> TransactionView {
        project_transaction(&self.transaction, &self.account)
    }
}

/// An account and its transactions, most recent first.
#[derive(Debug, Clone)]
pub struct AccountHistory {
    pub account: Account,
    pub transactions: Vec<Transaction>,
}

impl AccountHistory {
    pub fn account_view(&self) -> AccountView {
        project_account(&self.account, Depth::Full(&self.transactions))
    }

    pub fn transaction_views(&self) -> Vec<TransactionView> {
        self.transactions
            .iter()
            .map(|tx| project_transaction(tx, &self.account))
            .collect()
    }
}

impl LedgerService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Customers
    // ========================

    pub async fn onboard_customer(
        &self,
        external_id: &str,
        name: &str,
        email: &str,
    ) -> Result<Customer, LedgerError> {
        let (external_id, name, email) = (external_id.trim(), name.trim(), email.trim());
        if external_id.is_empty() {
            return Err(LedgerError::invalid("external identity is required"));
        }
        if name.is_empty() {
            return Err(LedgerError::invalid("name is required"));
        }
        if !email.contains('@') {
            return Err(LedgerError::invalid("email is invalid"));
        }
        if self
            .repo
            .find_customer_by_external_id(external_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::invalid("customer already onboarded"));
        }

        let customer = Customer::new(external_id, name, email);
        self.repo.save_customer(&customer).await?;
        info!(customer = %customer.id, "customer onboarded");
        Ok(customer)
    }

    /// Resolve the caller to the customer it authenticates as.
    pub async fn current_customer(&self, caller: &Caller) -> Result<Customer, LedgerError> {
        self.repo
            .find_customer_by_external_id(&caller.subject)
            .await?
            .ok_or_else(|| LedgerError::not_found("customer not found"))
    }

    pub async fn customer(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("customer not found"))
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, LedgerError> {
        Ok(self.repo.list_customers().await?)
    }

    // ========================
    // Accounts
    // ========================

    /// Open an account for the calling customer. No transaction is recorded
    /// for the opening balance.
    pub async fn open_account(
        &self,
        caller: &Caller,
        number: &str,
        currency: &str,
        overdraft_limit: Cents,
        opening_balance: Cents,
    ) -> Result<Account, LedgerError> {
        let customer = self.current_customer(caller).await?;

        let number = number.trim();
        if number.is_empty() {
            return Err(LedgerError::invalid("account number is required"));
        }
        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::invalid("currency must be a three-letter code"));
        }
        if overdraft_limit > 0 {
            return Err(LedgerError::invalid("overdraft limit must not be positive"));
        }
        if opening_balance < overdraft_limit {
            return Err(LedgerError::invalid(
                "opening balance would exceed overdraft limit",
            ));
        }
        if self.repo.find_account_by_number(number).await?.is_some() {
            return Err(LedgerError::invalid("account number already in use"));
        }

        let account = Account::new(number, currency, customer.id)
            .with_balance(opening_balance)
            .with_overdraft_limit(overdraft_limit);
        self.repo.save_account(&account).await?;
        info!(account = %account.id, customer = %customer.id, "account opened");
        Ok(account)
    }

    /// Look up an account by its human-readable number.
    pub async fn account_id_by_number(
        &self,
        number: &str,
    ) -> Result<Option<AccountId>, LedgerError> {
        Ok(self
            .repo
            .find_account_by_number(number.trim())
            .await?
            .map(|account| account.id))
    }

    /// All accounts of `customer_id`, which must be the caller's own customer.
    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn accounts_of(
        &self,
        caller: &Caller,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, LedgerError> {
        let customer = self.current_customer(caller).await?;
        if customer.id != customer_id {
            warn!(
                customer = %customer.id,
                requested = %customer_id,
                "listing another customer's accounts denied"
            );
            return Err(LedgerError::AccessDenied);
        }

        let accounts = self.repo.find_accounts_by_customer(customer_id).await?;
        debug!(count = accounts.len(), "accounts listed");
        Ok(accounts)
    }

    /// Transactions of an account owned by the caller, most recent first.
    ///
    /// A missing account is reported as access denied, same as someone
    /// else's account.
    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn transactions_of(
        &self,
        caller: &Caller,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let customer = self.current_customer(caller).await?;
        if !self
            .repo
            .exists_account_owned_by(account_id, customer.id)
            .await?
        {
            warn!(customer = %customer.id, "history of unowned account denied");
            return Err(LedgerError::AccessDenied);
        }

        let transactions = self.repo.find_transactions_by_account(account_id).await?;
        debug!(count = transactions.len(), "transactions listed");
        Ok(transactions)
    }

    /// Like [`transactions_of`](Self::transactions_of), bundled with the
    /// account so either projection can be built. Read in one unit of work.
    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn account_history(
        &self,
        caller: &Caller,
        account_id: AccountId,
    ) -> Result<AccountHistory, LedgerError> {
        let customer = self.current_customer(caller).await?;
        let mut uow = self.repo.begin().await?;

        let account = match uow.get_account(account_id).await? {
            Some(account) if account.is_owned_by(customer.id) => account,
            _ => {
                warn!(customer = %customer.id, "history of unowned account denied");
                return Err(LedgerError::AccessDenied);
            }
        };
        let transactions = uow.find_transactions_by_account(account_id).await?;
        uow.commit().await?;

        Ok(AccountHistory {
            account,
            transactions,
        })
    }

    // ========================
    // Ledger operations
    // ========================

    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn deposit(
        &self,
        caller: &Caller,
        account_id: AccountId,
        amount: Cents,
        performed_by: &str,
    ) -> Result<Posting, LedgerError> {
        let customer = self.current_customer(caller).await?;
        let mut uow = self.repo.begin().await?;

        let mut account =
            load_owned_account(&mut uow, &customer, account_id, "account not found").await?;
        require_positive(amount)?;
        if !account.can_credit(amount) {
            return Err(LedgerError::invalid("amount is out of range"));
        }

        let previous = account.balance;
        account.credit(amount);
        let transaction = Transaction::posted(
            &account,
            OperationKind::Deposit,
            amount,
            performed_by,
            now(),
        );

        uow.save_posting(&account, previous, &transaction).await?;
        uow.commit().await?;

        info!(account = %account.id, amount, balance_after = account.balance, "deposit committed");
        Ok(Posting {
            transaction,
            account,
        })
    }

    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn withdraw(
        &self,
        caller: &Caller,
        account_id: AccountId,
        amount: Cents,
        performed_by: &str,
    ) -> Result<Posting, LedgerError> {
        let customer = self.current_customer(caller).await?;
        let mut uow = self.repo.begin().await?;

        let mut account =
            load_owned_account(&mut uow, &customer, account_id, "account not found").await?;
        require_positive(amount)?;
        if !account.can_debit(amount) {
            return Err(LedgerError::invalid(
                "withdrawal would exceed overdraft limit",
            ));
        }

        let previous = account.balance;
        account.debit(amount);
        let transaction = Transaction::posted(
            &account,
            OperationKind::Withdrawal,
            amount,
            performed_by,
            now(),
        );

        uow.save_posting(&account, previous, &transaction).await?;
        uow.commit().await?;

        info!(
            account = %account.id,
            amount,
            balance_after = account.balance,
            "withdrawal committed"
        );
        Ok(Posting {
            transaction,
            account,
        })
    }

    /// Move `amount` from one of the caller's accounts into any existing
    /// account. Returns the postings in `[debit, credit]` order.
    ///
    /// The destination's owner and overdraft limit are not checked.
    #[instrument(skip(self, caller), fields(caller = %caller.subject))]
    pub async fn transfer(
        &self,
        caller: &Caller,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Cents,
        performed_by: &str,
    ) -> Result<Vec<Posting>, LedgerError> {
        let customer = self.current_customer(caller).await?;
        let mut uow = self.repo.begin().await?;

        let mut from =
            load_owned_account(&mut uow, &customer, from_account_id, "from account not found")
                .await?;
        require_positive(amount)?;
        let mut to = uow
            .get_account(to_account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("to account not found"))?;

        if from.id == to.id {
            return Err(LedgerError::invalid("cannot transfer to the same account"));
        }
        if from.currency != to.currency {
            return Err(LedgerError::invalid(format!(
                "currency mismatch: {} vs {}",
                from.currency, to.currency
            )));
        }
        if !from.can_debit(amount) {
            return Err(LedgerError::invalid("transfer would exceed overdraft limit"));
        }
        if !to.can_credit(amount) {
            return Err(LedgerError::invalid("amount is out of range"));
        }

        let (from_previous, to_previous) = (from.balance, to.balance);
        from.debit(amount);
        to.credit(amount);

        let timestamp = now();
        let debit =
            Transaction::posted(&from, OperationKind::Transfer, amount, performed_by, timestamp);
        let credit =
            Transaction::posted(&to, OperationKind::Transfer, amount, performed_by, timestamp);

        uow.save_transfer((&from, from_previous), (&to, to_previous), &debit, &credit)
            .await?;
        uow.commit().await?;

        info!(
            from = %from.id,
            to = %to.id,
            amount,
            from_balance = from.balance,
            to_balance = to.balance,
            "transfer committed"
        );
        Ok(vec![
            Posting {
                transaction: debit,
                account: from,
            },
            Posting {
                transaction: credit,
                account: to,
            },
        ])
    }

    // ========================
    // Integrity
    // ========================

    /// Audit every account against its own history. Read-only.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, LedgerError> {
        let mut report = IntegrityReport::default();
        for account in self.repo.list_accounts().await? {
            let history = self.repo.find_transactions_by_account(account.id).await?;
            report.record(&account, &history);
        }
        Ok(report)
    }
}

/// Load an account inside `uow` and check that `customer` owns it.
async fn load_owned_account(
    uow: &mut UnitOfWork,
    customer: &Customer,
    account_id: AccountId,
    missing: &str,
) -> Result<Account, LedgerError> {
    let account = uow
        .get_account(account_id)
        .await?
        .ok_or_else(|| LedgerError::not_found(missing))?;

    if !account.is_owned_by(customer.id) {
        warn!(
            account = %account_id,
            customer = %customer.id,
            "account does not belong to the caller"
        );
        return Err(LedgerError::AccessDenied);
    }
    Ok(account)
}

fn require_positive(amount: Cents) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::invalid("amount must be positive"));
    }
    Ok(())
}
