use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{LedgerService, Posting};
use crate::domain::{
    AccountId, AccountView, Caller, CustomerView, Depth, TransactionView, format_cents,
    parse_cents, project_account,
};

/// Bank Ledger - customer accounts with overdraft limits
#[derive(Parser)]
#[command(name = "bank-ledger")]
#[command(about = "Deposit, withdraw and transfer between overdraft-limited accounts")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BANK_LEDGER_DB", default_value = "bank-ledger.db", global = true)]
    pub database: String,

    /// External identity of the calling customer
    #[arg(long = "as", env = "BANK_LEDGER_CALLER", global = true)]
    pub caller: Option<String>,

    /// Preferred username, recorded as the performer of operations
    #[arg(long, env = "BANK_LEDGER_USERNAME", global = true)]
    pub username: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into one of your accounts
    Deposit {
        /// Account ID or number
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw money from one of your accounts
    Withdraw {
        /// Account ID or number
        account: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer money from one of your accounts to any account
    Transfer {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID or number (must be yours)
        #[arg(long)]
        from: String,

        /// Destination account ID or number
        #[arg(long)]
        to: String,
    },

    /// Show the transactions of one of your accounts, most recent first
    History {
        /// Account ID or number
        account: String,
    },

    /// Verify that balances agree with the transaction log
    Check,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Onboard a new customer
    Onboard {
        /// External identity (token subject) of the customer
        external_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// List all customers
    List,

    /// Show the customer you are acting as
    Me,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open an account for the calling customer
    Open {
        /// Account number (must be unique)
        number: String,

        /// Currency code (e.g., EUR, USD)
        #[arg(short, long, default_value = "EUR")]
        currency: String,

        /// Lowest allowed balance, zero or negative (e.g., "-200")
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        overdraft_limit: String,

        /// Opening balance
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
    },

    /// List accounts of a customer (defaults to the caller)
    List {
        /// Customer ID
        #[arg(long)]
        customer: Option<Uuid>,

        /// Include each account's transactions
        #[arg(long)]
        full: bool,
    },

    /// Show one account with its transactions
    Show {
        /// Account ID or number
        account: String,
    },
}

impl Cli {
    fn caller(&self) -> Result<Caller> {
        let subject = self
            .caller
            .clone()
            .ok_or_else(|| anyhow!("No caller identity. Pass --as or set BANK_LEDGER_CALLER"))?;
        let caller = Caller::new(subject);
        Ok(match &self.username {
            Some(username) => caller.with_username(username.clone()),
            None => caller,
        })
    }

    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Init) {
            LedgerService::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect(&self.database).await?;
        let out = Output { json: self.json };

        match &self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Customer(cmd) => run_customer_command(&self, &service, &out, cmd).await?,

            Commands::Account(cmd) => run_account_command(&self, &service, &out, cmd).await?,

            Commands::Deposit { account, amount } => {
                let caller = self.caller()?;
                let account_id = resolve_account(&service, account, "account not found").await?;
                let amount = parse_amount(amount)?;
                let posting = service
                    .deposit(&caller, account_id, amount, caller.performer())
                    .await?;
                out.postings(&[posting])?;
            }

            Commands::Withdraw { account, amount } => {
                let caller = self.caller()?;
                let account_id = resolve_account(&service, account, "account not found").await?;
                let amount = parse_amount(amount)?;
                let posting = service
                    .withdraw(&caller, account_id, amount, caller.performer())
                    .await?;
                out.postings(&[posting])?;
            }

            Commands::Transfer { amount, from, to } => {
                let caller = self.caller()?;
                let from_id = resolve_account(&service, from, "from account not found").await?;
                let to_id = resolve_account(&service, to, "to account not found").await?;
                let amount = parse_amount(amount)?;
                let postings = service
                    .transfer(&caller, from_id, to_id, amount, caller.performer())
                    .await?;
                out.postings(&postings)?;
            }

            Commands::History { account } => {
                let caller = self.caller()?;
                let account_id = resolve_account(&service, account, "account not found").await?;
                let history = service.account_history(&caller, account_id).await?;
                out.transactions(&history.transaction_views())?;
            }

            Commands::Check => {
                let report = service.check_integrity().await?;
                if out.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("Accounts:     {}", report.account_count);
                    println!("Transactions: {}", report.transaction_count);
                    println!();
                    if report.is_healthy() {
                        println!("Ledger is consistent.");
                    } else {
                        println!("Issues found:");
                        for issue in &report.issues {
                            println!("  - {}", issue);
                        }
                    }
                }
                if !report.is_healthy() {
                    bail!("Ledger integrity check failed");
                }
            }
        }

        Ok(())
    }
}

async fn run_customer_command(
    cli: &Cli,
    service: &LedgerService,
    out: &Output,
    cmd: &CustomerCommands,
) -> Result<()> {
    match cmd {
        CustomerCommands::Onboard {
            external_id,
            name,
            email,
        } => {
            let customer = service.onboard_customer(external_id, name, email).await?;
            out.customers(&[CustomerView::from(&customer)])?;
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            let views: Vec<CustomerView> = customers.iter().map(CustomerView::from).collect();
            out.customers(&views)?;
        }

        CustomerCommands::Me => {
            let customer = service.current_customer(&cli.caller()?).await?;
            out.customers(&[CustomerView::from(&customer)])?;
        }
    }
    Ok(())
}

async fn run_account_command(
    cli: &Cli,
    service: &LedgerService,
    out: &Output,
    cmd: &AccountCommands,
) -> Result<()> {
    let caller = cli.caller()?;

    match cmd {
        AccountCommands::Open {
            number,
            currency,
            overdraft_limit,
            balance,
        } => {
            let overdraft_limit = parse_cents(overdraft_limit)
                .context("Invalid overdraft limit. Use '-200.00' or '-200'")?;
            let balance =
                parse_cents(balance).context("Invalid balance. Use '50.00' or '50'")?;
            let account = service
                .open_account(&caller, number, currency, overdraft_limit, balance)
                .await?;
            out.accounts(&[project_account(&account, Depth::Shallow)])?;
        }

        AccountCommands::List { customer, full } => {
            let customer_id = match customer {
                Some(id) => *id,
                None => service.current_customer(&caller).await?.id,
            };
            let accounts = service.accounts_of(&caller, customer_id).await?;

            let mut views = Vec::with_capacity(accounts.len());
            for account in &accounts {
                views.push(if *full {
                    service.account_history(&caller, account.id).await?.account_view()
                } else {
                    project_account(account, Depth::Shallow)
                });
            }
            out.accounts(&views)?;
        }

        AccountCommands::Show { account } => {
            let account_id = resolve_account(service, account, "account not found").await?;
            let history = service.account_history(&caller, account_id).await?;
            let view = history.account_view();
            out.accounts(std::slice::from_ref(&view))?;
            if !out.json {
                println!();
                out.transactions(&history.transaction_views())?;
            }
        }
    }
    Ok(())
}

/// Accept either an account UUID or an account number.
async fn resolve_account(
    service: &LedgerService,
    reference: &str,
    missing: &str,
) -> Result<AccountId> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }
    service
        .account_id_by_number(reference)
        .await?
        .ok_or_else(|| anyhow!("{}", missing))
}

fn parse_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn customers(&self, customers: &[CustomerView]) -> Result<()> {
        if self.json {
            return self.print_json(customers);
        }
        println!("{:<36}  {:<20}  {}", "ID", "NAME", "EMAIL");
        println!("{}", "-".repeat(80));
        for c in customers {
            println!("{:<36}  {:<20}  {}", c.id, truncate(&c.name, 20), c.email);
        }
        Ok(())
    }

    fn accounts(&self, accounts: &[AccountView]) -> Result<()> {
        if self.json {
            return self.print_json(accounts);
        }
        println!(
            "{:<36}  {:<16} {:>14} {:>12}  {:<4} {:>4}",
            "ID", "NUMBER", "BALANCE", "OVERDRAFT", "CCY", "TXS"
        );
        println!("{}", "-".repeat(94));
        for a in accounts {
            let txs = match a.transactions.as_full() {
                Some(list) => list.len().to_string(),
                None => "-".to_string(),
            };
            println!(
                "{:<36}  {:<16} {:>14} {:>12}  {:<4} {:>4}",
                a.id,
                truncate(&a.number, 16),
                format_cents(a.balance),
                format_cents(a.overdraft_limit),
                a.currency,
                txs
            );
        }
        Ok(())
    }

    fn transactions(&self, transactions: &[TransactionView]) -> Result<()> {
        if self.json {
            return self.print_json(transactions);
        }
        if transactions.is_empty() {
            println!("No transactions.");
            return Ok(());
        }
        println!(
            "{:<20} {:<16} {:<10} {:>12} {:>14}  {}",
            "DATE", "ACCOUNT", "KIND", "AMOUNT", "BALANCE", "BY"
        );
        println!("{}", "-".repeat(92));
        for tx in transactions {
            println!(
                "{:<20} {:<16} {:<10} {:>12} {:>14}  {}",
                tx.timestamp.format("%Y-%m-%d %H:%M:%S"),
                truncate(&tx.account.number, 16),
                tx.kind,
                format_cents(tx.amount),
                format_cents(tx.balance_after),
                truncate(&tx.performed_by, 20)
            );
        }
        Ok(())
    }

    fn postings(&self, postings: &[Posting]) -> Result<()> {
        let views: Vec<TransactionView> = postings.iter().map(Posting::view).collect();
        self.transactions(&views)
    }
}
