//! Outward-facing views of accounts and transactions.
//!
//! An account lists its transactions and every transaction points back at its
//! account. Views break that cycle: a transaction always embeds the *shallow*
//! view of its account, and only a top-level account view may be *full*.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Account, AccountId, Cents, CustomerId, OperationKind, Transaction, TransactionId};

/// How much of an account to project.
#[derive(Debug, Clone, Copy)]
pub enum Depth<'a> {
    /// Include these transactions, most recent first.
    Full(&'a [Transaction]),
    Shallow,
}

/// The transaction list of an account view. `Shallow` means "not included",
/// which is different from an account that has no transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccountTransactions {
    Full(Vec<TransactionView>),
    Shallow,
}

impl AccountTransactions {
    pub fn is_shallow(&self) -> bool {
        matches!(self, AccountTransactions::Shallow)
    }

    pub fn as_full(&self) -> Option<&[TransactionView]> {
        match self {
            AccountTransactions::Full(views) => Some(views),
            AccountTransactions::Shallow => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub number: String,
    pub balance: Cents,
    pub overdraft_limit: Cents,
    pub currency: String,
    pub customer_id: CustomerId,
    /// Omitted from serialized output when shallow.
    #[serde(skip_serializing_if = "AccountTransactions::is_shallow")]
    pub transactions: AccountTransactions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    pub id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub amount: Cents,
    pub kind: OperationKind,
    pub currency: String,
    pub performed_by: String,
    pub balance_after: Cents,
    /// Always shallow.
    pub account: AccountView,
}

pub fn project_account(account: &Account, depth: Depth<'_>) -> AccountView {
    let transactions = match depth {
        Depth::Full(transactions) => AccountTransactions::Full(
            transactions
                .iter()
                .map(|tx| project_transaction(tx, account))
                .collect(),
        ),
        Depth::Shallow => AccountTransactions::Shallow,
    };

    AccountView {
        id: account.id,
        number: account.number.clone(),
        balance: account.balance,
        overdraft_limit: account.overdraft_limit,
        currency: account.currency.clone(),
        customer_id: account.customer_id,
        transactions,
    }
}

/// Project a transaction together with the account it belongs to.
pub fn project_transaction(tx: &Transaction, account: &Account) -> TransactionView {
    debug_assert_eq!(tx.account_id, account.id, "transaction projected with a foreign account");
    TransactionView {
        id: tx.id,
        timestamp: tx.timestamp,
        amount: tx.amount,
        kind: tx.kind,
        currency: tx.currency.clone(),
        performed_by: tx.performed_by.clone(),
        balance_after: tx.balance_after,
        account: project_account(account, Depth::Shallow),
    }
}
