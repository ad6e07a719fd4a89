use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Account, AccountId, Cents};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Deposit,
    Withdrawal,
    /// Both legs of a transfer carry this kind.
    Transfer,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdrawal => "WITHDRAWAL",
            OperationKind::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEPOSIT" => Some(OperationKind::Deposit),
            "WITHDRAWAL" => Some(OperationKind::Withdrawal),
            "TRANSFER" => Some(OperationKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One balance-changing event on one account.
/// Transactions are append-only: never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub timestamp: DateTime<Utc>,
    /// Always positive; the direction comes from `kind` (and, for transfers,
    /// from which leg this is).
    pub amount: Cents,
    pub kind: OperationKind,
    /// Copied from the account at posting time.
    pub currency: String,
    pub performed_by: String,
    /// The account balance immediately after this transaction.
    pub balance_after: Cents,
    pub account_id: AccountId,
}

impl Transaction {
    /// Record a posting against `account`, whose balance must already reflect it.
    pub fn posted(
        account: &Account,
        kind: OperationKind,
        amount: Cents,
        performed_by: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        debug_assert!(amount > 0, "transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            timestamp,
            amount,
            kind,
            currency: account.currency.clone(),
            performed_by: performed_by.into(),
            balance_after: account.balance,
            account_id: account.id,
        }
    }
}
