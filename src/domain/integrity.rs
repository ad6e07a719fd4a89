use serde::Serialize;

use super::{Account, AccountId, Cents, Transaction};

/// A single consistency violation found while auditing an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IntegrityIssue {
    BelowOverdraftLimit {
        account: String,
        balance: Cents,
        overdraft_limit: Cents,
    },
    BalanceMismatch {
        account: String,
        balance: Cents,
        last_balance_after: Cents,
    },
    NonPositiveAmount {
        account: String,
        amount: Cents,
    },
    ForeignTransaction {
        account: String,
        belongs_to: AccountId,
    },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::BelowOverdraftLimit {
                account,
                balance,
                overdraft_limit,
            } => write!(
                f,
                "{account}: balance {balance} is below overdraft limit {overdraft_limit}"
            ),
            IntegrityIssue::BalanceMismatch {
                account,
                balance,
                last_balance_after,
            } => write!(
                f,
                "{account}: balance {balance} differs from last recorded balance {last_balance_after}"
            ),
            IntegrityIssue::NonPositiveAmount { account, amount } => {
                write!(f, "{account}: transaction with non-positive amount {amount}")
            }
            IntegrityIssue::ForeignTransaction {
                account,
                belongs_to,
            } => write!(f, "{account}: history contains a transaction of {belongs_to}"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn record(&mut self, account: &Account, history: &[Transaction]) {
        self.account_count += 1;
        self.transaction_count += history.len();
        self.issues.extend(audit_account(account, history));
    }
}

/// Check one account against its history (most recent first).
pub fn audit_account(account: &Account, history: &[Transaction]) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    if !account.is_within_limit() {
        issues.push(IntegrityIssue::BelowOverdraftLimit {
            account: account.number.clone(),
            balance: account.balance,
            overdraft_limit: account.overdraft_limit,
        });
    }

    if let Some(latest) = history.first() {
        if latest.balance_after != account.balance {
            issues.push(IntegrityIssue::BalanceMismatch {
                account: account.number.clone(),
                balance: account.balance,
                last_balance_after: latest.balance_after,
            });
        }
    }

    for tx in history {
        if tx.amount <= 0 {
            issues.push(IntegrityIssue::NonPositiveAmount {
                account: account.number.clone(),
                amount: tx.amount,
            });
        }
        if tx.account_id != account.id {
            issues.push(IntegrityIssue::ForeignTransaction {
                account: account.number.clone(),
                belongs_to: tx.account_id,
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::OperationKind;

    fn account() -> Account {
        Account::new("ACC-1", "EUR", Uuid::new_v4())
            .with_balance(10_000)
            .with_overdraft_limit(-5_000)
    }

    #[test]
    fn test_consistent_account_has_no_issues() {
        let mut acc = account();
        acc.debit(2_500);
        let tx = Transaction::posted(&acc, OperationKind::Withdrawal, 2_500, "me", Utc::now());

        assert!(audit_account(&acc, &[tx]).is_empty());
        // No history: nothing to compare the balance with.
        assert!(audit_account(&account(), &[]).is_empty());
    }

    #[test]
    fn test_detects_balance_mismatch() {
        let mut acc = account();
        let tx = Transaction::posted(&acc, OperationKind::Deposit, 100, "me", Utc::now());
        acc.balance = 42;

        let issues = audit_account(&acc, &[tx]);
        assert_eq!(
            issues,
            vec![IntegrityIssue::BalanceMismatch {
                account: "ACC-1".into(),
                balance: 42,
                last_balance_after: 10_000,
            }]
        );
    }

    #[test]
    fn test_detects_overdraft_breach_and_bad_amounts() {
        let mut acc = account();
        acc.balance = -6_000;
        let mut tx = Transaction::posted(&acc, OperationKind::Withdrawal, 1, "me", Utc::now());
        tx.amount = 0;

        let mut report = IntegrityReport::default();
        report.record(&acc, &[tx]);

        assert!(!report.is_healthy());
        assert_eq!(report.account_count, 1);
        assert_eq!(report.transaction_count, 1);
        assert!(matches!(report.issues[0], IntegrityIssue::BelowOverdraftLimit { .. }));
        assert!(matches!(report.issues[1], IntegrityIssue::NonPositiveAmount { amount: 0, .. }));
    }
}
