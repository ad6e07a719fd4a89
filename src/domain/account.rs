use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId};

pub type AccountId = Uuid;

/// A balance in one currency, owned by a single customer.
///
/// `balance >= overdraft_limit` holds after every committed mutation.
/// Accounts are mutated only through deposit, withdraw and transfer and are
/// never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Human-readable, unique account number (e.g. "ACC-JANE-001").
    pub number: String,
    pub balance: Cents,
    /// Lowest balance allowed; zero or negative.
    pub overdraft_limit: Cents,
    pub currency: String,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        number: impl Into<String>,
        currency: impl Into<String>,
        customer_id: CustomerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            balance: 0,
            overdraft_limit: 0,
            currency: currency.into(),
            customer_id,
            created_at: super::now(),
        }
    }

    pub fn with_balance(mut self, balance: Cents) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_overdraft_limit(mut self, overdraft_limit: Cents) -> Self {
        self.overdraft_limit = overdraft_limit;
        self
    }

    pub fn is_owned_by(&self, customer_id: CustomerId) -> bool {
        self.customer_id == customer_id
    }

    /// Whether taking `amount` out keeps the balance at or above the overdraft limit.
    pub fn can_debit(&self, amount: Cents) -> bool {
        self.balance
            .checked_sub(amount)
            .is_some_and(|after| after >= self.overdraft_limit)
    }

    pub fn can_credit(&self, amount: Cents) -> bool {
        self.balance.checked_add(amount).is_some()
    }

    pub fn is_within_limit(&self) -> bool {
        self.balance >= self.overdraft_limit
    }

    /// Add `amount` and return the new balance. Callers validate first.
    pub fn credit(&mut self, amount: Cents) -> Cents {
        self.balance += amount;
        self.balance
    }

    /// Remove `amount` and return the new balance. Callers check `can_debit` first.
    pub fn debit(&mut self, amount: Cents) -> Cents {
        self.balance -= amount;
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: Cents, overdraft_limit: Cents) -> Account {
        Account::new("ACC-TEST-001", "EUR", Uuid::new_v4())
            .with_balance(balance)
            .with_overdraft_limit(overdraft_limit)
    }

    #[test]
    fn test_can_debit_down_to_overdraft_limit() {
        let acc = account(10_000, -20_000);

        assert!(acc.can_debit(25_000)); // 100 - 250 = -150
        assert!(acc.can_debit(30_000)); // exactly -200
        assert!(!acc.can_debit(31_000)); // -210
    }

    #[test]
    fn test_zero_limit_means_no_overdraft() {
        let acc = account(5_000, 0);

        assert!(acc.can_debit(5_000));
        assert!(!acc.can_debit(5_001));
    }

    #[test]
    fn test_can_debit_handles_overflow() {
        let acc = account(Cents::MIN + 1, Cents::MIN);
        assert!(!acc.can_debit(Cents::MAX));
    }

    #[test]
    fn test_credit_then_debit_restores_balance() {
        let mut acc = account(10_000, -20_000);

        assert_eq!(acc.credit(4_200), 14_200);
        assert_eq!(acc.debit(4_200), 10_000);
        assert!(acc.is_within_limit());
    }

    #[test]
    fn test_ownership() {
        let owner = Uuid::new_v4();
        let acc = Account::new("ACC-1", "EUR", owner);

        assert!(acc.is_owned_by(owner));
        assert!(!acc.is_owned_by(Uuid::new_v4()));
    }
}
