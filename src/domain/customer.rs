use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

/// The root owner of accounts. Immutable once onboarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    /// Subject of the identity provider; how a caller is matched to a customer.
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        external_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            name: name.into(),
            email: email.into(),
            created_at: super::now(),
        }
    }
}

/// Public view of a customer. Never exposes the external identity reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
        }
    }
}
