use serde::{Deserialize, Serialize};

/// The authenticated party behind a request.
///
/// Token verification happens outside the ledger; by the time a `Caller`
/// exists its identity is trusted. Every ledger operation takes one
/// explicitly instead of reading an ambient security context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Subject claim; matched against `Customer::external_id`.
    pub subject: String,
    /// Preferred display name, when the identity provider supplies one.
    pub username: Option<String>,
}

impl Caller {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name recorded as `performed_by`: the preferred username, else the subject.
    pub fn performer(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.subject)
    }
}
