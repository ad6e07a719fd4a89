use thiserror::Error;

/// Coarse error classes a transport layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    InvalidArgument,
    Internal,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    NotFound(String),

    /// Carries no detail on purpose; the reason is logged, not returned.
    #[error("access denied")]
    AccessDenied,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn not_found(message: impl Into<String>) -> Self {
        LedgerError::NotFound(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::AccessDenied => ErrorKind::AccessDenied,
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::AccessDenied => 403,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LedgerError::not_found("account not found").status_code(), 404);
        assert_eq!(LedgerError::AccessDenied.status_code(), 403);
        assert_eq!(LedgerError::invalid("amount must be positive").status_code(), 400);
        assert_eq!(
            LedgerError::from(anyhow::anyhow!("disk full")).status_code(),
            500
        );
    }

    #[test]
    fn test_messages_are_user_safe() {
        assert_eq!(LedgerError::AccessDenied.to_string(), "access denied");
        assert_eq!(
            LedgerError::invalid("cannot transfer to the same account").to_string(),
            "cannot transfer to the same account"
        );
    }
}
