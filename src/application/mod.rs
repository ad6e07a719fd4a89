// Application layer: the ledger core and its error taxonomy.
// Transports (the CLI here, an HTTP API elsewhere) call into `LedgerService`
// and translate `LedgerError` kinds into their own responses.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
