pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;
pub mod telemetry;

pub use domain::*;
pub use storage::Repository;
