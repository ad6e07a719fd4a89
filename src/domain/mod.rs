mod account;
mod caller;
mod customer;
mod integrity;
mod money;
mod projection;
mod transaction;

pub use account::*;
pub use caller::*;
pub use customer::*;
pub use integrity::*;
pub use money::*;
pub use projection::*;
pub use transaction::*;

use chrono::{DateTime, SubsecRound, Utc};

/// The current time, truncated to the microsecond precision timestamps are
/// stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
