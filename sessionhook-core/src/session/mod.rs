//! Session buffering: records, the shared store and its retention sweep

mod record;
mod store;
mod sweeper;

pub use record::{DeliveryState, SessionRecord, SessionSnapshot};
pub use store::{Claim, EvictionReport, SessionStore};
pub use sweeper::run_sweeper;
