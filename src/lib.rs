pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod nameserver;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod transport;
pub mod zone;

pub use dns::DNSPacket;
pub use reconcile::{Reconciler, RunResult, run, run_with};
pub use record::{Record, RecordSet, TtlMatch};
