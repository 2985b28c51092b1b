//! Telemetry monitors for chainmon.
//!
//! Each monitor samples one RPC surface of a node and appends the typed
//! result to the event store: [`status::StatusMonitor`] and
//! [`net_info::NetInfoMonitor`] take point-in-time samples on the push
//! cadence, while [`backfill::Backfiller`] walks the commit history gap
//! between the store and the live chain tip with a bounded fetch pool.

pub mod backfill;
pub mod error;
pub mod net_info;
pub mod pool;
pub mod status;
