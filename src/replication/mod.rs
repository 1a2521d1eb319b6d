//! Master→replica log shipping: pull-based, polling, keyed on segment
//! file names.

pub mod master;
pub mod protocol;
pub mod replica;

pub use protocol::{ReplicatedWal, WalMessage};
pub use replica::{spawn as spawn_replica, ReplicaConfig};
