//! JSON wire types exchanged between master and replica.

use serde::{Deserialize, Serialize};

/// One segment as shipped over the wire. `records` is the segment's raw
/// text content — WAL lines are already UTF-8, so no additional encoding
/// step is needed to make them JSON-safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatedWal {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "Records")]
    pub records: String,
}

/// The master's response to a replica's poll. `err` carries a
/// human-readable failure description rather than `null` when the master
/// couldn't read its segment directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalMessage {
    #[serde(rename = "WALs")]
    pub wals: Vec<ReplicatedWal>,
    #[serde(rename = "Err")]
    pub err: Option<String>,
}
