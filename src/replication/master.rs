//! Master side: a dedicated `\r`-framed TCP server that answers a
//! replica's cursor with every segment lex-greater than it, newest-first.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use crate::replication::protocol::{ReplicatedWal, WalMessage};
use crate::wal::segment;

/// Segments newer than `cursor`, newest-first. An empty `cursor` means
/// "send everything". Returns `None` (as an empty list) when the
/// replica is already caught up to the newest segment.
pub fn wals_since(data_dir: &std::path::Path, cursor: &str) -> crate::error::Result<Vec<ReplicatedWal>> {
    let segments = segment::list_segments(data_dir)?;
    if segments.is_empty() {
        return Ok(Vec::new());
    }

    if segments.last().map(String::as_str) == Some(cursor) {
        return Ok(Vec::new());
    }

    let mut wals = Vec::new();
    for name in segments.iter().rev() {
        if name == cursor {
            break;
        }
        let path = segment::segment_path(data_dir, name);
        let records = std::fs::read_to_string(&path)?;
        wals.push(ReplicatedWal {
            file_name: name.clone(),
            records,
        });
    }
    Ok(wals)
}

/// Builds the handler closure passed to [`crate::server::TcpServer::new`]
/// for the master's replication port.
pub fn handler(data_dir: PathBuf) -> crate::server::Handler {
    Arc::new(move |_request_id, cursor: String| {
        let data_dir = data_dir.clone();
        Box::pin(async move {
            let message = match wals_since(&data_dir, cursor.trim()) {
                Ok(wals) => WalMessage { wals, err: None },
                Err(e) => {
                    error!("replication master: listing segments: {e}");
                    WalMessage {
                        wals: Vec::new(),
                        err: Some(e.to_string()),
                    }
                }
            };
            match serde_json::to_string(&message) {
                Ok(body) => format!("{body}\r"),
                Err(e) => {
                    error!("replication master: encoding response: {e}");
                    format!("{{\"WALs\":[],\"Err\":\"{e}\"}}\r")
                }
            }
        })
    })
}
