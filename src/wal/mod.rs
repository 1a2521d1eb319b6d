//! Batched, fsync'd write-ahead log: record format, segment naming, the
//! group-commit writer task, and optional compaction.

pub mod compactor;
pub mod record;
pub mod segment;
pub mod writer;

pub use record::LogRecord;
pub use writer::{WalWriter, WalWriterConfig, WalWriterHandle};

use std::path::Path;

use crate::error::Result;
use crate::protocol::commands::Command;

/// Replays every segment under `dir` in lex order, calling `apply` for
/// each logged `SET`/`DEL`. Shared by the engine's boot-time replay and by
/// anything else that needs the store state implied by the log (the
/// compactor rebuilds its own copy independently since it must read the
/// segments that it is about to delete).
pub fn replay<F>(dir: &Path, mut apply: F) -> Result<()>
where
    F: FnMut(Command, &[String]),
{
    for name in segment::list_segments(dir)? {
        let path = segment::segment_path(dir, &name);
        let contents = std::fs::read_to_string(&path)?;
        for line in contents.lines() {
            let line = line.trim_end_matches(' ');
            if line.is_empty() {
                continue;
            }
            let record = LogRecord::parse_line(line)?;
            apply(record.command, &record.args);
        }
    }
    Ok(())
}
