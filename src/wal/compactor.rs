//! Periodic compaction: collapse all segments into one containing a single
//! `SET` per surviving key.
//!
//! Mutually exclusive with replication (enforced at config-validation time,
//! not here) — a replica's cursor is a segment file name, and compaction
//! would invalidate cursors pointing at segments it deletes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::commands::Command;
use crate::wal::record::LogRecord;
use crate::wal::segment;

const REMOVE_RETRIES: u32 = 3;

/// Spawns the compaction ticker as a background task. The returned handle
/// is dropped to let the task keep running detached (the reference has no
/// explicit compactor shutdown signal; it runs until process exit same as
/// the Go ticker).
pub fn spawn(data_dir: PathBuf, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Err(e) = compact_once(&data_dir).await {
                error!("compaction failed: {e}");
            }
        }
    })
}

async fn compact_once(data_dir: &Path) -> Result<()> {
    let data_dir = data_dir.to_path_buf();
    tokio::task::spawn_blocking(move || compact_blocking(&data_dir))
        .await
        .map_err(|e| crate::error::Error::WalFlush(format!("compaction task panicked: {e}")))?
}

fn compact_blocking(data_dir: &Path) -> Result<()> {
    let segments = segment::list_segments(data_dir)?;
    if segments.len() <= 1 {
        debug!("compaction skipped: {} segment(s)", segments.len());
        return Ok(());
    }

    let mut live: BTreeMap<String, String> = BTreeMap::new();
    for name in &segments {
        let path = segment::segment_path(data_dir, name);
        let contents = std::fs::read_to_string(&path)?;
        for line in contents.lines() {
            let line = line.trim_end_matches(' ');
            if line.is_empty() {
                continue;
            }
            let record = LogRecord::parse_line(line)?;
            match record.command {
                Command::Set => {
                    live.insert(record.args[0].clone(), record.args[1].clone());
                }
                Command::Del => {
                    live.remove(&record.args[0]);
                }
                Command::Get => {}
            }
        }
    }

    let mut buffer = String::new();
    for (key, value) in &live {
        let record = LogRecord::new(Uuid::new_v4(), Command::Set, vec![key.clone(), value.clone()]);
        buffer.push_str(&record.to_line());
    }

    let new_name = segment::next_segment_name(data_dir, chrono::Utc::now())?;
    let new_path = segment::segment_path(data_dir, &new_name);
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&new_path)?;
        file.write_all(buffer.as_bytes())?;
        file.sync_all()?;
    }

    for name in &segments {
        let path = segment::segment_path(data_dir, name);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match std::fs::remove_file(&path) {
                Ok(()) => break,
                Err(e) if attempt >= REMOVE_RETRIES => {
                    warn!("failed to remove old segment {} after {attempt} attempts: {e}", path.display());
                    break;
                }
                Err(_) => continue,
            }
        }
    }

    info!(
        "compaction merged {} segment(s) into {new_name} ({} live key(s))",
        segments.len(),
        live.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_segment(dir: &Path, name: &str, lines: &[&str]) {
        let mut content = String::new();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn compaction_collapses_segments_into_one_with_surviving_keys() {
        let dir = TempDir::new().unwrap();
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        let id3 = Uuid::new_v4();

        write_segment(
            dir.path(),
            "20240101_000000.00000",
            &[&format!("{id1} SET a 1 ")],
        );
        write_segment(
            dir.path(),
            "20240101_000001.00000",
            &[&format!("{id2} SET b 2 "), &format!("{id3} DEL a ")],
        );

        compact_blocking(dir.path()).unwrap();

        let segments = segment::list_segments(dir.path()).unwrap();
        assert_eq!(segments.len(), 1);

        let contents = std::fs::read_to_string(dir.path().join(&segments[0])).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("SET b 2"));
        assert!(!contents.contains(" a "));
    }

    #[test]
    fn single_segment_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        write_segment(dir.path(), "20240101_000000.00000", &[&format!("{id} SET a 1 ")]);

        compact_blocking(dir.path()).unwrap();

        let segments = segment::list_segments(dir.path()).unwrap();
        assert_eq!(segments, vec!["20240101_000000.00000".to_string()]);
    }
}
