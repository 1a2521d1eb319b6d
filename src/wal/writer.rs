//! Group-commit WAL writer.
//!
//! A single background task owns the batch and the segment directory.
//! Callers hand a record to the task over a bounded channel and wait for
//! the flush that absorbs it to complete; every record in the same flush
//! observes the same outcome, matching the reference implementation's
//! single shared `last_flush_error`.

use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::wal::record::LogRecord;
use crate::wal::segment;

#[derive(Debug, Clone)]
pub struct WalWriterConfig {
    pub data_dir: PathBuf,
    pub flushing_batch_size: usize,
    pub flushing_batch_timeout: Duration,
    pub max_segment_size_bytes: u64,
}

struct Envelope {
    record: LogRecord,
    seq_tx: oneshot::Sender<u64>,
}

/// Broadcast on the watch channel after every flush. `up_to_seq` is the
/// highest sequence number absorbed by the flush; waiters compare their own
/// assigned sequence number against it to know whether this outcome covers
/// their record.
#[derive(Debug, Clone, Default)]
struct FlushOutcome {
    up_to_seq: u64,
    error: Option<String>,
}

/// Handle used by callers to append records. Cloning is cheap; every clone
/// shares the same background writer task.
#[derive(Clone)]
pub struct WalWriter {
    sender: mpsc::Sender<Envelope>,
    flush_rx: watch::Receiver<FlushOutcome>,
}

/// Owns the background task's join handle; dropping the writer's sender
/// side (all [`WalWriter`] clones) lets the task observe channel closure,
/// flush its final partial batch, and exit. Callers `await` this handle to
/// implement the explicit drain-on-shutdown.
pub struct WalWriterHandle {
    pub writer: WalWriter,
    pub join: tokio::task::JoinHandle<()>,
}

impl WalWriter {
    pub fn spawn(config: WalWriterConfig) -> Result<WalWriterHandle> {
        std::fs::create_dir_all(&config.data_dir)?;

        let (sender, receiver) = mpsc::channel(1);
        let (flush_tx, flush_rx) = watch::channel(FlushOutcome::default());

        let join = tokio::spawn(run(receiver, flush_tx, config));

        Ok(WalWriterHandle {
            writer: WalWriter { sender, flush_rx },
            join,
        })
    }

    /// Append a record and wait for the flush that durably persists it.
    /// Deliberately ignores caller cancellation at the call site: there is
    /// no `select!` against a cancellation token here, so a cancelled
    /// caller's future simply stops being polled without unwinding any
    /// writer-side state — the batch the record landed in is unaffected.
    pub async fn append(&self, record: LogRecord) -> Result<()> {
        let mut rx = self.flush_rx.clone();
        let (seq_tx, seq_rx) = oneshot::channel();

        self.sender
            .send(Envelope { record, seq_tx })
            .await
            .map_err(|_| Error::WalFlush("WAL writer task is not running".to_string()))?;

        let seq = seq_rx
            .await
            .map_err(|_| Error::WalFlush("WAL writer task stopped before acking".to_string()))?;

        loop {
            {
                let outcome = rx.borrow();
                if outcome.up_to_seq >= seq {
                    return match &outcome.error {
                        None => Ok(()),
                        Some(msg) => Err(Error::WalFlush(msg.clone())),
                    };
                }
            }
            rx.changed()
                .await
                .map_err(|_| Error::WalFlush("WAL writer task stopped".to_string()))?;
        }
    }
}

async fn run(
    mut receiver: mpsc::Receiver<Envelope>,
    flush_tx: watch::Sender<FlushOutcome>,
    config: WalWriterConfig,
) {
    let mut batch: Vec<LogRecord> = Vec::new();
    let mut next_seq: u64 = 1;

    let sleep = tokio::time::sleep(config.flushing_batch_timeout);
    tokio::pin!(sleep);

    loop {
        let mut should_flush = false;

        tokio::select! {
            () = &mut sleep, if !batch.is_empty() => {
                debug!("wal batch timeout fired, flushing {} record(s)", batch.len());
                should_flush = true;
            }
            received = receiver.recv() => {
                match received {
                    Some(envelope) => {
                        if batch.is_empty() {
                            sleep.as_mut().reset(tokio::time::Instant::now() + config.flushing_batch_timeout);
                        }

                        let seq = next_seq;
                        next_seq += 1;
                        batch.push(envelope.record);
                        let _ = envelope.seq_tx.send(seq);

                        if batch.len() >= config.flushing_batch_size {
                            should_flush = true;
                        }
                    }
                    None => {
                        if !batch.is_empty() {
                            debug!("wal channel closed, flushing final {} record(s)", batch.len());
                            flush_and_broadcast(&config, &mut batch, &mut next_seq, &flush_tx).await;
                        }
                        return;
                    }
                }
            }
        }

        if should_flush {
            flush_and_broadcast(&config, &mut batch, &mut next_seq, &flush_tx).await;
        }
    }
}

async fn flush_and_broadcast(
    config: &WalWriterConfig,
    batch: &mut Vec<LogRecord>,
    next_seq: &mut u64,
    flush_tx: &watch::Sender<FlushOutcome>,
) {
    let up_to_seq = *next_seq - 1;
    let result = flush_batch(&config.data_dir, config.max_segment_size_bytes, batch).await;
    batch.clear();

    if let Err(ref e) = result {
        error!("wal flush failed: {e}");
    }

    let _ = flush_tx.send(FlushOutcome {
        up_to_seq,
        error: result.err().map(|e| e.to_string()),
    });
}

async fn flush_batch(data_dir: &std::path::Path, max_segment_size: u64, batch: &[LogRecord]) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let mut buffer = String::new();
    for record in batch {
        buffer.push_str(&record.to_line());
    }

    let data_dir = data_dir.to_path_buf();
    tokio::task::spawn_blocking(move || write_buffer(&data_dir, max_segment_size, buffer.as_bytes()))
        .await
        .map_err(|e| Error::WalFlush(format!("flush task panicked: {e}")))?
}

fn write_buffer(data_dir: &std::path::Path, max_segment_size: u64, buffer: &[u8]) -> Result<()> {
    let latest = segment::latest_segment(data_dir)?;

    let target = match latest {
        Some(name) => {
            let path = segment::segment_path(data_dir, &name);
            let current_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if current_size + buffer.len() as u64 <= max_segment_size {
                Some(name)
            } else {
                None
            }
        }
        None => None,
    };

    let name = match target {
        Some(name) => name,
        None => segment::next_segment_name(data_dir, chrono::Utc::now())?,
    };

    let path = segment::segment_path(data_dir, &name);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::WalFlush(format!("open segment {}: {e}", path.display())))?;

    file.write_all(buffer)
        .map_err(|e| Error::WalFlush(format!("write segment {}: {e}", path.display())))?;
    file.sync_all()
        .map_err(|e| Error::WalFlush(format!("fsync segment {}: {e}", path.display())))?;

    Ok(())
}
