//! Dispatches a [`Query`] to the store and, for mutations, the WAL.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::commands::{Command, Query};
use crate::store::ShardManager;
use crate::wal::{self, LogRecord, WalWriter};

/// Whether this node accepts writes. A replica's engine still serves
/// `GET` from its locally-applied store, but rejects `SET`/`DEL` — those
/// arrive only via the replication apply path, never from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Replica,
}

pub struct Engine {
    store: Arc<ShardManager>,
    wal: Option<WalWriter>,
    role: Role,
}

impl Engine {
    pub fn new(store: Arc<ShardManager>, wal: Option<WalWriter>, role: Role) -> Self {
        Engine { store, wal, role }
    }

    /// Replays every segment under `data_dir` into `store`, in lex order,
    /// before the engine starts serving requests.
    pub fn boot(store: &ShardManager, data_dir: &Path) -> Result<()> {
        let mut applied = 0usize;
        wal::replay(data_dir, |command, args| {
            match command {
                Command::Set => store.set(args[0].clone(), args[1].clone()),
                Command::Del => store.del(&args[0]),
                Command::Get => unreachable!("GET is never logged"),
            }
            applied += 1;
        })?;
        debug!("replayed {applied} wal record(s) from {}", data_dir.display());
        Ok(())
    }

    /// Process an already-analyzed query, returning the response value
    /// (empty string for a GET-miss or a successful SET/DEL).
    pub async fn process(&self, request_id: Uuid, query: Query) -> Result<String> {
        match query.command {
            Command::Set => {
                self.require_leader()?;
                self.append(request_id, Command::Set, query.args.clone()).await?;
                self.store.set(query.args[0].clone(), query.args[1].clone());
                Ok(String::new())
            }
            Command::Get => {
                let value = self.store.get(&query.args[0]).unwrap_or_default();
                Ok(value)
            }
            Command::Del => {
                self.require_leader()?;
                self.append(request_id, Command::Del, query.args.clone()).await?;
                self.store.del(&query.args[0]);
                Ok(String::new())
            }
        }
    }

    fn require_leader(&self) -> Result<()> {
        match self.role {
            Role::Leader => Ok(()),
            Role::Replica => Err(Error::NotLeader),
        }
    }

    async fn append(&self, id: Uuid, command: Command, args: Vec<String>) -> Result<()> {
        match &self.wal {
            Some(wal) => wal.append(LogRecord::new(id, command, args)).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::WalWriterConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn engine_with_wal(dir: &TempDir) -> (Engine, Arc<ShardManager>) {
        let store = Arc::new(ShardManager::new());
        let handle = WalWriter::spawn(WalWriterConfig {
            data_dir: dir.path().to_path_buf(),
            flushing_batch_size: 1,
            flushing_batch_timeout: Duration::from_millis(20),
            max_segment_size_bytes: 1024 * 1024,
        })
        .unwrap();
        let engine = Engine::new(store.clone(), Some(handle.writer), Role::Leader);
        (engine, store)
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let (engine, _store) = engine_with_wal(&dir).await;

        engine
            .process(
                Uuid::new_v4(),
                Query {
                    command: Command::Set,
                    args: vec!["alpha".into(), "1".into()],
                },
            )
            .await
            .unwrap();

        let value = engine
            .process(
                Uuid::new_v4(),
                Query {
                    command: Command::Get,
                    args: vec!["alpha".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(value, "1");
    }

    #[tokio::test]
    async fn del_on_absent_key_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let (engine, _store) = engine_with_wal(&dir).await;

        let result = engine
            .process(
                Uuid::new_v4(),
                Query {
                    command: Command::Del,
                    args: vec!["missing".into()],
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn replica_rejects_writes_but_serves_reads() {
        let store = Arc::new(ShardManager::new());
        store.set("k".into(), "v".into());
        let engine = Engine::new(store, None, Role::Replica);

        let set_result = engine
            .process(
                Uuid::new_v4(),
                Query {
                    command: Command::Set,
                    args: vec!["k".into(), "v2".into()],
                },
            )
            .await;
        assert!(matches!(set_result, Err(Error::NotLeader)));

        let get_result = engine
            .process(
                Uuid::new_v4(),
                Query {
                    command: Command::Get,
                    args: vec!["k".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(get_result, "v");
    }

    #[test]
    fn boot_replays_segments_in_lex_order() {
        let dir = TempDir::new().unwrap();
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        std::fs::write(
            dir.path().join("20240101_000000.00000"),
            format!("{id1} SET a 1 \n"),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("20240101_000001.00000"),
            format!("{id2} DEL a \n"),
        )
        .unwrap();

        let store = ShardManager::new();
        Engine::boot(&store, dir.path()).unwrap();
        assert_eq!(store.get("a"), None);
    }
}
