use std::path::PathBuf;
use std::sync::Arc;

use kvstored::config::Config;
use kvstored::database::Database;
use kvstored::engine::{Engine, Role};
use kvstored::replication::{master, spawn_replica};
use kvstored::server::TcpServer;
use kvstored::store::ShardManager;
use kvstored::wal::{compactor, WalWriter};
use kvstored::Result;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

fn parse_config_flag(args: &[String]) -> PathBuf {
    for arg in args.iter().skip(1) {
        if let Some(path) = arg.strip_prefix("--config=") {
            return PathBuf::from(path);
        }
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("boot failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_config_flag(&args);

    let config = Config::load(&config_path)?;
    init_logging(&config.logger.level);
    info!(path = %config_path.display(), "config loaded");

    let store = Arc::new(ShardManager::new());

    let role = if config.is_replica() { Role::Replica } else { Role::Leader };
    let replica_config = config.replica_config()?;

    let wal_handle = if role == Role::Leader {
        Engine::boot(&store, &PathBuf::from(&config.wal.data_directory))?;
        Some(WalWriter::spawn(config.wal_writer_config()?)?)
    } else {
        // Seed the store from segments already downloaded to
        // `replicated_data_directory` before the client server can see any
        // requests — the replica's on-disk cursor (the latest of those same
        // segments) would otherwise make the master think it's caught up
        // and never resend what's needed to repopulate an empty store.
        if let Some(replica_config) = &replica_config {
            Engine::boot(&store, &replica_config.replicated_data_dir)?;
        }
        None
    };

    let engine = Engine::new(store.clone(), wal_handle.as_ref().map(|h| h.writer.clone()), role);
    let database = Arc::new(Database::new(engine));
    info!("database configured");

    let client_handler: kvstored::server::Handler = {
        let database = database.clone();
        Arc::new(move |request_id, line| {
            let database = database.clone();
            Box::pin(async move { database.handle_request(request_id, &line).await })
        })
    };
    let client_server = TcpServer::new(
        config.network.address.clone(),
        config.network.max_connections,
        b'\n',
        client_handler,
    );
    client_server.start().await?;
    info!(address = %config.network.address, "client server started");

    let mut replication_server = None;
    let mut replica_poller = None;
    let mut compactor_handle = None;

    match &config.replication {
        Some(replication) if replication.replica_type == "master" => {
            let server = TcpServer::new(
                replication.master_address.clone(),
                config.network.max_connections,
                b'\r',
                master::handler(PathBuf::from(&config.wal.data_directory)),
            );
            server.start().await?;
            info!(address = %replication.master_address, "replication master started");
            replication_server = Some(server);
        }
        Some(_) => {
            if let Some(replica_config) = replica_config {
                info!(master = %replica_config.master_address, "replication poller started");
                replica_poller = Some(spawn_replica(replica_config, store.clone()));
            }
        }
        None => {}
    }

    if config.wal.compaction {
        let interval = humantime_duration(&config.wal.compaction_interval)?;
        compactor_handle = Some(compactor::spawn(
            PathBuf::from(&config.wal.data_directory),
            interval,
        ));
        info!("compaction ticker started");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining...");

    client_server.stop().await;
    if let Some(server) = &replication_server {
        server.stop().await;
    }
    if let Some(poller) = replica_poller {
        poller.abort();
    }
    if let Some(handle) = compactor_handle {
        handle.abort();
    }

    if let Some(wal_handle) = wal_handle {
        drop(wal_handle.writer);
        if let Err(e) = wal_handle.join.await {
            error!("wal writer task panicked during shutdown: {e}");
        }
    }

    info!("shutdown complete");
    Ok(())
}

fn humantime_duration(raw: &str) -> Result<std::time::Duration> {
    // Mirrors the subset of duration suffixes config.rs accepts for
    // wal.flushing_batch_timeout / replication.sync_interval.
    let raw = raw.trim();
    let split_at = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| kvstored::Error::Config(format!("invalid duration '{raw}'")))?;
    let (number, unit) = raw.split_at(split_at);
    let number: u64 = number
        .parse()
        .map_err(|_| kvstored::Error::Config(format!("invalid duration '{raw}'")))?;
    Ok(match unit {
        "ms" => std::time::Duration::from_millis(number),
        "s" => std::time::Duration::from_secs(number),
        "m" => std::time::Duration::from_secs(number * 60),
        "h" => std::time::Duration::from_secs(number * 3600),
        other => return Err(kvstored::Error::Config(format!("invalid duration unit '{other}'"))),
    })
}
