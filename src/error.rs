//! Crate-wide error type

use thiserror::Error;

/// Error kinds produced anywhere in the request pipeline, the WAL, or
/// replication. Kept as a single flat enum (rather than per-module error
/// types) so the TCP handler can always render `error: [ <kind>: <msg> ]`
/// without caring which layer raised it.
#[derive(Error, Debug)]
pub enum Error {
    /// A byte in the request line didn't classify as an argument
    /// character or whitespace.
    #[error("ParseSymbol: unrecognized symbol '{0}'")]
    ParseSymbol(char),

    /// Wrong number of arguments for the given command.
    #[error("InvalidSetArgs: SET requires exactly 2 arguments")]
    InvalidSetArgs,
    #[error("InvalidGetArgs: GET requires exactly 1 argument")]
    InvalidGetArgs,
    #[error("InvalidDelArgs: DEL requires exactly 1 argument")]
    InvalidDelArgs,

    /// Command token isn't SET, GET, or DEL.
    #[error("UnknownCommand: '{0}'")]
    UnknownCommand(String),

    /// WAL append/flush/fsync/rotate failure.
    #[error("WalFlush: {0}")]
    WalFlush(String),

    /// Network or filesystem I/O failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    /// Missing config file, malformed YAML, or a semantic conflict
    /// between config sections.
    #[error("Config: {0}")]
    Config(String),

    /// Replica failed to reach the master.
    #[error("ReplicationConn: {0}")]
    ReplicationConn(String),

    /// A replicated segment could not be decoded/applied.
    #[error("ReplicationApply: {0}")]
    ReplicationApply(String),

    /// Write attempted against a replica.
    #[error("NotLeader: this node is a replica and rejects writes")]
    NotLeader,
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ReplicationApply(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
