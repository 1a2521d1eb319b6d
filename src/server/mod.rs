//! The line-framed TCP server shared by the client-facing and replication
//! listeners.

pub mod tcp;

pub use tcp::{Handler, HandlerFuture, TcpServer};
