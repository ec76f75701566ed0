//! Error type for client operations.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client has no open transport.
    #[error("not connected")]
    NotConnected,
    /// `connect` was called on a client that still has a transport.
    #[error("already connected")]
    AlreadyConnected,
    /// The transport could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// A command would carry CR, LF or NUL and so split into several lines.
    #[error("{0} line contains CR, LF or NUL")]
    InvalidLine(String),
    /// Writing to or closing the transport failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
