//! Classify remote store errors into retry policy error kinds.

use std::io;

use crate::error::RemoteError;
use crate::retry::policy::ErrorKind;

/// Classify an I/O error for retry decisions.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::TimedOut => ErrorKind::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => ErrorKind::Connection,
        _ => ErrorKind::Other,
    }
}

/// Classify a remote store error. Missing sessions and rejections are never retried.
pub fn classify(e: &RemoteError) -> ErrorKind {
    match e {
        RemoteError::Io(io) => classify_io_error(io),
        RemoteError::NoSuchUpload { .. } | RemoteError::Rejected(_) => ErrorKind::Other,
    }
}
