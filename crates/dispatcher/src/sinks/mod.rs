//! Sink implementations
//!
//! Contains FileSink and RemoteSink.

mod file;
mod remote;

pub use self::file::{FileSink, DEFAULT_EXTENSION, TIMESTAMP_FORMAT};
pub use self::remote::{deliver, RemoteSink};
