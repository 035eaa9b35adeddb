use std::time::Duration;

pub mod codec;
pub mod command;
pub mod device;
pub mod response;

#[cfg(test)]
pub mod fake;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("I/O error: {:?}", _0)]
    Io(#[from] std::io::Error),

    #[error("Serial I/O error: {:?}", _0)]
    Serial(#[from] tokio_serial::Error),

    #[error("No reply from device within {:?}", _0)]
    ReplyTimeout(Duration),

    #[error("Malformed reply from device: {:?}", _0)]
    Malformed(String),

    #[error("Connection was closed")]
    Abort,
}

pub type Result<T> = std::result::Result<T, ProtoError>;
