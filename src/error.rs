//! Error types for the bridge.
//!
//! Everything except [`Error::Transmit`] is a startup failure and aborts the
//! process. Transmit errors are reported per event by the translator and never
//! leave the message handler.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("could not open MIDI output: {0}")]
    DeviceOpen(String),

    #[error("could not resolve local address: {0}")]
    AddressResolution(String),

    #[error("could not listen for OSC on UDP {addr}: {source}")]
    ListenBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("could not send MIDI event: {0}")]
    Transmit(String),
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::DeviceOpen(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::DeviceOpen(e.to_string())
    }
}

impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Transmit(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
