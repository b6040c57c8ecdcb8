use std::io;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use crate::flow::FlowKey;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("malformed length prefix")]
    Malformed,

    #[error("frame length {0} exceeds maximum {1}")]
    Oversize(usize, usize),

    #[error("connection {0} is closed")]
    Inactive(FlowKey),

    #[error("truncated capture on {dev}: {caplen} of {len} bytes")]
    Truncated { dev: String, caplen: u32, len: u32 },

    #[error("frame too short: {0} more bytes needed")]
    Short(usize),

    #[error("invalid utf-8 string")]
    Utf8,

    #[error("invalid host '{0}'")]
    Host(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("event source detached")]
    Detached,

    #[error("no capture interface opened for {0}")]
    NoInterfaces(IpAddr),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("flow {0}: {1}")]
    Flow(FlowKey, Box<Error>),
}

impl Error {
    pub fn flow(&self) -> Option<&FlowKey> {
        match self {
            Error::Flow(key, _) => Some(key),
            _                   => None,
        }
    }
}

impl From<pcap::Error> for Error {
    fn from(err: pcap::Error) -> Self {
        Error::Capture(err.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
