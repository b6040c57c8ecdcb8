use bytes::Bytes;
use crate::error::Error;
use crate::flow::Host;

pub use config::{capture, Config};
pub use decode::decode;
pub use source::Source;

mod config;
mod decode;
mod source;

#[cfg(test)]
mod test;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Captured {
    pub payload:  Bytes,
    pub outgoing: bool,
    pub src:      Host,
    pub dst:      Host,
}

#[derive(Clone, Debug)]
pub enum Input {
    Packet(Captured),
    Error(Error),
}
