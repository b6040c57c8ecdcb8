use std::fmt;
use std::net::{IpAddr, SocketAddr};

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Host {
    pub addr: IpAddr,
    pub port: u16,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct FlowKey {
    pub client: Host,
    pub server: Host,
}

impl Host {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl FlowKey {
    pub fn new(src: Host, dst: Host, outgoing: bool) -> Self {
        match outgoing {
            true  => Self { client: src, server: dst },
            false => Self { client: dst, server: src },
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.client, self.server)
    }
}

impl From<SocketAddr> for Host {
    fn from(sa: SocketAddr) -> Self {
        Self {
            addr: sa.ip(),
            port: sa.port(),
        }
    }
}
