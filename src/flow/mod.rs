use crate::codec::Frame;
use crate::error::Error;

pub use conn::{Connection, Socket};
pub use key::{FlowKey, Host};
pub use scan::{Live, Scan, Scanner};
pub use table::{Command, Table};

mod conn;
mod key;
mod scan;
mod table;


#[derive(Clone, Debug)]
pub enum Event {
    Opened(Socket),
    Received(Socket, Frame),
    Sent(Socket, Frame),
    Closed(Socket),
    Error(Error),
}

impl Event {
    pub fn socket(&self) -> Option<&Socket> {
        match self {
            Event::Opened(s)      => Some(s),
            Event::Received(s, _) => Some(s),
            Event::Sent(s, _)     => Some(s),
            Event::Closed(s)      => Some(s),
            Event::Error(_)       => None,
        }
    }
}
