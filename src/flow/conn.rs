use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use crate::codec::{FrameCodec, Framer};
use crate::error::{Error, Result};
use crate::events::Emitter;
use super::{Event, FlowKey, Host};
use super::table::Command;

#[derive(Clone)]
pub struct Socket {
    inner: Arc<Shared>,
}

struct Shared {
    id:     u64,
    key:    FlowKey,
    active: AtomicBool,
    ctl:    UnboundedSender<Command>,
}

pub struct Connection {
    socket:   Socket,
    inbound:  Framer,
    outbound: Framer,
    events:   Emitter<Event>,
    idle:     Duration,
    deadline: Instant,
}

impl Socket {
    pub(crate) fn new(id: u64, key: FlowKey, ctl: UnboundedSender<Command>) -> Self {
        Self {
            inner: Arc::new(Shared {
                id:     id,
                key:    key,
                active: AtomicBool::new(true),
                ctl:    ctl,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn key(&self) -> FlowKey {
        self.inner.key
    }

    pub fn client(&self) -> Host {
        self.inner.key.client
    }

    pub fn server(&self) -> Host {
        self.inner.key.server
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        if self.deactivate() {
            let _ = self.inner.ctl.send(Command::Close(self.clone()));
        }
    }

    fn deactivate(&self) -> bool {
        self.inner.active.swap(false, Ordering::AcqRel)
    }
}

impl PartialEq for Socket {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Socket {}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("active", &self.is_active())
            .finish()
    }
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {}", self.inner.id, self.inner.key)
    }
}

impl Connection {
    pub fn new(socket: Socket, events: Emitter<Event>, idle: Duration, max: usize) -> Self {
        Self {
            socket:   socket,
            inbound:  Framer::new(FrameCodec::inbound(max)),
            outbound: Framer::new(FrameCodec::outbound(max)),
            events:   events,
            idle:     idle,
            deadline: Instant::now() + idle,
        }
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn is_active(&self) -> bool {
        self.socket.is_active()
    }

    pub fn consume(&mut self, payload: &[u8], outgoing: bool) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Inactive(self.socket.key()));
        }

        self.deadline = Instant::now() + self.idle;

        let framer = match outgoing {
            true  => &mut self.outbound,
            false => &mut self.inbound,
        };

        for frame in framer.push(payload)? {
            trace!("flow {} frame {:?} ({} bytes)", self.socket, frame.identifier(), frame.data.len());
            let socket = self.socket.clone();
            self.events.emit(match outgoing {
                true  => Event::Sent(socket, frame),
                false => Event::Received(socket, frame),
            });
        }

        Ok(())
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn close(&self) -> bool {
        let closed = self.socket.deactivate();
        if closed {
            debug!("flow {} closed", self.socket);
        }
        closed
    }

    pub(super) fn finish(self) {
        self.events.emit(Event::Closed(self.socket));
    }
}
