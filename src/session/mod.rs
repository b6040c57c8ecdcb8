use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use bytes::Bytes;
use log::info;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use crate::codec::Frame;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::Emitter;
use crate::flow::{Event, Scanner, Socket};
use correlate::Correlator;

pub use sniffer::{Notice, Sniffer};

mod correlate;
mod sniffer;


#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    AwaitingAnnouncement,
    Correlating,
    Bound,
    Closed,
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
    BulleBound(Socket, Option<Socket>),
    Received(Socket, Frame),
    Sent(Socket, Bytes, u8),
    Closed,
    Error(Error),
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<Shared>,
}

struct Shared {
    main:   Socket,
    bulle:  Mutex<Option<Socket>>,
    state:  Mutex<State>,
    active: AtomicBool,
    events: Emitter<SessionEvent>,
}

impl Session {
    pub fn new(main: Socket) -> Result<Self> {
        if !main.is_active() {
            return Err(Error::Inactive(main.key()));
        }

        Ok(Self {
            inner: Arc::new(Shared {
                main:   main,
                bulle:  Mutex::new(None),
                state:  Mutex::new(State::AwaitingAnnouncement),
                active: AtomicBool::new(true),
                events: Emitter::new(),
            }),
        })
    }

    pub fn spawn(&self, input: UnboundedReceiver<Event>, scanner: Arc<dyn Scanner>, cfg: Arc<Config>) -> JoinHandle<()> {
        let correlator = Correlator::new(self.clone(), scanner, cfg, input);
        tokio::spawn(correlator.exec())
    }

    pub fn main(&self) -> &Socket {
        &self.inner.main
    }

    pub fn bulle(&self) -> Option<Socket> {
        self.inner.bulle.lock().clone()
    }

    pub fn state(&self) -> State {
        *self.inner.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn events(&self) -> &Emitter<SessionEvent> {
        &self.inner.events
    }

    fn emit(&self, event: SessionEvent) {
        self.inner.events.emit(event);
    }

    fn set_state(&self, state: State) {
        let mut current = self.inner.state.lock();
        if *current != State::Closed && *current != state {
            info!("session {} {:?} -> {:?}", self, *current, state);
            *current = state;
        }
    }

    fn bind(&self, bulle: Socket) -> Option<Socket> {
        let mut current = self.inner.bulle.lock();
        let prev = current.take();
        if let Some(prev) = &prev {
            prev.close();
        }
        *current = Some(bulle);
        drop(current);

        self.set_state(State::Bound);
        prev
    }

    fn close(&self) -> bool {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return false;
        }

        self.set_state(State::Closed);
        if let Some(bulle) = self.inner.bulle.lock().as_ref() {
            bulle.close();
        }
        true
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("main", &self.inner.main)
            .field("bulle", &self.bulle())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner.main.key())
    }
}
