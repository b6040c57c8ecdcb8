use std::net::IpAddr;
use std::sync::Arc;
use futures::future::{pending, BoxFuture};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{spawn_blocking, JoinHandle};
use crate::codec::Frame;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Emitter, Subscription};
use crate::flow::{Event, Scan, Scanner, Socket};
use crate::proto::{self, Announce, Tuple};
use crate::wait::wait_for;
use super::{Session, SessionEvent, State};

pub(super) struct Correlator {
    session: Session,
    scanner: Arc<dyn Scanner>,
    cfg:     Arc<Config>,
    input:   UnboundedReceiver<Event>,
    pending: Option<Pending>,
    bound:   Option<Bound>,
}

struct Pending {
    tuple:   Tuple,
    opening: Option<JoinHandle<Result<Scan>>>,
    scan:    Option<Scan>,
    sub:     Subscription<Event>,
    backlog: Vec<Event>,
    wait:    BoxFuture<'static, Result<Socket>>,
}

struct Bound {
    scan: Scan,
    sub:  Subscription<Event>,
}

enum Step {
    Opened(Result<Scan>),
    Event(Event),
    Resolved(Result<Socket>),
}

impl Correlator {
    pub fn new(session: Session, scanner: Arc<dyn Scanner>, cfg: Arc<Config>, input: UnboundedReceiver<Event>) -> Self {
        Self {
            session: session,
            scanner: scanner,
            cfg:     cfg,
            input:   input,
            pending: None,
            bound:   None,
        }
    }

    pub async fn exec(mut self) {
        info!("session {} started", self.session);

        loop {
            tokio::select! {
                event = self.input.recv() => match event {
                    Some(event) => if !self.main(event) { break },
                    None        => break,
                },
                event = next(&mut self.bound) => self.bulle(event),
                step  = correlating(&mut self.pending) => match step {
                    Step::Opened(result)   => self.opened(result),
                    Step::Event(event)     => self.candidate(event),
                    Step::Resolved(result) => self.resolve(result),
                },
            }
        }

        self.close();
    }

    fn main(&mut self, event: Event) -> bool {
        match event {
            Event::Received(socket, frame) => {
                let announce = proto::announce(&frame);
                self.session.emit(SessionEvent::Received(socket, frame));
                match announce {
                    Ok(Some(announce)) => self.announce(announce),
                    Ok(None)           => (),
                    Err(e)             => self.error(e),
                }
            }
            Event::Sent(socket, frame) => self.session.emit(sent(socket, &frame)),
            Event::Closed(socket)      => return socket != *self.session.main(),
            Event::Error(e)            => self.error(e),
            Event::Opened(_)           => (),
        }
        true
    }

    fn bulle(&mut self, event: Event) {
        let current = self.session.bulle();
        let bulle   = match (event.socket(), &current) {
            (Some(socket), Some(bulle)) => socket == bulle,
            _                           => false,
        };

        match event {
            Event::Received(socket, frame) if bulle => {
                self.session.emit(SessionEvent::Received(socket, frame));
            }
            Event::Sent(socket, frame) if bulle => {
                self.session.emit(sent(socket, &frame));
            }
            Event::Closed(socket) if bulle => {
                if let Some(bound) = &self.bound {
                    info!("session {} bulle {} on {} closed", self.session, socket, bound.scan.host());
                }
                if self.session.state() == State::Bound {
                    self.session.set_state(State::AwaitingAnnouncement);
                }
            }
            Event::Error(e) => self.error(e),
            _               => (),
        }
    }

    fn announce(&mut self, announce: Announce) {
        let Announce { tuple, host, ports } = announce;

        let addr = match host.parse::<IpAddr>() {
            Ok(addr) => addr,
            Err(_)   => return self.error(Error::Host(host)),
        };

        info!("session {} bulle announced at {} ({:?}, ports {})", self.session, addr, tuple, ports);

        if let Some(mut prev) = self.pending.take() {
            debug!("session {} abandons correlation {:?}", self.session, prev.tuple);
            self.flush(&mut prev);
        }

        let events = Emitter::new();
        let sub    = events.subscribe();
        let wait   = wait_for(&events, move |event: &Event| match event {
            Event::Sent(socket, frame) if carries(frame, &tuple) => Some(socket.clone()),
            _                                                    => None,
        }, self.cfg.correlate);

        self.session.set_state(State::Correlating);

        let scanner = self.scanner.clone();
        let opening = spawn_blocking(move || scanner.scan(addr, events));

        self.pending = Some(Pending {
            tuple:   tuple,
            opening: Some(opening),
            scan:    None,
            sub:     sub,
            backlog: Vec::new(),
            wait:    Box::pin(wait),
        });
    }

    fn opened(&mut self, result: Result<Scan>) {
        let failed = match (&mut self.pending, result) {
            (Some(pending), Ok(scan)) => {
                pending.opening = None;
                pending.scan    = Some(scan);
                None
            }
            (Some(_), Err(e)) => Some(e),
            (None, _)         => None,
        };

        if let Some(e) = failed {
            self.pending = None;
            self.restore();
            self.error(e);
        }
    }

    fn candidate(&mut self, event: Event) {
        match event {
            Event::Error(e) => self.error(e),
            event           => {
                if let Some(pending) = &mut self.pending {
                    pending.backlog.push(event);
                }
            }
        }
    }

    fn resolve(&mut self, result: Result<Socket>) {
        let mut pending = match self.pending.take() {
            Some(pending) => pending,
            None          => return,
        };

        match (result, pending.scan.take()) {
            (Ok(socket), Some(scan)) => {
                let prev = self.session.bind(socket.clone());
                let Pending { sub, backlog, .. } = pending;
                self.bound = Some(Bound { scan, sub });

                info!("session {} bound bulle {}", self.session, socket);
                self.session.emit(SessionEvent::BulleBound(socket, prev));

                for event in backlog {
                    self.bulle(event);
                }
            }
            (Ok(socket), None) => {
                warn!("session {} matched {} without a scan", self.session, socket);
                self.restore();
            }
            (Err(e), scan) => {
                warn!("session {} correlation {:?} failed: {}", self.session, pending.tuple, e);
                if let Some(mut scan) = scan {
                    scan.stop();
                }
                self.flush(&mut pending);
                self.restore();
                self.session.emit(SessionEvent::Error(e));
            }
        }
    }

    // Surface errors still queued on an abandoned correlation's scan.
    fn flush(&self, pending: &mut Pending) {
        while let Some(event) = pending.sub.try_recv() {
            if let Event::Error(e) = event {
                self.error(e);
            }
        }
    }

    fn restore(&self) {
        let state = match self.session.bulle() {
            Some(bulle) if bulle.is_active() => State::Bound,
            _                                => State::AwaitingAnnouncement,
        };
        self.session.set_state(state);
    }

    fn error(&self, e: Error) {
        warn!("session {} error: {}", self.session, e);
        self.session.emit(SessionEvent::Error(e));
    }

    fn close(&mut self) {
        if self.session.close() {
            self.pending = None;
            self.bound   = None;
            info!("session {} closed", self.session);
            self.session.emit(SessionEvent::Closed);
        }
    }
}

fn carries(frame: &Frame, tuple: &Tuple) -> bool {
    proto::bulle_tuple(frame).as_ref() == Some(tuple)
}

fn sent(socket: Socket, frame: &Frame) -> SessionEvent {
    let fingerprint = frame.fingerprint().unwrap_or_default();
    SessionEvent::Sent(socket, frame.body(), fingerprint)
}

async fn next(bound: &mut Option<Bound>) -> Event {
    if let Some(bound) = bound {
        if let Some(event) = bound.sub.recv().await {
            return event;
        }
    }
    pending().await
}

async fn correlating(slot: &mut Option<Pending>) -> Step {
    let Pending { opening, sub, wait, .. } = match slot {
        Some(p) => p,
        None    => return pending().await,
    };

    // Candidate events queue up until the scan handle is in place.
    if let Some(handle) = opening {
        return Step::Opened(match handle.await {
            Ok(result) => result,
            Err(e)     => Err(Error::Capture(e.to_string())),
        });
    }

    tokio::select! {
        biased;
        Some(event) = sub.recv() => Step::Event(event),
        result = wait => Step::Resolved(result),
    }
}
