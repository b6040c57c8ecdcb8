use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, trace, warn};
use tokio::sync::mpsc::{Receiver, UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Instant, interval_at};
use crate::capture::{Captured, Input};
use crate::config::Config;
use crate::error::Error;
use crate::events::Emitter;
use super::{Connection, Event, FlowKey, Socket};

#[derive(Debug)]
pub enum Command {
    Close(Socket),
    Stop,
}

pub struct Table {
    cfg:    Arc<Config>,
    flows:  HashMap<FlowKey, Connection>,
    events: Emitter<Event>,
    ctl:    UnboundedSender<Command>,
    next:   u64,
}

impl Table {
    pub fn new(cfg: Arc<Config>, events: Emitter<Event>) -> (Self, UnboundedReceiver<Command>) {
        let (ctl, rx) = unbounded_channel();
        let table = Self {
            cfg:    cfg,
            flows:  HashMap::new(),
            events: events,
            ctl:    ctl,
            next:   0,
        };
        (table, rx)
    }

    pub fn control(&self) -> UnboundedSender<Command> {
        self.ctl.clone()
    }

    pub async fn exec(mut self, mut input: Receiver<Input>, mut ctl: UnboundedReceiver<Command>) {
        let start = Instant::now() + self.cfg.sweep;
        let mut sweep = interval_at(start, self.cfg.sweep);

        loop {
            tokio::select! {
                Some(input) = input.recv() => self.record(input),
                Some(cmd)   = ctl.recv()   => match cmd {
                    Command::Close(socket) => self.remove(&socket),
                    Command::Stop          => break,
                },
                now = sweep.tick() => self.sweep(now),
            }
        }

        self.clear();
    }

    pub fn record(&mut self, input: Input) {
        match input {
            Input::Packet(pkt) => self.route(pkt),
            Input::Error(e)    => {
                warn!("capture error: {}", e);
                self.events.emit(Event::Error(e));
            }
        }
    }

    pub fn route(&mut self, pkt: Captured) {
        let Captured { payload, outgoing, src, dst } = pkt;
        let key = FlowKey::new(src, dst, outgoing);

        if self.flows.get(&key).map_or(false, |c| !c.is_active()) {
            self.finish(&key);
        }

        if !self.flows.contains_key(&key) {
            self.open(key);
        }

        let result = match self.flows.get_mut(&key) {
            Some(conn) => conn.consume(&payload, outgoing),
            None       => return,
        };

        if let Err(e) = result {
            warn!("flow {} failed: {}", key, e);
            if let Some(conn) = self.flows.get(&key) {
                conn.close();
            }
            self.events.emit(Event::Error(Error::Flow(key, Box::new(e))));
            self.finish(&key);
        }
    }

    pub fn sweep(&mut self, now: Instant) {
        let expired = self.flows.iter().filter(|(_, conn)| {
            conn.expired(now)
        }).map(|(key, _)| *key).collect::<Vec<_>>();

        for key in expired {
            debug!("flow {} idle", key);
            if let Some(conn) = self.flows.get(&key) {
                conn.close();
            }
            self.finish(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    fn open(&mut self, key: FlowKey) {
        self.next += 1;

        let socket = Socket::new(self.next, key, self.ctl.clone());
        let events = self.events.clone();
        let conn   = Connection::new(socket.clone(), events, self.cfg.idle, self.cfg.max_frame);

        debug!("flow {} opened", socket);

        self.flows.insert(key, conn);
        self.events.emit(Event::Opened(socket));
    }

    fn remove(&mut self, socket: &Socket) {
        let key = socket.key();
        if self.flows.get(&key).map_or(false, |c| c.socket() == socket) {
            self.finish(&key);
        } else {
            trace!("flow {} already removed", socket);
        }
    }

    fn finish(&mut self, key: &FlowKey) {
        if let Some(conn) = self.flows.remove(key) {
            conn.finish();
        }
    }

    fn clear(&mut self) {
        for (_, conn) in self.flows.drain() {
            conn.close();
            conn.finish();
        }
    }
}
