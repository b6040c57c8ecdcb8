use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Emitter, Subscription};
use crate::flow::{Event, FlowKey, Scan, Scanner, Socket};
use crate::plugin::Plugins;
use crate::proto;
use super::Session;

#[derive(Clone, Debug)]
pub enum Notice {
    Session(Session),
    Error(Error),
}

pub struct Sniffer {
    scan:    Scan,
    flows:   Emitter<Event>,
    plugins: Plugins,
    events:  Emitter<Notice>,
    task:    JoinHandle<()>,
}

struct Router {
    cfg:     Arc<Config>,
    scanner: Arc<dyn Scanner>,
    plugins: Plugins,
    events:  Emitter<Notice>,
    routes:  HashMap<FlowKey, (Socket, UnboundedSender<Event>)>,
}

impl Sniffer {
    pub fn start(host: IpAddr, cfg: Arc<Config>, scanner: Arc<dyn Scanner>, plugins: Plugins) -> Result<Self> {
        let flows = Emitter::new();
        let sub   = flows.subscribe();
        let scan  = scanner.scan(host, flows.clone())?;

        let events = Emitter::new();
        let router = Router {
            cfg:     cfg,
            scanner: scanner,
            plugins: plugins.clone(),
            events:  events.clone(),
            routes:  HashMap::new(),
        };

        let task = tokio::spawn(router.exec(sub));

        info!("sniffing {}", host);

        Ok(Self { scan, flows, plugins, events, task })
    }

    pub fn events(&self) -> &Emitter<Notice> {
        &self.events
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    pub async fn shutdown(self) {
        let Self { scan, flows, task, .. } = self;
        scan.shutdown().await;
        flows.clear();
        if let Err(e) = task.await {
            warn!("sniffer task failed: {}", e);
        }
    }
}

impl Router {
    async fn exec(mut self, mut sub: Subscription<Event>) {
        while let Some(event) = sub.recv().await {
            self.route(event);
        }
        debug!("main scan finished with {} sessions", self.routes.len());
    }

    fn route(&mut self, event: Event) {
        if let Event::Sent(socket, frame) = &event {
            if !self.routes.contains_key(&socket.key()) && proto::is_handshake(frame) {
                self.open(socket);
            }
        }

        let key = match &event {
            Event::Error(e) => e.flow().copied(),
            event           => event.socket().map(Socket::key),
        };

        let route = key.and_then(|key| self.routes.get(&key)).filter(|(socket, _)| {
            event.socket().map_or(true, |s| s == socket)
        });

        match (route, event) {
            (Some((_, tx)), event) => {
                let closed = matches!(event, Event::Closed(_));
                let _ = tx.send(event);
                if let (true, Some(key)) = (closed, key) {
                    self.routes.remove(&key);
                }
            }
            (None, Event::Error(e)) => {
                warn!("main scan error: {}", e);
                self.events.emit(Notice::Error(e));
            }
            (None, _) => (),
        }
    }

    fn open(&mut self, socket: &Socket) {
        let session = match Session::new(socket.clone()) {
            Ok(session) => session,
            Err(e)      => {
                warn!("handshake on {} ignored: {}", socket, e);
                self.events.emit(Notice::Error(e));
                return;
            }
        };

        info!("session {} created", session);

        let (tx, rx) = unbounded_channel();
        self.plugins.add(&session);
        session.spawn(rx, self.scanner.clone(), self.cfg.clone());
        self.routes.insert(socket.key(), (socket.clone(), tx));
        self.events.emit(Notice::Session(session));
    }
}
