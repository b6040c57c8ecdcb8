use std::net::IpAddr;
use std::sync::Arc;
use log::{debug, info};
use tokio::sync::mpsc::{channel, Receiver, UnboundedSender};
use tokio::task::JoinHandle;
use crate::capture::{Input, Source};
use crate::config::Config;
use crate::error::Result;
use crate::events::Emitter;
use super::{Command, Event, Table};

pub trait Scanner: Send + Sync {
    fn scan(&self, host: IpAddr, events: Emitter<Event>) -> Result<Scan>;
}

pub struct Live {
    cfg: Arc<Config>,
}

pub struct Scan {
    host:   IpAddr,
    events: Emitter<Event>,
    source: Option<Source>,
    ctl:    UnboundedSender<Command>,
    task:   Option<JoinHandle<()>>,
}

impl Live {
    pub fn new(cfg: Arc<Config>) -> Self {
        Self { cfg }
    }
}

impl Scanner for Live {
    fn scan(&self, host: IpAddr, events: Emitter<Event>) -> Result<Scan> {
        let (tx, rx) = channel(self.cfg.queue);
        let source = Source::open(host, self.cfg.capture.clone(), tx)?;
        Ok(Scan::spawn(host, self.cfg.clone(), events, rx, Some(source)))
    }
}

impl Scan {
    pub fn spawn(host: IpAddr, cfg: Arc<Config>, events: Emitter<Event>, input: Receiver<Input>, source: Option<Source>) -> Self {
        let (table, ctl_rx) = Table::new(cfg, events.clone());
        let ctl  = table.control();
        let task = tokio::spawn(async move {
            table.exec(input, ctl_rx).await;
            debug!("scan {} finished", host);
        });

        info!("scanning {}", host);

        Self {
            host:   host,
            events: events,
            source: source,
            ctl:    ctl,
            task:   Some(task),
        }
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn events(&self) -> &Emitter<Event> {
        &self.events
    }

    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }

        if self.task.take().is_some() {
            info!("stopping scan of {}", self.host);
            let _ = self.ctl.send(Command::Stop);
        }
    }

    pub async fn shutdown(mut self) {
        let task = self.task.take();
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        let _ = self.ctl.send(Command::Stop);
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for Scan {
    fn drop(&mut self) {
        self.stop();
    }
}
