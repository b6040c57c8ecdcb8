use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver};
use log::{debug, info, warn};
use pcap::{Active, Capture};
use pnet::datalink;
use tokio::sync::mpsc::Sender;
use crate::error::Error;
use super::{capture, decode, Config, Input};
use pcap::Error::*;

#[derive(Debug)]
pub struct Source {
    target: IpAddr,
    links:  Vec<String>,
    stop:   Arc<AtomicBool>,
}

impl Source {
    pub fn open(target: IpAddr, cfg: Config, tx: Sender<Input>) -> Result<Self, Error> {
        let cfg    = Arc::new(cfg);
        let filter = format!("host {}", target);
        let stop   = Arc::new(AtomicBool::new(false));

        let pending = datalink::interfaces().into_iter().filter(|link| {
            !link.is_loopback() && cfg.check(&link.name)
        }).map(|link| {
            let (done, rx) = bounded(1);
            let name   = link.name;
            let cfg    = cfg.clone();
            let filter = filter.clone();
            let mut task = Task {
                name:   name.clone(),
                target: target,
                tx:     tx.clone(),
                stop:   stop.clone(),
            };

            thread::spawn(move || {
                let cap = match capture(&task.name, &filter, &cfg) {
                    Ok(cap) => cap,
                    Err(e)  => {
                        let _ = done.send(Err(e));
                        return;
                    }
                };
                let _ = done.send(Ok(()));

                info!("starting {} capture", task.name);
                match task.poll(cap) {
                    Ok(()) => debug!("capture {} finished", task.name),
                    Err(e) => warn!("capture {} stopped: {:?}", task.name, e),
                }
            });

            (name, rx)
        }).collect::<Vec<_>>();

        let links = ready(target, pending)?;

        Ok(Self { target, links, stop })
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn stop(&mut self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            debug!("stopping capture of {} on {:?}", self.target, self.links);
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        self.stop();
    }
}

// Names of the interfaces whose capture opened; the rest are skipped.
pub(super) fn ready(target: IpAddr, pending: Vec<(String, Receiver<Result<(), Error>>)>) -> Result<Vec<String>, Error> {
    let mut links = Vec::new();
    for (name, rx) in pending {
        match rx.recv() {
            Ok(Ok(())) => links.push(name),
            Ok(Err(e)) => warn!("link {} skipped: {}", name, e),
            Err(_)     => warn!("link {} skipped", name),
        }
    }

    match links.is_empty() {
        true  => Err(Error::NoInterfaces(target)),
        false => Ok(links),
    }
}

pub(super) fn truncated(dev: &str, caplen: u32, len: u32) -> Option<Error> {
    match caplen < len {
        true  => Some(Error::Truncated { dev: dev.to_owned(), caplen, len }),
        false => None,
    }
}

struct Task {
    name:   String,
    target: IpAddr,
    tx:     Sender<Input>,
    stop:   Arc<AtomicBool>,
}

impl Task {
    fn poll(&mut self, mut cap: Capture<Active>) -> Result<()> {
        while !self.stop.load(Ordering::Acquire) {
            let input = match cap.next() {
                Ok(pkt)             => self.record(pkt),
                Err(TimeoutExpired) => continue,
                Err(NoMorePackets)  => break,
                Err(e)              => {
                    let err = Error::from(e);
                    self.send(Input::Error(err.clone()));
                    return Err(err.into());
                }
            };

            if let Some(input) = input {
                if !self.send(input) {
                    break;
                }
            }
        }
        Ok(())
    }

    fn record(&self, pkt: pcap::Packet<'_>) -> Option<Input> {
        if let Some(e) = truncated(&self.name, pkt.header.caplen, pkt.header.len) {
            self.send(Input::Error(e));
        }
        decode(self.target, pkt.data).map(Input::Packet)
    }

    fn send(&self, input: Input) -> bool {
        !self.stop.load(Ordering::Acquire) && self.tx.blocking_send(input).is_ok()
    }
}
