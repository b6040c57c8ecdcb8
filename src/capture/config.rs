use std::convert::TryFrom;
use std::time::Duration;
use log::debug;
use pcap::{Active, Capture};
use regex::Regex;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub capture:     Option<Regex>,
    pub exclude:     Option<Regex>,
    pub timeout:     Duration,
    pub buffer_size: u64,
    pub snaplen:     u64,
    pub promisc:     bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture:     None,
            exclude:     None,
            timeout:     Duration::from_millis(100),
            buffer_size: 10 * 1024 * 1024,
            snaplen:     65_535,
            promisc:     false,
        }
    }
}

impl Config {
    pub fn check(&self, link: &str) -> bool {
        if !self.capture.as_ref().map_or(true, |re| re.is_match(link)) {
            debug!("link {} ignored", link);
            return false;
        }

        if self.exclude.as_ref().map_or(false, |re| re.is_match(link)) {
            debug!("link {} excluded", link);
            return false;
        }

        true
    }
}

pub fn capture(link: &str, filter: &str, cfg: &Config) -> Result<Capture<Active>> {
    let mut cap = Capture::from_device(link)?
        .buffer_size(i32::try_from(cfg.buffer_size).unwrap_or(i32::MAX))
        .timeout(i32::try_from(cfg.timeout.as_millis()).unwrap_or(i32::MAX))
        .snaplen(i32::try_from(cfg.snaplen).unwrap_or(i32::MAX))
        .promisc(cfg.promisc)
        .open()?;

    match cap.list_datalinks()?.into_iter().find(|lt| lt.0 == 1) {
        Some(linktype) => cap.set_datalink(linktype)?,
        None           => return Err(Error::Capture(format!("link {} not ethernet", link))),
    }

    cap.filter(filter)?;

    Ok(cap)
}
