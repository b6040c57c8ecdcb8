use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use clap::{ArgMatches, value_t};
use log::{info, warn};
use regex::Regex;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime::Runtime;
use crate::args::opt;
use crate::capture;
use crate::config::Config;
use crate::flow::Live;
use crate::plugin::Plugins;
use crate::print::Printer;
use crate::session::{Notice, Sniffer};

pub fn agent(args: &ArgMatches) -> Result<()> {
    let host      = value_t!(args, "host", IpAddr)?;
    let idle      = value_t!(args, "idle", u64)?;
    let sweep     = value_t!(args, "sweep", u64)?;
    let correlate = value_t!(args, "correlate", u64)?;
    let max_frame = opt(args.value_of("max-frame"))?.unwrap_or(32 * 1024 * 1024);

    let capture = args.values_of("capture").map(join).transpose()?;
    let exclude = args.values_of("exclude").map(join).transpose()?;

    let config = Config {
        capture:   capture::Config {
            capture: capture,
            exclude: exclude,
            promisc: args.is_present("promisc"),
            ..Default::default()
        },
        idle:      Duration::from_secs(idle),
        sweep:     Duration::from_secs(sweep),
        correlate: Duration::from_secs(correlate),
        max_frame: max_frame,
        ..Default::default()
    };

    let rt     = Runtime::new()?;
    let _guard = rt.enter();

    let config  = Arc::new(config);
    let scanner = Arc::new(Live::new(config.clone()));
    let plugins = Plugins::new(Arc::new(Printer));
    let sniffer = Sniffer::start(host, config, scanner, plugins.clone())?;

    let mut notices = sniffer.events().subscribe();
    rt.spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice {
                Notice::Session(session) => info!("new session {}", session),
                Notice::Error(e)         => warn!("capture error: {}", e),
            }
        }
    });

    let mut signals = Signals::new(&[SIGINT, SIGTERM, SIGHUP])?;
    for signal in signals.forever() {
        match signal {
            SIGHUP => plugins.reload(Arc::new(Printer)),
            _      => break,
        }
    }

    info!("shutting down");

    rt.block_on(sniffer.shutdown());
    plugins.detach();

    Ok(())
}

fn join<'a>(values: clap::Values<'a>) -> Result<Regex> {
    let pattern = values.collect::<Vec<_>>().join("|");
    Ok(Regex::new(&pattern)?)
}
