use anyhow::Result;
use clap::{App, load_yaml};
use env_logger::Builder;
use jemallocator::Jemalloc;
use log::info;
use log::LevelFilter::*;
use sniffer::agent::agent;

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let yaml = load_yaml!("args.yml");
    let ver  = env!("CARGO_PKG_VERSION");
    let args = App::from_yaml(&yaml).version(ver).get_matches();

    let (module, level) = match args.occurrences_of("verbose") {
        0 => (Some("sniffer"), Info),
        1 => (Some("sniffer"), Debug),
        2 => (Some("sniffer"), Trace),
        _ => (None,            Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    info!("initializing sniffer {}", ver);

    agent(&args)
}
