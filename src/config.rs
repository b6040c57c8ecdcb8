use std::time::Duration;
use crate::capture;

#[derive(Clone, Debug)]
pub struct Config {
    pub capture:   capture::Config,
    pub idle:      Duration,
    pub sweep:     Duration,
    pub correlate: Duration,
    pub max_frame: usize,
    pub queue:     usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture:   capture::Config::default(),
            idle:      Duration::from_secs(20),
            sweep:     Duration::from_secs(2),
            correlate: Duration::from_secs(20),
            max_frame: 32 * 1024 * 1024,
            queue:     1_000,
        }
    }
}
