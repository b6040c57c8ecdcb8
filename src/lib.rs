pub mod agent;
pub mod args;
pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod plugin;
pub mod print;
pub mod proto;
pub mod session;
pub mod wait;

pub use error::{Error, Result};
