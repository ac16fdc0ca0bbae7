pub mod config;
pub mod logging;

pub mod control;
pub mod events;
pub mod job;
pub mod scheduler;
pub mod transport;
pub mod unpack;
