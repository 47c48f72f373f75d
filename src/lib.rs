// pace-pro-sw - offline caching worker for the PACE PRO web app

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod metrics;
pub mod network;
pub mod server;
pub mod utils;
pub mod worker;
