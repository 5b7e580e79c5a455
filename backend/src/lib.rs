pub mod api;
pub mod config;
pub mod db;
pub mod livecoinwatch;
pub mod metrics;
pub mod poller;
pub mod prices;
pub mod reconciler;

pub mod error;
pub mod logger;
pub mod time;
