pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod handler;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod scoring;
pub mod server;
pub mod sources;
pub mod stats;
pub mod thin;
pub mod time;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
