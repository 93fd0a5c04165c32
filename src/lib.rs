//! Devproxy - a single-upstream HTTP reverse proxy for local development
//!
//! Every request is forwarded unchanged to one fixed upstream and every
//! response comes back with `Access-Control-Allow-Origin: *`, so browser apps
//! served from another origin can talk to a local backend.
//!
//! - `config`: command line and process settings
//! - `upstream`: the fixed upstream target
//! - `forwarder`: the forwarding seam and its HTTP implementation
//! - `cors`: the forwarder decorator adding the CORS header
//! - `service`: hyper service adapter
//! - `server`: listener and connection handling
//! - `utils`: URI joining and hop-by-hop header helpers

pub mod config;
pub mod cors;
pub mod forwarder;
pub mod server;
pub mod service;
pub mod upstream;
pub mod utils;
pub use hyper;
