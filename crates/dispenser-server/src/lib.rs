//! Library half of the `dispenser-server` binary, split out so integration
//! tests can drive the connection dispatcher over a real socket without
//! re-implementing `main`'s accept loop.

pub mod config;
pub mod connection;
pub mod telemetry;
