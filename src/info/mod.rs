//! The node's info protocol: wire client and response decoders.

pub mod client;
pub mod kv;
pub mod latency;

pub use client::InfoConnection;
