//! HTTP layer for rialto. Two servers are defined here: the trading-alerts backend
//! API ([alerts_v1](crate::http::alerts_v1)) and the request-forwarding proxy that
//! sits in front of it for cross-origin callers
//! ([proxy_v1](crate::http::proxy_v1)).
//!
//! The `Client` trait for the backend API lives next to the wire types so that
//! client implementations in `rialto-client` and the server share one contract.
//!
//! ```text
//! cargo run --bin alerts_server_v1 [ipv4_address] [port]
//! cargo run --bin proxy_server_v1 [ipv4_address] [port]
//! ```
pub mod http;
