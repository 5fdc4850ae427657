//! Client facade over the rialto backend API. Three implementations of the
//! [Client](rialto_http::http::alerts_v1::Client) trait live here: `HttpClient`
//! calls the backend directly, `ProxyClient` tunnels every operation through the
//! forwarding proxy's envelope endpoint, and `LocalClient` runs against an
//! in-process `AppState` for tests and examples.
//!
//! The [store](crate::store) module owns the client-side alert state: list-shape
//! normalization for the backend's several response shapes and a sequence-guarded
//! store that discards stale fetch results.
pub mod client;
pub mod store;
