//! # What is Rialto?
//!
//! Rialto is the core library for a small trading-alerts system. It holds the state
//! that the HTTP layer serves: an append-only alert log, a user directory with tiered
//! subscriptions, a signed-token implementation used for authentication, a randomized
//! demo market board, and a broadcast bus that pushes alert mutations to live
//! listeners.
//!
//! The library contains no HTTP code. The JSON server over this state lives in
//! `rialto-http` and client implementations (direct, through the forwarding proxy,
//! and in-process) live in `rialto-client`.
//!
//! # Implementation
//!
//! The system is composed of:
//! - [AlertLog](crate::alert::AlertLog), the append-only collection of alerts. The
//!   log owns identifier assignment and newest-first ordering.
//! - [UserDirectory](crate::user::UserDirectory), the in-memory user set with
//!   credential checks, registration and the active-user projection.
//! - [TokenSigner](crate::token::TokenSigner), HMAC-SHA256 signed credentials with a
//!   fixed validity window. Expiry is the only invalidation mechanism, there is no
//!   revocation list.
//! - [MarketBoard](crate::market::MarketBoard), a random-walk demo market feed served
//!   to paid tiers only.
//! - [AlertBus](crate::bus::AlertBus), a fire-and-forget broadcast channel carrying
//!   alert create/delete events. Delivery is best-effort and consumers are expected
//!   to re-fetch on notify rather than trust the payload.
//!
//! None of this state is durable. The demo backend holds everything in process
//! memory, which is intentional: a production deployment would externalize the alert
//! log and user table.
pub mod alert;
pub mod bus;
pub mod market;
pub mod token;
pub mod user;
