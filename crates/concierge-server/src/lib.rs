//! # concierge-server
//!
//! HTTP + WebSocket front door for the reception kiosk.
//!
//! Visitors and staff consoles connect over `/ws` and speak a small
//! JSON-RPC-shaped protocol; a thin REST surface covers the contact form
//! and reachability polling. All coordination semantics live in
//! `concierge-engine` — this crate owns transport, settings, and
//! observability.

pub mod health;
pub mod http;
pub mod metrics;
pub mod rpc;
pub mod server;
pub mod settings;
pub mod shutdown;
pub mod websocket;
