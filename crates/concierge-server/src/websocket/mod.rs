//! WebSocket transport: connection state, registry/fan-out, frame handling,
//! and the per-connection session loop.

pub mod connection;
pub mod handler;
pub mod registry;
pub mod session;
