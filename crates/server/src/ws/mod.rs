//! Bidirectional message protocol over WebSocket.
//! - `protocol`: frame types and command parsing.
//! - `handlers`: the store commands plus host-level ping/unsubscribe.
//! - `connection`: per-socket state and the read/write loop.

pub mod connection;
pub mod handlers;
pub mod protocol;

pub use connection::{serve_socket, Connection};
pub use protocol::{Command, Outbound, Request, DOMAIN};
