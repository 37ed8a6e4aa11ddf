//! WebSocket relay that fans every inbound frame out to all connected peers.
//!
//! See `README.md` for an overview and usage instructions. Each module
//! focuses on a concrete responsibility:
//!
//! - [`cli`] parses the command-line interface for serve and client modes.
//! - [`hub`] owns the set of connected peers and rebroadcasts each inbound
//!   payload, annotated with a timestamp, to every one of them.
//! - [`relay`] accepts TCP connections, performs the WebSocket handshake,
//!   and feeds connection events into the hub.
//! - [`client`] connects to a relay, multiplexing stdin and received frames
//!   for a terminal user.
//! - [`frame`] renders outbound frames as `<payload> : <timestamp>`.
//!
//! Integration and end-to-end tests use this crate directly to exercise the
//! hub state machine and the relay over real sockets.

pub mod cli;
pub mod client;
pub mod frame;
pub mod hub;
pub mod relay;
