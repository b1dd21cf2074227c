//! # gridwire-client
//!
//! Client-side protocol engine for a clustered data-grid server.
//!
//! One [`Connection`] owns one TCP stream. It performs the handshake,
//! serializes requests into length-and-flag framed messages, and multiplexes
//! any number of concurrent invocations over the stream by correlation id.
//!
//! ## Architecture
//!
//! - **Byte codec** ([`protocol`]): integers with an explicit, scoped byte
//!   order; frame headers are always little-endian
//! - **Wire types** ([`codec`]): strings, optionals, identifiers and lists as
//!   frame sequences
//! - **Messages** ([`message`]): per-request frame layouts
//! - **Connection**: a driver task owning the write scheduler and the
//!   [`invocation`] registry, fed by a read loop that reassembles messages
//!
//! ## Example
//!
//! ```no_run
//! use gridwire_client::message::Authentication;
//! use gridwire_client::Connection;
//!
//! #[tokio::main]
//! async fn main() -> gridwire_client::Result<()> {
//!     let conn = Connection::builder().connect("127.0.0.1:5701").await?;
//!
//!     let response = conn
//!         .authenticate(Authentication::new("dev", "client1"))
//!         .await?;
//!     println!("authenticated, response type {:?}", response.message_type());
//!
//!     conn.heartbeat().await?;
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod invocation;
pub mod message;
pub mod protocol;

mod client;
mod driver;
mod handshake;
mod reader;
mod writer;

pub use client::{Connection, ConnectionBuilder, ConnectionConfig, DEFAULT_READ_BUFFER_SIZE};
pub use error::{CloseReason, GridwireError, Result};
pub use handshake::{ConnectionState, HandshakeState, PROTOCOL_IDENTIFIER};
pub use protocol::ClientMessage;
pub use writer::{WriteScheduler, DEFAULT_WRITE_BUFFER_CAPACITY};
