//! Connection builder and handle.
//!
//! The [`ConnectionBuilder`] provides a fluent API for configuring buffers
//! and limits. The [`Connection`] manages the lifecycle:
//! 1. Connect the socket
//! 2. Start the read loop
//! 3. Write the `"CP2"` protocol identifier
//! 4. Accept invocations until closed
//!
//! # Example
//!
//! ```no_run
//! use gridwire_client::message::{Authentication, CreateProxy, MapPut};
//! use gridwire_client::Connection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Connection::builder()
//!         .read_buffer_size(16 * 1024)
//!         .connect("127.0.0.1:5701")
//!         .await?;
//!
//!     conn.authenticate(Authentication::new("dev", "client1")).await?;
//!     conn.invoke(CreateProxy::map("scores")).await?;
//!     conn.invoke(MapPut::new("scores", 1, 100)).await?;
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::driver::{Command, Driver};
use crate::error::{GridwireError, Result};
use crate::handshake::{ConnectionState, Handshake, HandshakeState, PROTOCOL_IDENTIFIER};
use crate::message::{Authentication, Heartbeat, Request};
use crate::protocol::{
    ClientMessage, FrameBuffer, DEFAULT_MAX_FRAME_LENGTH, DEFAULT_MAX_MESSAGE_LENGTH,
};
use crate::reader::spawn_reader;
use crate::writer::{WriteScheduler, DEFAULT_WRITE_BUFFER_CAPACITY};

/// Default number of bytes requested per socket read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Connection tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bytes requested per socket read.
    pub read_buffer_size: usize,
    /// Initial capacity of each write buffer.
    pub write_buffer_capacity: usize,
    /// Largest frame length accepted from the peer.
    pub max_frame_length: usize,
    /// Largest reassembled message accepted from the peer.
    pub max_message_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_capacity: DEFAULT_WRITE_BUFFER_CAPACITY,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

/// Builder for configuring and creating a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    config: ConnectionConfig,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of bytes requested per socket read.
    ///
    /// Default: 64 KiB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the initial capacity of each write buffer.
    ///
    /// Default: 64 KiB
    pub fn write_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.write_buffer_capacity = capacity;
        self
    }

    /// Set the largest frame length accepted from the peer. A larger
    /// declaration terminates the connection.
    ///
    /// Default: 64 MiB
    pub fn max_frame_length(mut self, max: usize) -> Self {
        self.config.max_frame_length = max;
        self
    }

    /// Set the largest reassembled message accepted from the peer. A
    /// message growing past it terminates the connection.
    ///
    /// Default: 256 MiB
    pub fn max_message_length(mut self, max: usize) -> Self {
        self.config.max_message_length = max;
        self
    }

    /// Build a `Disconnected` connection.
    pub fn build(self) -> Connection {
        Connection::new(self.config)
    }

    /// Build and connect in one step.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<Connection> {
        let conn = self.build();
        conn.connect(addr).await?;
        Ok(conn)
    }
}

#[derive(Debug)]
struct Shared {
    config: ConnectionConfig,
    /// Driver inbox, set once the handshake is complete.
    commands: OnceLock<mpsc::UnboundedSender<Command>>,
    state: Arc<watch::Sender<ConnectionState>>,
}

/// Handle to one client connection.
///
/// Cheap to clone; every clone drives the same connection. Dropping the last
/// handle closes it.
#[derive(Debug, Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    pub fn new(config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                config,
                commands: OnceLock::new(),
                state: Arc::new(state),
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Connect over TCP and run the handshake.
    ///
    /// Completes once the protocol identifier is written; no acknowledgement
    /// is awaited. Any failure closes the connection for good.
    pub async fn connect<A: ToSocketAddrs>(&self, addr: A) -> Result<()> {
        let mut handshake = Handshake::begin(&self.shared.state)?;

        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                let e = GridwireError::from(e);
                handshake.fail(&e);
                return Err(e);
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not disable Nagle: {}", e);
        }

        match self.complete_handshake(&mut handshake, stream).await {
            Ok(()) => Ok(()),
            Err(e) => {
                handshake.fail(&e);
                Err(e)
            }
        }
    }

    /// Run the handshake over an already established stream.
    pub async fn connect_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut handshake = Handshake::begin(&self.shared.state)?;
        match self.complete_handshake(&mut handshake, stream).await {
            Ok(()) => Ok(()),
            Err(e) => {
                handshake.fail(&e);
                Err(e)
            }
        }
    }

    async fn complete_handshake<S>(&self, handshake: &mut Handshake<'_>, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = &self.shared.config;
        let (read_half, write_half) = tokio::io::split(stream);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let reader = spawn_reader(
            read_half,
            FrameBuffer::with_max_frame_length(config.max_frame_length)
                .with_max_message_length(config.max_message_length),
            config.read_buffer_size,
            inbound_tx,
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let result = async {
            handshake.advance(HandshakeState::ReaderStarted)?;

            let mut scheduler =
                WriteScheduler::with_capacity(write_half, config.write_buffer_capacity);
            scheduler.pending_mut().extend_from_slice(PROTOCOL_IDENTIFIER);
            scheduler.drain().await?;
            handshake.advance(HandshakeState::ProtocolSent)?;

            self.shared
                .commands
                .set(commands_tx)
                .map_err(|_| GridwireError::AlreadyConnected)?;
            handshake.advance(HandshakeState::Ready)?;
            Ok::<_, GridwireError>(scheduler)
        }
        .await;

        match result {
            Ok(scheduler) => {
                Driver::new(
                    commands_rx,
                    inbound_rx,
                    scheduler,
                    self.shared.state.clone(),
                    reader,
                )
                .spawn();
                Ok(())
            }
            Err(e) => {
                reader.abort();
                Err(e)
            }
        }
    }

    /// Send `request` and wait for the response carrying its correlation id.
    ///
    /// # Errors
    ///
    /// - [`GridwireError::NotConnected`] before the handshake completed
    /// - [`GridwireError::ConnectionClosed`] once the connection is closed
    /// - the connection's close error if it terminates while waiting
    pub async fn invoke<R: Request>(&self, request: R) -> Result<ClientMessage> {
        if self.state().is_closed() {
            return Err(GridwireError::ConnectionClosed);
        }
        let commands = self
            .shared
            .commands
            .get()
            .ok_or(GridwireError::NotConnected)?;

        let (reply, response) = oneshot::channel();
        commands
            .send(Command::Invoke {
                request: Box::new(request),
                reply,
            })
            .map_err(|_| GridwireError::ConnectionClosed)?;

        response.await.map_err(|_| GridwireError::ConnectionClosed)?
    }

    /// Authenticate this connection.
    pub async fn authenticate(&self, auth: Authentication) -> Result<ClientMessage> {
        self.invoke(auth).await
    }

    /// Ping the server.
    pub async fn heartbeat(&self) -> Result<()> {
        self.invoke(Heartbeat).await.map(|_| ())
    }

    /// Close the connection and wait until it is torn down. Pending
    /// invocations fail with [`GridwireError::ConnectionClosed`].
    pub async fn close(&self) {
        match self.shared.commands.get() {
            Some(commands) => {
                let _ = commands.send(Command::Close);
                self.closed().await;
            }
            None => {
                // never connected, or a handshake is still running and will
                // notice on its next step
                self.shared.state.send_replace(ConnectionState::Closed);
            }
        }
    }

    /// Wait until the connection is closed.
    pub async fn closed(&self) {
        let mut state = self.subscribe();
        let _ = state.wait_for(ConnectionState::is_closed).await;
    }
}
