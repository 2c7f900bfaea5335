//! UDP transport for chatbox OSC messages.
//!
//! The transmitter binds one socket to an ephemeral local port and sends each
//! message as a single datagram to the current destination.  Sending is
//! fire-and-forget: UDP gives no delivery feedback, and failures surface as
//! [`TransmitError`] for the caller to log.
//!
//! The destination and the outgoing encode buffer sit behind separate locks,
//! so changing the destination never waits on an in-flight send.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chatbox_core::{
    encode_message_into, input_message, parse_destination, typing_message, DestinationError,
    OscMessage,
};
use thiserror::Error;
use tracing::{info, trace};

use crate::application::send_coordinator::{ChatboxTransmitter, TransmitError};

/// Error type for transport setup.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Sends chatbox messages as OSC-over-UDP datagrams.
#[derive(Debug)]
pub struct UdpTransmitter {
    socket: UdpSocket,
    destination: Mutex<Option<SocketAddr>>,
    buffer: Mutex<Vec<u8>>,
}

impl UdpTransmitter {
    /// Binds a socket on an ephemeral port of all IPv4 interfaces.
    ///
    /// The transmitter starts without a destination.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the socket cannot be bound.
    pub fn bind() -> Result<Self, TransportError> {
        Self::bind_to(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    }

    /// Binds a socket on `local`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the socket cannot be bound.
    pub fn bind_to(local: SocketAddr) -> Result<Self, TransportError> {
        let socket =
            UdpSocket::bind(local).map_err(|source| TransportError::BindFailed { addr: local, source })?;
        if let Ok(addr) = socket.local_addr() {
            info!("chatbox transport bound on {addr}");
        }
        Ok(Self {
            socket,
            destination: Mutex::new(None),
            buffer: Mutex::new(Vec::with_capacity(256)),
        })
    }

    /// The local address of the socket.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the address cannot be queried.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Parses `destination` and, if valid, makes it the send target.
    ///
    /// On error the transmitter is left without a destination, so later
    /// sends fail with [`TransmitError::NoDestination`].
    ///
    /// # Errors
    ///
    /// Returns the [`DestinationError`] from parsing.
    pub fn set_destination(&self, destination: &str) -> Result<SocketAddr, DestinationError> {
        let parsed = parse_destination(destination);
        let mut current = lock(&self.destination);
        match parsed {
            Ok(addr) => {
                *current = Some(addr);
                info!("chatbox destination set to {addr}");
                Ok(addr)
            }
            Err(e) => {
                *current = None;
                Err(e)
            }
        }
    }

    /// The current send target, if any.
    pub fn destination(&self) -> Option<SocketAddr> {
        *lock(&self.destination)
    }

    /// Removes the send target.
    pub fn clear_destination(&self) {
        *lock(&self.destination) = None;
    }

    fn send(&self, message: &OscMessage) -> Result<(), TransmitError> {
        let target = self.destination().ok_or(TransmitError::NoDestination)?;

        let mut buffer = lock(&self.buffer);
        buffer.clear();
        encode_message_into(message, &mut buffer)?;
        let sent = self.socket.send_to(&buffer, target)?;
        trace!(address = %message.address, bytes = sent, "datagram sent to {target}");
        Ok(())
    }
}

impl ChatboxTransmitter for UdpTransmitter {
    fn send_input(&self, text: &str, notify: bool) -> Result<(), TransmitError> {
        self.send(&input_message(text, notify))
    }

    fn send_typing(&self, typing: bool) -> Result<(), TransmitError> {
        self.send(&typing_message(typing))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
