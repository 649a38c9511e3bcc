//! One-shot command sending.

use crate::error::{Error, Result};
use crate::remote::CryptoProtection;
use std::net::UdpSocket;

/// Sends commands via UDP packets.
///
/// The sender is one-shot friendly: every send opens an ephemeral socket,
/// transmits a single datagram and closes. No acknowledgement is expected.
pub struct CommandSender {
    protection: CryptoProtection,
    address: String,
}

impl CommandSender {
    /// Creates a new instance sending to the given `host:port` address.
    pub fn new(address: String, protection: CryptoProtection) -> Self {
        Self { protection, address }
    }

    /// Encrypts and sends the command.
    pub fn send(&self, command: &str) -> Result<()> {
        let message = self.protection.encrypt(command);

        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|e| Error::Transport(format!("could not open a socket: {e}")))?;

        socket
            .send_to(&message, self.address.as_str())
            .map_err(|e| Error::Transport(format!("could not send to {}: {e}", self.address)))?;

        Ok(())
    }

    /// Returns the target address.
    pub fn address(&self) -> &str {
        &self.address
    }
}
