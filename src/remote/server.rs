//! UDP command server.

use crate::constants::MAX_PACKET_LENGTH;
use crate::error::{Error, Result};
use crate::remote::CryptoProtection;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::debug;

/// Handler invoked with a decoded command payload and its origin.
pub type CommandHandler = dyn Fn(&str, SocketAddr) + Send + Sync;

/// Handler invoked when receiving fails.
pub type ErrorHandler = dyn Fn(&Error) + Send + Sync;

/// Receives commands via UDP packets.
///
/// A single dedicated thread blocks on the socket and runs the command
/// handler synchronously for each successfully decoded datagram. Closing
/// the server stops the thread; a close-induced wakeup never reaches the
/// error handler.
pub struct CommandServer {
    address: SocketAddr,
    closed: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl CommandServer {
    /// Binds the given `host:port` address (port 0 auto-assigns) and starts
    /// receiving.
    pub fn open(
        address: &str,
        protection: CryptoProtection,
        on_command: Arc<CommandHandler>,
        on_error: Arc<ErrorHandler>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(address)
            .map_err(|e| Error::Transport(format!("could not bind {address}: {e}")))?;

        let address = socket
            .local_addr()
            .map_err(|e| Error::Transport(format!("could not resolve the bound address: {e}")))?;

        let socket = Arc::new(socket);
        let closed = Arc::new(AtomicBool::new(false));

        let receiver = {
            let socket = Arc::clone(&socket);
            let closed = Arc::clone(&closed);

            std::thread::Builder::new()
                .name("command-server".to_string())
                .spawn(move || listen(&socket, &closed, &protection, &on_command, &on_error))
                .map_err(|e| Error::Transport(format!("could not start the receiver: {e}")))?
        };

        Ok(Self {
            address,
            closed,
            receiver: Some(receiver),
        })
    }

    /// Returns the bound address with the resolved port.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Stops receiving and waits for the receiver thread to finish.
    pub fn close(&mut self) {
        let Some(receiver) = self.receiver.take() else {
            return;
        };

        self.closed.store(true, Ordering::SeqCst);

        // recv has no portable out-of-band interruption, so nudge the
        // receiver with an empty datagram to observe the closed flag
        if let Ok(nudge) = UdpSocket::bind(("127.0.0.1", 0)) {
            let target = match self.address.ip().is_unspecified() {
                true => SocketAddr::from(([127, 0, 0, 1], self.address.port())),
                false => self.address,
            };
            let _ = nudge.send_to(&[], target);
        }

        let _ = receiver.join();
        debug!("command link closed");
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.close();
    }
}

fn listen(
    socket: &UdpSocket,
    closed: &AtomicBool,
    protection: &CryptoProtection,
    on_command: &Arc<CommandHandler>,
    on_error: &Arc<ErrorHandler>,
) {
    let mut buffer = vec![0u8; MAX_PACKET_LENGTH];

    loop {
        let (length, origin) = match socket.recv_from(&mut buffer) {
            Ok(received) => received,
            Err(e) => {
                if closed.load(Ordering::SeqCst) {
                    return;
                }

                on_error(&Error::Transport(format!("receiving failed: {e}")));
                return;
            }
        };

        if closed.load(Ordering::SeqCst) {
            return;
        }

        match protection.decrypt(&buffer[..length]) {
            Ok(command) => on_command(&command, origin),
            Err(e) => on_error(&e),
        }
    }
}
