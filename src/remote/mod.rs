//! Command transport between launcher invocations.
//!
//! A running instance listens for UDP datagrams on the command channel;
//! a peer invocation sends a single datagram to request a shutdown. The
//! payload is protected with a symmetric cipher keyed from a per-instance
//! secret exposed through the instance link file.

mod crypto;
mod link;
mod sender;
mod server;

pub use crypto::CryptoProtection;
pub use link::CommandLink;
pub use sender::CommandSender;
pub use server::CommandServer;
