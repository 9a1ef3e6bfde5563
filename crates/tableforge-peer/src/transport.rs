// SPDX-License-Identifier: Apache-2.0
//! The raw byte-oriented transport a [`crate::channel::PeerChannel`] rides
//! on, plus the [`Connect`] factory that (re)establishes one.
//!
//! Both traits use native `async fn` in traits rather than `Box<dyn Transport>`
//! trait objects: a `PeerChannel` is generic over one concrete transport type
//! for its whole lifetime, so the extra indirection of a trait object buys
//! nothing here.

use std::future::Future;

use crate::PeerError;

/// A single bidirectional byte stream. One frame in, one frame out — the
/// transport does not interpret contents; framing and encoding are the
/// codec's job.
pub trait Transport: Send {
    /// Sends one already-encoded frame.
    fn send(&mut self, bytes: Vec<u8>) -> impl Future<Output = Result<(), PeerError>> + Send;
    /// Receives the next frame, blocking until one arrives or the
    /// transport is closed.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, PeerError>> + Send;
    /// Closes the transport. Best-effort; errors are not actionable here.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Establishes (or re-establishes) a [`Transport`]. A channel holds one
/// `Connect` implementation for its whole lifetime and calls it again on
/// every reconnect attempt.
pub trait Connect: Send {
    /// The transport this connector produces.
    type Transport: Transport;
    /// Attempts one connection. Called repeatedly by the channel's
    /// reconnect loop on failure, with backoff applied between attempts.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Transport, PeerError>> + Send;
}

/// An in-process transport backed by a pair of `tokio::sync::mpsc`
/// channels — used to test [`crate::channel::PeerChannel`] without a real
/// socket, and as a reference implementation for the trait.
pub mod in_memory {
    use super::Transport;
    use crate::PeerError;
    use tokio::sync::mpsc;

    /// One end of an in-memory byte-frame pipe.
    pub struct InMemoryTransport {
        tx: mpsc::Sender<Vec<u8>>,
        rx: mpsc::Receiver<Vec<u8>>,
    }

    /// Builds a connected pair: writes to one side arrive as reads on the other.
    pub fn pair(buffer: usize) -> (InMemoryTransport, InMemoryTransport) {
        let (tx_a, rx_b) = mpsc::channel(buffer);
        let (tx_b, rx_a) = mpsc::channel(buffer);
        (
            InMemoryTransport { tx: tx_a, rx: rx_a },
            InMemoryTransport { tx: tx_b, rx: rx_b },
        )
    }

    impl Transport for InMemoryTransport {
        async fn send(&mut self, bytes: Vec<u8>) -> Result<(), PeerError> {
            self.tx.send(bytes).await.map_err(|_| PeerError::TransportClosed)
        }

        async fn recv(&mut self) -> Result<Vec<u8>, PeerError> {
            self.rx.recv().await.ok_or(PeerError::TransportClosed)
        }

        async fn close(&mut self) {
            self.rx.close();
        }
    }
}
