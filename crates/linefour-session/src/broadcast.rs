//! Per-connection outbound queues and fan-out.
//!
//! Every connection owns an unbounded queue drained by its own writer
//! task. Broadcasting is therefore just an enqueue per peer: it never
//! waits on the network, so a stalled peer cannot hold up delivery to the
//! others, and the enqueue order is the order each peer sees on the wire.
//!
//! The queue also counts what is still waiting to be written. A
//! connection's reader calls [`Peer::wait_for_room`] before reading its
//! next record, so a client that floods the server without reading the
//! replies stalls itself instead of growing its queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use linefour_protocol::{Codec, ProtocolError, ServerEvent};
use linefour_transport::ConnectionId;
use tokio::sync::{Notify, mpsc};

/// An encoded record, shared between every queue it was broadcast to.
pub type Payload = Arc<[u8]>;

/// Records a connection may have waiting before its reader pauses.
pub const MAX_BACKLOG: usize = 64;

/// Shared between a peer and its receiver.
#[derive(Debug, Default)]
struct Backlog {
    queued: AtomicUsize,
    drained: Notify,
}

/// The sending side of one connection's outbound queue.
///
/// Cheap to clone; the session's connection set holds one per attached
/// connection, and the connection's own handler holds another.
#[derive(Debug, Clone)]
pub struct Peer {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Payload>,
    backlog: Arc<Backlog>,
}

impl Peer {
    /// Creates a peer for connection `id` and the receiver its writer
    /// task should drain.
    pub fn channel(id: ConnectionId) -> (Self, PeerReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backlog = Arc::new(Backlog::default());
        let receiver = PeerReceiver {
            rx,
            backlog: Arc::clone(&backlog),
        };
        (Self { id, tx, backlog }, receiver)
    }

    /// The connection this peer delivers to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues an already-encoded record. Returns `false` if the writer
    /// task is gone (the connection is closing).
    pub fn send_payload(&self, payload: Payload) -> bool {
        // Counted before the send so the receiver never sees it first.
        self.backlog.queued.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(payload).is_ok() {
            true
        } else {
            self.backlog.queued.fetch_sub(1, Ordering::AcqRel);
            false
        }
    }

    /// Encodes and queues a single event for this peer only.
    pub fn send(
        &self,
        event: &ServerEvent,
        codec: &impl Codec,
    ) -> Result<bool, ProtocolError> {
        let payload: Payload = codec.encode(event)?.into();
        Ok(self.send_payload(payload))
    }

    /// Records queued and not yet taken by the writer.
    pub fn backlog(&self) -> usize {
        self.backlog.queued.load(Ordering::Acquire)
    }

    /// Waits until the backlog is at most [`MAX_BACKLOG`], or the writer
    /// is gone.
    pub async fn wait_for_room(&self) {
        loop {
            let drained = self.backlog.drained.notified();
            if self.backlog() <= MAX_BACKLOG || self.tx.is_closed() {
                return;
            }
            drained.await;
        }
    }
}

/// Receiving end of a peer's queue, owned by that connection's writer task.
#[derive(Debug)]
pub struct PeerReceiver {
    rx: mpsc::UnboundedReceiver<Payload>,
    backlog: Arc<Backlog>,
}

impl PeerReceiver {
    /// Takes the next record, waiting if the queue is empty. Returns
    /// `None` once every [`Peer`] for this connection is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<Payload> {
        let payload = self.rx.recv().await?;
        self.taken();
        Some(payload)
    }

    /// Takes the next record if one is queued.
    pub fn try_recv(&mut self) -> Result<Payload, mpsc::error::TryRecvError> {
        let payload = self.rx.try_recv()?;
        self.taken();
        Ok(payload)
    }

    fn taken(&self) {
        self.backlog.queued.fetch_sub(1, Ordering::AcqRel);
        self.backlog.drained.notify_waiters();
    }
}

impl Drop for PeerReceiver {
    fn drop(&mut self) {
        self.rx.close();
        self.backlog.drained.notify_waiters();
    }
}

/// Encodes `event` once and queues the identical bytes for every peer in
/// `peers`, in slice order.
///
/// Delivery is best-effort per peer: a closed queue is logged and skipped.
/// Returns how many peers accepted the record.
pub fn broadcast(
    peers: &[Peer],
    event: &ServerEvent,
    codec: &impl Codec,
) -> Result<usize, ProtocolError> {
    let payload: Payload = codec.encode(event)?.into();
    let mut delivered = 0;
    for peer in peers {
        if peer.send_payload(Arc::clone(&payload)) {
            delivered += 1;
        } else {
            tracing::debug!(
                conn_id = %peer.id(),
                kind = event.kind(),
                "peer queue closed, dropping event"
            );
        }
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use linefour_protocol::{JsonCodec, Player};

    use super::*;

    fn play(column: usize, row: usize) -> ServerEvent {
        ServerEvent::Play { player: Player::One, column, row }
    }

    #[test]
    fn test_broadcast_delivers_identical_bytes_to_every_peer() {
        let (a, mut rx_a) = Peer::channel(ConnectionId::new(1));
        let (b, mut rx_b) = Peer::channel(ConnectionId::new(2));

        let delivered = broadcast(&[a, b], &play(3, 0), &JsonCodec).unwrap();

        assert_eq!(delivered, 2);
        let got_a = rx_a.try_recv().unwrap();
        let got_b = rx_b.try_recv().unwrap();
        assert_eq!(&*got_a, br#"{"type":"play","player":1,"column":3,"row":0}"#);
        assert!(Arc::ptr_eq(&got_a, &got_b), "payload should be encoded once");
    }

    #[test]
    fn test_broadcast_skips_closed_peer_and_reaches_the_rest() {
        let (a, rx_a) = Peer::channel(ConnectionId::new(1));
        let (b, mut rx_b) = Peer::channel(ConnectionId::new(2));
        drop(rx_a);

        let delivered = broadcast(&[a, b], &play(0, 0), &JsonCodec).unwrap();

        assert_eq!(delivered, 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_preserves_order_per_peer() {
        let (a, mut rx_a) = Peer::channel(ConnectionId::new(1));
        let peers = [a];

        broadcast(&peers, &play(1, 0), &JsonCodec).unwrap();
        broadcast(&peers, &ServerEvent::Win { player: Player::One }, &JsonCodec)
            .unwrap();

        let first: ServerEvent =
            serde_json::from_slice(&rx_a.try_recv().unwrap()).unwrap();
        let second: ServerEvent =
            serde_json::from_slice(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(first, play(1, 0));
        assert_eq!(second, ServerEvent::Win { player: Player::One });
    }

    #[test]
    fn test_backlog_counts_queued_and_taken() {
        let (a, mut rx_a) = Peer::channel(ConnectionId::new(1));

        broadcast(&[a.clone()], &play(0, 0), &JsonCodec).unwrap();
        a.send(&ServerEvent::error("nope"), &JsonCodec).unwrap();
        assert_eq!(a.backlog(), 2);

        rx_a.try_recv().unwrap();
        assert_eq!(a.backlog(), 1);
    }

    #[test]
    fn test_backlog_ignores_sends_to_closed_queue() {
        let (a, rx_a) = Peer::channel(ConnectionId::new(1));
        drop(rx_a);

        assert!(!a.send_payload(Arc::from(&b"x"[..])));
        assert_eq!(a.backlog(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_room_blocks_while_writer_is_stalled() {
        let (a, mut rx_a) = Peer::channel(ConnectionId::new(1));
        for _ in 0..=MAX_BACKLOG {
            a.send(&ServerEvent::error("invalid message"), &JsonCodec)
                .unwrap();
        }

        let stalled =
            tokio::time::timeout(Duration::from_millis(50), a.wait_for_room())
                .await;
        assert!(stalled.is_err(), "reader should pause over the limit");

        let waiting = tokio::spawn({
            let a = a.clone();
            async move { a.wait_for_room().await }
        });
        rx_a.recv().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("draining one record should wake the reader")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_room_returns_once_writer_is_gone() {
        let (a, rx_a) = Peer::channel(ConnectionId::new(1));
        for _ in 0..=MAX_BACKLOG {
            a.send_payload(Arc::from(&b"x"[..]));
        }

        drop(rx_a);

        tokio::time::timeout(Duration::from_secs(1), a.wait_for_room())
            .await
            .expect("a closed queue never blocks the reader");
    }

    #[test]
    fn test_peer_send_reaches_only_that_peer() {
        let (a, mut rx_a) = Peer::channel(ConnectionId::new(1));
        let (_b, mut rx_b) = Peer::channel(ConnectionId::new(2));

        assert!(a.send(&ServerEvent::error("nope"), &JsonCodec).unwrap());

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
