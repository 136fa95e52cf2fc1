use bitcoin::{BlockHash, Txid};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::types::{ScriptId, TxoRef};

/// Maximum events buffered per subscriber before older ones are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Semantic events describing a fully committed block, in block order:
/// spent/script/transaction per transaction, then one block event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexerEvent {
    Spent {
        outpoint: TxoRef,
        spent_by: Txid,
    },
    Script {
        script_id: ScriptId,
        tx_id: Txid,
        raw_tx: Vec<u8>,
    },
    Transaction {
        tx_id: Txid,
        raw_tx: Vec<u8>,
        block_hash: BlockHash,
    },
    Block {
        block_hash: BlockHash,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Spent,
    Script,
    Transaction,
    Block,
}

impl IndexerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            IndexerEvent::Spent { .. } => EventKind::Spent,
            IndexerEvent::Script { .. } => EventKind::Script,
            IndexerEvent::Transaction { .. } => EventKind::Transaction,
            IndexerEvent::Block { .. } => EventKind::Block,
        }
    }
}

/// Single-publisher fan-out for indexer events.
///
/// Queued batches are drained by a dedicated task, so emission happens on a
/// later scheduling tick than the connect call that queued them: subscribers
/// never observe a partially committed block and cannot re-enter the indexer
/// synchronously. Delivery is fire-and-forget, at most once per batch.
pub struct EventBus {
    queue: mpsc::UnboundedSender<Vec<IndexerEvent>>,
    sender: broadcast::Sender<IndexerEvent>,
}

impl EventBus {
    /// Must be called within a tokio runtime, which hosts the drainer task.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (queue, mut pending) = mpsc::unbounded_channel::<Vec<IndexerEvent>>();

        let fanout = sender.clone();

        tokio::spawn(async move {
            while let Some(events) = pending.recv().await {
                for event in events {
                    // send only fails when nobody is subscribed
                    let _ = fanout.send(event);
                }
            }
        });

        Self { queue, sender }
    }

    /// Hands a batch of queued events to the drainer, preserving insertion
    /// order.
    pub(crate) fn dispatch(&self, events: Vec<IndexerEvent>) {
        if self.queue.send(events).is_err() {
            debug!("event drainer gone, dropping batch");
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            kind: None,
        }
    }

    pub fn subscribe_kind(&self, kind: EventKind) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            kind: Some(kind),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of one subscription, optionally filtered to a single event
/// kind.
pub struct Subscription {
    receiver: broadcast::Receiver<IndexerEvent>,
    kind: Option<EventKind>,
}

impl Subscription {
    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<IndexerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscriber lagged, events dropped");
                }
            }
        }
    }

    /// Non-blocking variant of `recv`; `None` when no matching event is
    /// ready.
    pub fn try_recv(&mut self) -> Option<IndexerEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    fn matches(&self, event: &IndexerEvent) -> bool {
        self.kind.is_none_or(|kind| event.kind() == kind)
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    fn block_event(height: u32) -> IndexerEvent {
        IndexerEvent::Block {
            block_hash: BlockHash::from_byte_array([height as u8; 32]),
            height,
        }
    }

    fn spent_event(seed: u8) -> IndexerEvent {
        IndexerEvent::Spent {
            outpoint: TxoRef {
                tx_hash: [seed; 32],
                txo_index: 0,
            },
            spent_by: Txid::from_byte_array([seed + 1; 32]),
        }
    }

    #[tokio::test]
    async fn delivers_batch_in_insertion_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        let batch = vec![spent_event(1), block_event(0)];
        bus.dispatch(batch.clone());

        for expected in batch {
            assert_eq!(sub.recv().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn kind_filter_skips_other_events() {
        let bus = EventBus::new();
        let mut blocks = bus.subscribe_kind(EventKind::Block);

        bus.dispatch(vec![spent_event(1), spent_event(3), block_event(7)]);

        assert_eq!(blocks.recv().await, Some(block_event(7)));
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.dispatch(vec![block_event(1)]);

        // a late subscriber sees nothing from the earlier batch
        tokio::task::yield_now().await;
        let mut sub = bus.subscribe();
        assert_eq!(sub.try_recv(), None);
    }
}
