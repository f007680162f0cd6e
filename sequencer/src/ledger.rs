use crate::clock::Clock;
use crate::config::SequencerConfig;
use escrow::{Command, Escrow, EscrowError, EventRecord, Receipt, Timestamp};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequencerError {
    #[error("{kind} rejected: {source}")]
    Rejected {
        kind: &'static str,
        #[source]
        source: EscrowError,
    },
    #[error("Sequencer is not running")]
    Closed,
    #[error("Sequencer worker failed: {0}")]
    Worker(String),
}

/// Receipt stamped with the block that included the command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencedReceipt {
    pub height: u64,
    pub at: Timestamp,
    pub receipt: Receipt,
}

type Reply = oneshot::Sender<Result<SequencedReceipt, SequencerError>>;

struct Request {
    command: Command,
    reply: Reply,
}

/// Cloneable handle onto the single task that orders escrow commands
#[derive(Clone)]
pub struct Sequencer {
    sender: mpsc::Sender<Request>,
    state: Arc<Mutex<Escrow>>,
    events: broadcast::Sender<EventRecord>,
    height: Arc<AtomicU64>,
}

impl Sequencer {
    /// Start the sequencing loop. The loop stops once every handle is dropped.
    pub fn spawn(
        escrow: Escrow,
        clock: Arc<dyn Clock>,
        config: &SequencerConfig,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (events, _) = broadcast::channel(config.event_buffer);
        let sequencer = Self {
            sender,
            state: Arc::new(Mutex::new(escrow)),
            events,
            height: Arc::new(AtomicU64::new(0)),
        };

        let worker = Worker {
            state: Arc::clone(&sequencer.state),
            events: sequencer.events.clone(),
            height: Arc::clone(&sequencer.height),
            clock,
            last_at: 0,
        };
        let handle = tokio::spawn(worker.run(receiver));
        info!(
            queue_capacity = config.queue_capacity,
            event_buffer = config.event_buffer,
            "Sequencer started"
        );
        (sequencer, handle)
    }

    /// Queue a command and wait for it to be applied
    pub async fn submit(&self, command: Command) -> Result<SequencedReceipt, SequencerError> {
        let (reply, receipt) = oneshot::channel();
        self.sender
            .send(Request { command, reply })
            .await
            .map_err(|_| SequencerError::Closed)?;
        receipt.await.map_err(|_| SequencerError::Closed)?
    }

    /// Read-only view of the escrow between blocks
    pub fn with_state<T>(&self, f: impl FnOnce(&Escrow) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Height of the last block produced
    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}

struct Worker {
    state: Arc<Mutex<Escrow>>,
    events: broadcast::Sender<EventRecord>,
    height: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    last_at: Timestamp,
}

impl Worker {
    async fn run(mut self, mut receiver: mpsc::Receiver<Request>) {
        while let Some(Request { command, reply }) = receiver.recv().await {
            let result = self.sequence(command).await;
            if reply.send(result).is_err() {
                debug!("Submitter went away before its receipt");
            }
        }
        info!(height = self.height.load(Ordering::SeqCst), "Sequencer stopped");
    }

    async fn sequence(&mut self, command: Command) -> Result<SequencedReceipt, SequencerError> {
        // Ledger time never runs backwards even if the clock does
        let at = self.clock.now().max(self.last_at);
        self.last_at = at;
        let kind = command.kind();

        // Proof verification is CPU-bound, keep it off the runtime threads
        let state = Arc::clone(&self.state);
        let (result, emitted) = tokio::task::spawn_blocking(move || {
            let mut escrow = state.lock();
            let before = escrow.events().len() as u64;
            let result = escrow.apply(at, command);
            (result, escrow.events_since(before).to_vec())
        })
        .await
        .map_err(|e| SequencerError::Worker(e.to_string()))?;

        let receipt = result.map_err(|source| {
            warn!(%source, at, "{} rejected", kind);
            SequencerError::Rejected { kind, source }
        })?;

        let height = self.height.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(height, at, events = emitted.len(), "{} sequenced", kind);
        for record in emitted {
            // No subscribers is fine
            let _ = self.events.send(record);
        }

        Ok(SequencedReceipt {
            height,
            at,
            receipt,
        })
    }
}
