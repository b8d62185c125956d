//! Deferred Submission Scheduler
//!
//! Staking blocks may be sealed a little ahead of their own timestamp. Rather than rejecting
//! them, the acceptor hands them to one background worker that submits each block once its
//! instant arrives. Entries fire in order of fire time, one at a time.

use crate::acceptor::import_block;
use crate::error::{Result, SealerError};
use sealer_types::{ChainEngine, SealedBlock};
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Fire time used when `now + delay` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A sealed block waiting for its fire time
struct DeferredSubmission {
    fire_at: Instant,
    /// Enqueue order, breaks ties between equal fire times
    seq: u64,
    block: SealedBlock,
}

impl PartialEq for DeferredSubmission {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for DeferredSubmission {}

impl PartialOrd for DeferredSubmission {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeferredSubmission {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

/// Handle to the deferred submission worker
///
/// Scheduling never blocks. Only [`DeferredSubmitter::close`] (or dropping the handle)
/// cancels pending submissions; there is no per-block cancellation.
pub struct DeferredSubmitter {
    sender: mpsc::UnboundedSender<DeferredSubmission>,
    worker: JoinHandle<()>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl DeferredSubmitter {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(engine: Arc<dyn ChainEngine>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = runtime.spawn(run_worker(engine, receiver));

        Ok(Self {
            sender,
            worker,
            next_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Submit `block` to the chain engine once `delay` has elapsed
    pub fn schedule(&self, block: SealedBlock, delay: Duration) -> Result<()> {
        if self.is_closed() {
            return Err(SealerError::SubmitterClosed);
        }

        let now = Instant::now();
        let entry = DeferredSubmission {
            fire_at: now.checked_add(delay).unwrap_or(now + FAR_FUTURE),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            block,
        };
        self.sender
            .send(entry)
            .map_err(|_| SealerError::SubmitterClosed)
    }

    /// Cancel every pending submission without waiting for in-flight work
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.worker.abort();
            tracing::info!("Deferred submitter closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for DeferredSubmitter {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(
    engine: Arc<dyn ChainEngine>,
    mut receiver: mpsc::UnboundedReceiver<DeferredSubmission>,
) {
    let mut queue: BinaryHeap<Reverse<DeferredSubmission>> = BinaryHeap::new();

    loop {
        let next_fire = queue.peek().map(|Reverse(entry)| entry.fire_at);

        tokio::select! {
            received = receiver.recv() => match received {
                Some(entry) => {
                    tracing::debug!(
                        "Deferring {} block #{} ({} pending)",
                        entry.block.seal_type().label(),
                        entry.block.number(),
                        queue.len() + 1
                    );
                    queue.push(Reverse(entry));
                }
                None => break,
            },
            _ = sleep_until(next_fire) => {
                let now = Instant::now();
                while let Some(entry) = pop_due(&mut queue, now) {
                    // Imports block on engine locks; keep them off the runtime threads
                    let engine = engine.clone();
                    let import = tokio::task::spawn_blocking(move || {
                        import_block(engine.as_ref(), &entry.block);
                    });
                    if let Err(e) = import.await {
                        tracing::warn!("Deferred import task failed: {}", e);
                    }
                }
            }
        }
    }

    tracing::debug!("Deferred submitter stopped, {} submissions dropped", queue.len());
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn pop_due(
    queue: &mut BinaryHeap<Reverse<DeferredSubmission>>,
    now: Instant,
) -> Option<DeferredSubmission> {
    if queue.peek()?.0.fire_at > now {
        return None;
    }
    queue.pop().map(|Reverse(entry)| entry)
}
