use std::sync::Arc;

use tracing::debug;

use crate::aof::Aof;
use crate::commands::executable::{Context, Executable};
use crate::commands::Command;
use crate::frame::Frame;
use crate::stats::Stats;
use crate::store::Store;

/// Keys examined per round of the background expiry sweep.
pub const EXPIRE_SAMPLE_SIZE: usize = 20;

/// Upper bound on sweep rounds per tick, so a keyspace full of expired
/// entries cannot monopolize the loop.
const MAX_SWEEP_ROUNDS: usize = 16;

/// The key-value engine: owns the keyspace, dispatches parsed requests to
/// command handlers, feeds the durability log, and runs the background
/// expiry sweep.
///
/// The engine is shared behind a single mutex. Holding it for the whole
/// of a dispatch (or a whole transaction) is what serializes clients
/// against each other and against the sweep.
pub struct Engine {
    store: Store,
    stats: Arc<Stats>,
    aof: Option<Arc<Aof>>,
}

impl Engine {
    pub fn new(stats: Arc<Stats>, aof: Option<Arc<Aof>>) -> Engine {
        Engine {
            store: Store::new(),
            stats,
            aof,
        }
    }

    /// Executes one framed request and returns the reply frame.
    ///
    /// Replayed requests do not count towards the command statistics and
    /// are never re-appended to the log.
    pub fn execute(&mut self, frame: Frame, from_replay: bool) -> Frame {
        if !from_replay {
            self.stats.command_processed();
        }

        let original = frame.clone();
        let command = match Command::try_from(frame) {
            Ok(command) => command,
            Err(err) => return Frame::Error(err.to_string()),
        };

        let should_replicate = command.should_replicate();
        let reply = match command.exec(Context {
            store: &mut self.store,
            stats: &self.stats,
        }) {
            Ok(reply) => reply,
            Err(err) => Frame::Error(format!("ERR {err}")),
        };

        if should_replicate && !from_replay {
            if let Some(aof) = &self.aof {
                aof.append(&original);
            }
        }

        reply
    }

    /// Runs a queued transaction. Every queued request executes
    /// back-to-back under the engine lock, so no other client's command
    /// can interleave; failures become error entries in the reply array.
    pub fn execute_transaction(&mut self, queue: Vec<Frame>) -> Frame {
        let mut replies = Vec::with_capacity(queue.len());
        for frame in queue {
            replies.push(self.execute(frame, false));
        }
        Frame::Array(replies)
    }

    /// Re-applies the commands recovered from the durability log.
    pub fn replay(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            self.execute(frame, true);
        }
    }

    /// One tick of the sampled background expiry sweep: examine up to
    /// `EXPIRE_SAMPLE_SIZE` random keys and delete the expired ones.
    /// When at least a quarter of a sample had expired, sample again,
    /// up to `MAX_SWEEP_ROUNDS` times. Returns the number of keys
    /// removed.
    pub fn sweep_expired(&mut self) -> usize {
        let mut rng = rand::thread_rng();
        let mut total = 0;

        for _ in 0..MAX_SWEEP_ROUNDS {
            let keys = self.store.sample_keys(EXPIRE_SAMPLE_SIZE, &mut rng);
            if keys.is_empty() {
                break;
            }

            let sampled = keys.len();
            let mut expired = 0;
            for key in keys {
                if self.store.remove_if_expired(&key) {
                    expired += 1;
                }
            }
            total += expired;

            if expired * 4 < sampled {
                break;
            }
        }

        if total > 0 {
            debug!(expired = total, "background sweep removed expired keys");
        }
        total
    }

    pub fn num_keys(&self) -> usize {
        self.store.len()
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}
