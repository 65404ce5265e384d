use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

type Callback = Box<dyn FnMut() + Send>;

struct TimerEntry {
    deadline: Instant,
    /// Insertion sequence, breaking ties between equal deadlines.
    seq: u64,
    interval: Option<Duration>,
    callback: Callback,
}

// BinaryHeap is a max-heap; reverse the ordering so the earliest
// (deadline, seq) pair is at the top.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

struct WheelState {
    entries: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

/// Min-ordered set of scheduled callbacks behind a single timer source.
///
/// Where the kernel would hand the reactor one timer descriptor, the wheel
/// hands tokio one `sleep_until` future: a driver task sleeps until the
/// earliest deadline and is re-programmed through a `Notify` whenever an
/// insertion produces a new head. Callbacks run synchronously on the
/// driver task, in ascending deadline order, and may themselves add
/// timers.
#[derive(Clone)]
pub struct TimerWheel {
    state: Arc<Mutex<WheelState>>,
    notify: Arc<Notify>,
}

impl TimerWheel {
    pub fn new() -> TimerWheel {
        TimerWheel {
            state: Arc::new(Mutex::new(WheelState {
                entries: BinaryHeap::new(),
                next_seq: 0,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Schedules a one-shot callback `delay` from now.
    pub fn add(&self, delay: Duration, callback: impl FnMut() + Send + 'static) {
        self.insert(delay, None, Box::new(callback));
    }

    /// Schedules a callback `delay` from now that re-arms itself every
    /// `interval` after each expiration.
    pub fn add_repeating(
        &self,
        delay: Duration,
        interval: Duration,
        callback: impl FnMut() + Send + 'static,
    ) {
        self.insert(delay, Some(interval), Box::new(callback));
    }

    fn insert(&self, delay: Duration, interval: Option<Duration>, callback: Callback) {
        let deadline = Instant::now() + delay;
        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        let new_head = state
            .entries
            .peek()
            .map_or(true, |head| deadline < head.deadline);
        state.entries.push(TimerEntry {
            deadline,
            seq,
            interval,
            callback,
        });
        drop(state);

        if new_head {
            // Re-program the sleeping driver for the earlier deadline.
            self.notify.notify_one();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state
            .lock()
            .unwrap()
            .entries
            .peek()
            .map(|entry| entry.deadline)
    }

    /// Dispatches every entry whose deadline is at or before `now`, in
    /// ascending deadline order. Repeating entries are re-inserted at
    /// `deadline + interval`, anchored to the schedule rather than to the
    /// dispatch time. The due list is detached before any callback runs,
    /// so callbacks are free to add new timers.
    pub fn process_ready(&self, now: Instant) {
        let mut due = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            while state
                .entries
                .peek()
                .is_some_and(|entry| entry.deadline <= now)
            {
                due.push(state.entries.pop().unwrap());
            }
        }

        if due.is_empty() {
            return;
        }

        let mut repeats = Vec::new();
        for mut entry in due {
            (entry.callback)();
            if let Some(interval) = entry.interval {
                entry.deadline += interval;
                repeats.push(entry);
            }
        }

        if !repeats.is_empty() {
            let mut state = self.state.lock().unwrap();
            for mut entry in repeats {
                entry.seq = state.next_seq;
                state.next_seq += 1;
                state.entries.push(entry);
            }
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Spawns the driver task that waits on the earliest deadline and
    /// dispatches ready entries.
    pub fn start(&self) -> JoinHandle<()> {
        let wheel = self.clone();
        tokio::spawn(async move {
            loop {
                match wheel.next_deadline() {
                    Some(deadline) => {
                        tokio::select! {
                            _ = time::sleep_until(deadline) => {
                                wheel.process_ready(Instant::now());
                            }
                            // A new earliest entry was inserted; recompute.
                            _ = wheel.notify.notified() => {}
                        }
                    }
                    None => wheel.notify.notified().await,
                }
            }
        })
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}
