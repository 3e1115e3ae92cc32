//! Idle-connection deadline tracking (spec.md §4.5).
//!
//! The original's `mainloop.c` keeps a `find_timer()`/`handle_expired_timers()`
//! pair whose backing structure (`timer.h`) isn't part of the retrieved
//! source; spec.md §4.5 leaves the data structure an open implementation
//! choice and specifies only the external contract: `add`, `remove`
//! (idempotent), `next_delay_ms` (for bounding the reactor's poll wait), and
//! `sweep` (collect and remove everything due). A `BinaryHeap` keyed by
//! deadline gives O(log n) insert and O(log n) pop; each entry carries a
//! generation counter so a stale heap entry left behind by `remove` is
//! silently discarded when it is eventually popped (DESIGN.md Open
//! Question resolution #3).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Opaque handle to a pending deadline, returned by `add` and passed back
/// to `remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// The raw identifier, for callers (the reactor) that need to key a
    /// side table from timer handle back to connection slab index without
    /// the wheel itself knowing anything about connections.
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct Entry {
    deadline: Instant,
    id: TimerId,
    generation: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}
impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest deadline.
        other.deadline.cmp(&self.deadline)
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tracks one deadline per live connection. Not thread-safe; each reactor
/// worker owns its own instance (spec.md §5: no cross-thread shared state).
#[derive(Default)]
pub struct TimerWheel {
    heap: BinaryHeap<Entry>,
    generations: HashMap<u64, u64>,
    next_id: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel {
            heap: BinaryHeap::new(),
            generations: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a new deadline `duration` from now. Returns a handle to
    /// later `remove` it (e.g. when the connection makes progress and its
    /// idle timer needs resetting).
    pub fn add(&mut self, duration: Duration) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        let generation = 0;
        self.generations.insert(id, generation);
        self.heap.push(Entry {
            deadline: Instant::now() + duration,
            id: TimerId(id),
            generation,
        });
        TimerId(id)
    }

    /// Cancel a pending deadline. Idempotent: removing a handle twice, or a
    /// handle already swept, is a no-op rather than an error — spec.md §4.5
    /// requires this because connection teardown and timer firing can race.
    pub fn remove(&mut self, id: TimerId) {
        if let Some(generation) = self.generations.get_mut(&id.0) {
            *generation += 1;
        }
    }

    /// Milliseconds until the next deadline, or `None` if nothing is
    /// pending. The reactor uses this to bound `poll.poll()`'s timeout so
    /// idle connections still get swept even with no socket activity.
    ///
    /// Discards stale entries (superseded by `remove`) off the top of the
    /// heap first, the same liveness check `sweep` applies — otherwise a
    /// removed entry with an earlier deadline than anything still pending
    /// would shadow the real earliest deadline and this would report
    /// `None` (infinite wait) while a live timer is in fact pending.
    pub fn next_delay_ms(&mut self) -> Option<u64> {
        while let Some(entry) = self.heap.peek() {
            if self.is_live(entry) {
                break;
            }
            self.heap.pop();
        }
        self.heap.peek().map(|entry| {
            let now = Instant::now();
            if entry.deadline <= now {
                0
            } else {
                (entry.deadline - now).as_millis() as u64
            }
        })
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.generations.get(&entry.id.0) == Some(&entry.generation)
    }

    /// Pop and return every `TimerId` whose deadline has passed, discarding
    /// stale (removed/superseded) entries along the way.
    pub fn sweep(&mut self) -> Vec<TimerId> {
        let now = Instant::now();
        let mut expired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if !self.is_live(entry) {
                self.heap.pop();
                continue;
            }
            if entry.deadline > now {
                break;
            }
            let entry = self.heap.pop().expect("peeked Some above");
            self.generations.remove(&entry.id.0);
            expired.push(entry.id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn sweep_returns_only_expired() {
        let mut wheel = TimerWheel::new();
        let soon = wheel.add(Duration::from_millis(0));
        let later = wheel.add(Duration::from_secs(60));
        sleep(Duration::from_millis(5));
        let expired = wheel.sweep();
        assert_eq!(expired, vec![soon]);
        assert!(wheel.next_delay_ms().unwrap() > 0);
        let _ = later;
    }

    #[test]
    fn remove_is_idempotent_and_suppresses_sweep() {
        let mut wheel = TimerWheel::new();
        let id = wheel.add(Duration::from_millis(0));
        wheel.remove(id);
        wheel.remove(id);
        sleep(Duration::from_millis(5));
        assert!(wheel.sweep().is_empty());
    }

    #[test]
    fn next_delay_ms_none_when_empty() {
        let mut wheel = TimerWheel::new();
        assert_eq!(wheel.next_delay_ms(), None);
    }

    #[test]
    fn next_delay_ms_skips_stale_entries_to_find_live_deadline() {
        // Mirrors the reactor's re-arm sequence: remove the old timer, add
        // a fresh one. The removed entry's deadline is earlier than the
        // replacement's but must not make next_delay_ms report "infinite".
        let mut wheel = TimerWheel::new();
        let stale = wheel.add(Duration::from_millis(0));
        wheel.remove(stale);
        let live = wheel.add(Duration::from_secs(60));
        let delay = wheel.next_delay_ms().expect("a live timer is pending");
        assert!(delay > 0);
        let _ = live;
    }
}
