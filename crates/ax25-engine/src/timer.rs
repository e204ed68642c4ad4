use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use ax25_proto::Address;

use crate::link::LinkKey;

/// Which of a session's two timers fired (spec §4.9, §5: T1 retransmit,
/// T3 idle keepalive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    T1,
    T3,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Entry {
    fire_at: Instant,
    key: LinkKey,
    kind: TimerKind,
    generation: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest fire time.
        other.fire_at.cmp(&self.fire_at)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single min-heap of absolute fire times feeding the coordinator's
/// T1/T3 timers (spec §4.9: "Timers are implemented as a single
/// min-heap keyed on absolute fire time").
///
/// `StartT1`/`StopT1`/`StartT3`/`StopT3` never search or remove a heap
/// entry directly — each `(LinkKey, TimerKind)` carries a generation
/// counter, bumped on every `schedule`/`cancel`, so a popped entry whose
/// generation no longer matches the live one is simply discarded as
/// stale rather than fired.
#[derive(Default)]
pub struct TimerHeap {
    heap: BinaryHeap<Entry>,
    live: HashMap<(LinkKey, TimerKind), u64>,
}

impl TimerHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: LinkKey, kind: TimerKind, fire_at: Instant) {
        let generation = self.live.get(&(key.clone(), kind)).copied().unwrap_or(0) + 1;
        self.live.insert((key.clone(), kind), generation);
        self.heap.push(Entry { fire_at, key, kind, generation });
    }

    /// Invalidate any pending timer of this kind for this link (a
    /// `StopT1`/`StopT3` action). A later `pop_ready` silently drops it.
    pub fn cancel(&mut self, key: &LinkKey, kind: TimerKind) {
        if let Some(generation) = self.live.get_mut(&(key.clone(), kind)) {
            *generation += 1;
        }
    }

    /// Drain every timer whose fire time has passed, discarding stale
    /// (cancelled/superseded) entries along the way.
    pub fn pop_ready(&mut self, now: Instant) -> Vec<(LinkKey, TimerKind)> {
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.fire_at > now {
                break;
            }
            let entry = self.heap.pop().expect("just peeked");
            let still_live = self.live.get(&(entry.key.clone(), entry.kind)).copied() == Some(entry.generation);
            if still_live {
                fired.push((entry.key, entry.kind));
            }
        }
        fired
    }

    pub fn next_fire(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.fire_at)
    }

    /// Drop every pending timer for a link (session teardown).
    pub fn clear_link(&mut self, key: &LinkKey) {
        self.live.remove(&(key.clone(), TimerKind::T1));
        self.live.remove(&(key.clone(), TimerKind::T3));
    }
}
