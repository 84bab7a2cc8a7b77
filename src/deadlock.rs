//! Deadlock detection log and local verdict.
//!
//! Limits: this diagnoses only a tight two-party receive/receive cycle.
//! It is not a general waits-for graph and callers must not treat a
//! `false` verdict as proof of progress.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    /// A probe arrived from peer `peer` saying "I'm waiting on you for `(tag, count)`".
    ProbeRecv { peer: i32, tag: i32, count: i32 },
    /// We sent peer `peer` a real (non-probe) message keyed `(tag, count)`.
    Sent { peer: i32, tag: i32, count: i32 },
}

/// Caps entries per peer so the log can't grow without bound. A
/// probe/sent pair earlier than the cap has already been resolved one
/// way or the other by the time it would be evicted, since `check`
/// always scans from the *earliest* matching probe.
const MAX_ENTRIES_PER_PEER: usize = 256;

#[derive(Default)]
pub struct DeadlockLog {
    events: VecDeque<Event>,
}

impl DeadlockLog {
    pub fn new() -> Self {
        DeadlockLog { events: VecDeque::new() }
    }

    pub fn record_probe(&mut self, peer: i32, tag: i32, count: i32) {
        self.push(Event::ProbeRecv { peer, tag, count });
    }

    pub fn record_sent(&mut self, peer: i32, tag: i32, count: i32) {
        self.push(Event::Sent { peer, tag, count });
    }

    fn push(&mut self, ev: Event) {
        self.events.push_back(ev);
        let peer = match ev {
            Event::ProbeRecv { peer, .. } | Event::Sent { peer, .. } => peer,
        };
        let per_peer = self.events.iter().filter(|e| event_peer(e) == peer).count();
        if per_peer > MAX_ENTRIES_PER_PEER {
            if let Some(idx) = self.events.iter().position(|e| event_peer(e) == peer) {
                self.events.remove(idx);
            }
        }
    }

    /// Finds the earliest `ProbeRecv { peer, tag, count }` in the log. If
    /// none exists, the verdict is `false`. Otherwise, scans forward from
    /// that point: if a later `Sent` to the same peer with the same key
    /// exists, we already responded and the verdict is `false`; else
    /// `true`.
    pub fn check(&self, peer: i32, tag: i32, count: i32) -> bool {
        let Some(start) = self.events.iter().position(|e| {
            matches!(e, Event::ProbeRecv { peer: p, tag: t, count: c } if *p == peer && *t == tag && *c == count)
        }) else {
            return false;
        };
        !self.events.iter().skip(start + 1).any(|e| {
            matches!(e, Event::Sent { peer: p, tag: t, count: c } if *p == peer && *t == tag && *c == count)
        })
    }
}

fn event_peer(ev: &Event) -> i32 {
    match ev {
        Event::ProbeRecv { peer, .. } | Event::Sent { peer, .. } => *peer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_probe_means_no_deadlock() {
        let log = DeadlockLog::new();
        assert!(!log.check(1, 5, 4));
    }

    #[test]
    fn unanswered_probe_is_a_deadlock() {
        let mut log = DeadlockLog::new();
        log.record_probe(1, 5, 4);
        assert!(log.check(1, 5, 4));
    }

    #[test]
    fn a_later_matching_send_cancels_the_cycle() {
        let mut log = DeadlockLog::new();
        log.record_probe(1, 5, 4);
        log.record_sent(1, 5, 4);
        assert!(!log.check(1, 5, 4));
    }

    #[test]
    fn unrelated_sends_do_not_cancel() {
        let mut log = DeadlockLog::new();
        log.record_probe(1, 5, 4);
        log.record_sent(1, 6, 4); // different tag
        log.record_sent(2, 5, 4); // different peer
        assert!(log.check(1, 5, 4));
    }

    #[test]
    fn only_the_earliest_probe_counts() {
        let mut log = DeadlockLog::new();
        log.record_probe(1, 5, 4);
        log.record_sent(1, 5, 4);
        log.record_probe(1, 5, 4); // second cycle begins
        assert!(log.check(1, 5, 4));
    }
}
