// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Deferred note triggers. Every queued note carries its own cancel handle so
//! that pending notes can be abandoned before they fire.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::playsync::CancelHandle;

/// A note waiting to be played.
pub struct ScheduledNote {
    due: Duration,
    seq: u64,
    note: String,
    cancel_handle: CancelHandle,
}

impl ScheduledNote {
    /// When the note should fire.
    pub fn due(&self) -> Duration {
        self.due
    }

    /// The note identifier to play.
    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_handle.is_cancelled()
    }
}

impl PartialEq for ScheduledNote {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduledNote {}

impl PartialOrd for ScheduledNote {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledNote {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Handle to a scheduled chord. Holds one cancel handle per queued note.
#[derive(Clone)]
pub struct ChordHandle {
    notes: Vec<(String, CancelHandle)>,
}

impl ChordHandle {
    /// Cancels every note of the chord that hasn't fired yet.
    pub fn cancel(&self) {
        for (_, cancel_handle) in self.notes.iter() {
            cancel_handle.cancel();
        }
    }

    /// The notes of the chord in the order they will fire.
    pub fn notes(&self) -> Vec<&str> {
        self.notes.iter().map(|(note, _)| note.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Queue of notes ordered by due time, then by insertion order.
#[derive(Default)]
pub struct Timeline {
    queue: BinaryHeap<Reverse<ScheduledNote>>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Timeline {
        Timeline::default()
    }

    /// Queues a single note and returns its cancel handle.
    pub fn schedule(&mut self, note: &str, due: Duration) -> CancelHandle {
        let cancel_handle = CancelHandle::new();
        self.queue.push(Reverse(ScheduledNote {
            due,
            seq: self.next_seq,
            note: note.to_string(),
            cancel_handle: cancel_handle.clone(),
        }));
        self.next_seq += 1;
        cancel_handle
    }

    /// Queues notes `stagger` apart, the first at `start`.
    pub fn schedule_staggered<S: AsRef<str>>(
        &mut self,
        notes: &[S],
        start: Duration,
        stagger: Duration,
    ) -> ChordHandle {
        let notes = notes
            .iter()
            .enumerate()
            .map(|(index, note)| {
                let offset = u32::try_from(index)
                    .ok()
                    .and_then(|index| stagger.checked_mul(index))
                    .unwrap_or(Duration::MAX);
                let due = start.saturating_add(offset);
                let note = note.as_ref();
                (note.to_string(), self.schedule(note, due))
            })
            .collect();
        ChordHandle { notes }
    }

    /// Removes and returns every note due at or before `now` that hasn't been
    /// cancelled, in firing order.
    pub fn pop_due(&mut self, now: Duration) -> Vec<ScheduledNote> {
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(next)| next.due <= now)
        {
            if let Some(Reverse(next)) = self.queue.pop() {
                if !next.is_cancelled() {
                    due.push(next);
                }
            }
        }
        due
    }

    /// Cancels and drops every pending note. Returns how many were still live.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for Reverse(scheduled) in self.queue.drain() {
            if !scheduled.is_cancelled() {
                scheduled.cancel_handle.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Pending notes that haven't been cancelled, in firing order.
    pub fn pending(&self) -> Vec<(Duration, &str)> {
        let mut pending: Vec<&ScheduledNote> = self
            .queue
            .iter()
            .map(|Reverse(scheduled)| scheduled)
            .filter(|scheduled| !scheduled.is_cancelled())
            .collect();
        pending.sort();
        pending
            .into_iter()
            .map(|scheduled| (scheduled.due, scheduled.note()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn notes(scheduled: Vec<ScheduledNote>) -> Vec<String> {
        scheduled.iter().map(|s| s.note().to_string()).collect()
    }

    #[test]
    fn test_staggered_due_times() {
        let mut timeline = Timeline::new();
        let chord = timeline.schedule_staggered(&["C4", "E4", "G4"], ms(0), ms(100));

        assert_eq!(chord.notes(), vec!["C4", "E4", "G4"]);
        assert_eq!(
            timeline.pending(),
            vec![(ms(0), "C4"), (ms(100), "E4"), (ms(200), "G4")]
        );
    }

    #[test]
    fn test_huge_stagger_saturates() {
        let mut timeline = Timeline::new();
        timeline.schedule_staggered(&["C4", "E4", "G4"], ms(10), Duration::MAX);

        assert_eq!(
            timeline.pending(),
            vec![
                (ms(10), "C4"),
                (Duration::MAX, "E4"),
                (Duration::MAX, "G4")
            ]
        );
        assert_eq!(notes(timeline.pop_due(ms(10))), vec!["C4"]);
    }

    #[test]
    fn test_pop_due_in_order() {
        let mut timeline = Timeline::new();
        timeline.schedule_staggered(&["C4", "E4", "G4"], ms(0), ms(100));

        assert_eq!(notes(timeline.pop_due(ms(0))), vec!["C4"]);
        assert!(timeline.pop_due(ms(99)).is_empty());
        assert_eq!(notes(timeline.pop_due(ms(250))), vec!["E4", "G4"]);
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_equal_due_times_keep_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule("B4", ms(10));
        timeline.schedule("A4", ms(10));
        timeline.schedule("C4", ms(5));

        assert_eq!(notes(timeline.pop_due(ms(10))), vec!["C4", "B4", "A4"]);
    }

    #[test]
    fn test_cancelled_chord_never_fires() {
        let mut timeline = Timeline::new();
        let first = timeline.schedule_staggered(&["C4", "E4"], ms(0), ms(100));
        timeline.schedule_staggered(&["D4"], ms(50), ms(100));

        assert_eq!(notes(timeline.pop_due(ms(0))), vec!["C4"]);
        first.cancel();
        assert_eq!(timeline.pending(), vec![(ms(50), "D4")]);
        assert_eq!(notes(timeline.pop_due(ms(500))), vec!["D4"]);
    }

    #[test]
    fn test_cancel_all() {
        let mut timeline = Timeline::new();
        let chord = timeline.schedule_staggered(&["C4", "E4", "G4"], ms(0), ms(100));
        timeline.pop_due(ms(0));

        assert_eq!(timeline.cancel_all(), 2);
        assert!(timeline.is_empty());
        assert!(timeline.pop_due(ms(1000)).is_empty());

        // The chord handle observes the cancellation too.
        chord.cancel();
    }
}
