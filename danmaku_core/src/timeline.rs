// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Show-time ordered comment store with an admission cursor.
//!
//! The [`Timeline`] keeps every comment sorted ascending by its canonical
//! timestamp. A single forward-only cursor marks the next comment not yet
//! considered for admission. [`Timeline::drain`] hands out due comments and
//! advances the cursor; [`Timeline::seek`] repositions it by binary search.

use alloc::vec::Vec;

use kurbo::Size;

use crate::clock::Clock;
use crate::comment::Comment;

/// Returns the first index whose key is greater than `key`.
///
/// `items` must be sorted ascending by `key_of`. Every element before the
/// returned index has a key `<= key`; the element at the index, if any, has
/// a key `> key`.
pub fn upper_bound<T>(items: &[T], key: f64, key_of: impl Fn(&T) -> f64) -> usize {
    items.partition_point(|item| key_of(item) <= key)
}

/// Ordered comment store.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    comments: Vec<Comment>,
    cursor: usize,
}

impl Timeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Whether the timeline is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Index of the next comment to be considered for admission.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All comments, in timeline order.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Replaces the contents with `comments`, stable-sorted by show time, and
    /// rewinds the cursor.
    pub(crate) fn load(&mut self, mut comments: Vec<Comment>) {
        comments.sort_by(|a, b| a.show_time().total_cmp(&b.show_time()));
        self.comments = comments;
        self.cursor = 0;
    }

    /// Inserts a newly emitted comment and returns its index.
    ///
    /// Unbound timelines are arrival-ordered, so the comment is appended.
    /// On a bound clock a comment without a show time is stamped with the
    /// current media time and inserted at the cursor, making it the next one
    /// due. A comment with an explicit show time is placed by binary search;
    /// if that lands before the cursor, the cursor moves forward by one so it
    /// keeps pointing at the same not-yet-considered comment.
    pub(crate) fn insert(&mut self, mut comment: Comment, clock: &Clock) -> usize {
        if !clock.is_bound() {
            self.comments.push(comment);
            return self.comments.len() - 1;
        }
        let index = match comment.time() {
            None => {
                comment.set_time(clock.current_time());
                self.cursor
            }
            Some(time) => {
                let index = upper_bound(&self.comments, time, Comment::show_time);
                if index < self.cursor {
                    self.cursor += 1;
                }
                index
            }
        };
        self.comments.insert(index, comment);
        index
    }

    /// Repositions the cursor for a jump to `current_time`.
    ///
    /// The cursor lands one slot before the first comment later than
    /// `current_time`, so the most recent past comment is admitted again.
    pub fn seek(&mut self, current_time: f64) {
        let index = upper_bound(&self.comments, current_time, Comment::show_time);
        self.cursor = index.saturating_sub(1);
    }

    /// Yields comments due at `current_time`, advancing the cursor.
    ///
    /// Comments older than `duration` are skipped (the cursor still moves
    /// past them). Iteration stops at the first comment whose canonical
    /// timestamp is not before `current_time`.
    pub(crate) fn drain<'a>(
        &'a mut self,
        clock: &'a Clock,
        current_time: f64,
        duration: f64,
    ) -> Drain<'a> {
        Drain {
            timeline: self,
            clock,
            current_time,
            duration,
            skipped: 0,
        }
    }

    /// Records a measured size on the stored comment so re-admissions after a
    /// seek reuse it.
    pub(crate) fn record_size(&mut self, index: usize, size: Size) {
        if let Some(comment) = self.comments.get_mut(index) {
            comment.set_size(size);
        }
    }
}

/// Lazy iterator over due comments, created by [`Timeline::drain`].
///
/// Yields `(index, comment)` pairs; the comment is a copy whose visual state
/// belongs to the live set.
#[derive(Debug)]
pub struct Drain<'a> {
    timeline: &'a mut Timeline,
    clock: &'a Clock,
    current_time: f64,
    duration: f64,
    skipped: usize,
}

impl Drain<'_> {
    /// Number of comments passed over because they were too old.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Drain<'_> {
    type Item = (usize, Comment);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = self.timeline.cursor;
            let comment = self.timeline.comments.get(index)?;
            let stamp = self.clock.timestamp_of(comment);
            if stamp >= self.current_time {
                return None;
            }
            self.timeline.cursor += 1;
            // Backward jumps and stalls can leave stale comments behind the
            // clock; they are dropped rather than shown late.
            if self.current_time - stamp > self.duration {
                self.skipped += 1;
                continue;
            }
            return Some((index, comment.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualMedia};
    use crate::comment::{CommentId, CommentSpec, Mode};
    use alloc::vec;

    fn at(id: u64, time: f64) -> Comment {
        Comment::from_spec(CommentId(id), CommentSpec::new("c").at(time), 0.0)
    }

    fn times(t: &Timeline) -> Vec<f64> {
        t.comments().iter().map(Comment::show_time).collect()
    }

    fn bound_clock(media_time: f64) -> Clock {
        let media = ManualMedia::new();
        media.set_time(media_time);
        Clock::bound(ManualClock::new(1000.0), media)
    }

    #[test]
    fn upper_bound_partitions() {
        let keys = [1.0, 2.0, 2.0, 2.0, 5.0];
        for (key, expected) in [(0.0, 0), (1.0, 1), (1.5, 1), (2.0, 4), (4.9, 4), (5.0, 5), (9.0, 5)] {
            let i = upper_bound(&keys, key, |k| *k);
            assert_eq!(i, expected, "key {key}");
            assert!(keys[..i].iter().all(|k| *k <= key), "prefix must be <= {key}");
            assert!(keys[i..].iter().all(|k| *k > key), "suffix must be > {key}");
        }
        assert_eq!(upper_bound::<f64>(&[], 3.0, |k| *k), 0);
    }

    #[test]
    fn load_sorts_stably_and_normalizes_mode() {
        let mut t = Timeline::new();
        let specs = [(1.0, "a"), (3.0, "b"), (2.0, "c"), (2.0, "d")];
        t.load(
            specs
                .iter()
                .enumerate()
                .map(|(i, (time, text))| {
                    Comment::from_spec(CommentId(i as u64), CommentSpec::new(*text).at(*time), 0.0)
                })
                .collect(),
        );
        assert_eq!(times(&t), vec![1.0, 2.0, 2.0, 3.0]);
        let texts: Vec<&str> = t.comments().iter().map(Comment::text).collect();
        assert_eq!(texts, vec!["a", "c", "d", "b"], "ties keep input order");
        assert!(t.comments().iter().all(|c| c.mode() == Mode::Rtl));
        assert_eq!(t.cursor(), 0);
    }

    #[test]
    fn seek_rewinds_one_slot() {
        let mut t = Timeline::new();
        t.load(vec![at(0, 5.0), at(1, 9.0), at(2, 11.0), at(3, 15.0)]);
        t.seek(10.0);
        assert_eq!(t.cursor(), 1, "first later comment is at index 2");
        assert_eq!(t.comments()[t.cursor()].show_time(), 9.0);

        t.seek(0.0);
        assert_eq!(t.cursor(), 0);
        t.seek(100.0);
        assert_eq!(t.cursor(), 3);
    }

    #[test]
    fn unbound_insert_appends() {
        let clock = Clock::unbound(ManualClock::new(0.0));
        let mut t = Timeline::new();
        t.load(vec![at(0, 5.0)]);
        let index = t.insert(at(1, 1.0), &clock);
        assert_eq!(index, 1);
        assert_eq!(times(&t), vec![5.0, 1.0]);
    }

    #[test]
    fn bound_insert_without_time_lands_at_cursor() {
        let clock = bound_clock(7.0);
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0), at(1, 2.0), at(2, 20.0)]);
        t.seek(2.5);
        let cursor = t.cursor();
        let c = Comment::from_spec(CommentId(9), CommentSpec::new("now"), 0.0);
        let index = t.insert(c, &clock);
        assert_eq!(index, cursor);
        assert_eq!(t.cursor(), cursor, "cursor unaffected");
        assert_eq!(t.comments()[index].time(), Some(7.0));
    }

    #[test]
    fn bound_insert_with_time_is_ordered() {
        let clock = bound_clock(0.0);
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0), at(1, 3.0)]);
        t.insert(at(2, 2.0), &clock);
        t.insert(at(3, 3.0), &clock);
        assert_eq!(times(&t), vec![1.0, 2.0, 3.0, 3.0]);
        assert_eq!(t.comments()[3].id(), CommentId(3), "equal keys insert after");
    }

    #[test]
    fn backdated_insert_advances_cursor() {
        let clock = bound_clock(10.0);
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0), at(1, 5.0), at(2, 9.0), at(3, 12.0)]);
        t.seek(10.0);
        assert_eq!(t.cursor(), 2);

        // Lands at index 1, before the cursor.
        t.insert(at(4, 2.0), &clock);
        assert_eq!(t.cursor(), 3);
        assert_eq!(t.comments()[3].show_time(), 9.0, "cursor tracks the same comment");
    }

    #[test]
    fn backdated_insert_at_cursor_skips_admission() {
        let clock = bound_clock(10.0);
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0), at(1, 9.0), at(2, 12.0)]);
        t.seek(10.0);
        assert_eq!(t.cursor(), 1);

        // Show time 9.5 lands at index 2 (after the cursor): cursor stays.
        t.insert(at(3, 9.5), &clock);
        assert_eq!(t.cursor(), 1);

        // Show time 0.5 lands at index 0 (before the cursor): the cursor moves
        // on, and the new comment is never drained.
        t.insert(at(4, 0.5), &clock);
        assert_eq!(t.cursor(), 2);
        let due: Vec<CommentId> = t.drain(&clock, 10.0, 4.0).map(|(_, c)| c.id()).collect();
        assert_eq!(due, vec![CommentId(1), CommentId(3)]);
    }

    #[test]
    fn drain_stops_at_future_and_skips_stale() {
        let clock = bound_clock(0.0);
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0), at(1, 8.0), at(2, 9.5), at(3, 10.0), at(4, 11.0)]);

        let mut drain = t.drain(&clock, 10.0, 1.0);
        let due: Vec<usize> = drain.by_ref().map(|(i, _)| i).collect();
        assert_eq!(drain.skipped(), 2);
        assert_eq!(due, vec![2], "only 9.5 is due and fresh");
        assert_eq!(t.cursor(), 3, "stops at the first comment not before now");

        let due: Vec<usize> = t.drain(&clock, 10.0, 1.0).map(|(i, _)| i).collect();
        assert!(due.is_empty(), "drain is idempotent at a fixed time");
    }

    #[test]
    fn drain_unbound_uses_arrival() {
        let clock = Clock::unbound(ManualClock::new(0.0));
        let mut t = Timeline::new();
        t.insert(Comment::from_spec(CommentId(0), CommentSpec::new("a").at(99.0), 3.0), &clock);
        t.insert(Comment::from_spec(CommentId(1), CommentSpec::new("b"), 4.0), &clock);
        let due: Vec<CommentId> = t.drain(&clock, 3.5, 4.0).map(|(_, c)| c.id()).collect();
        assert_eq!(due, vec![CommentId(0)]);
    }

    #[test]
    fn record_size_persists() {
        let mut t = Timeline::new();
        t.load(vec![at(0, 1.0)]);
        t.record_size(0, Size::new(10.0, 5.0));
        t.record_size(0, Size::new(1.0, 1.0));
        assert_eq!(t.comments()[0].size(), Some(Size::new(10.0, 5.0)));
    }
}
