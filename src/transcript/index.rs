//! Read-only segment/word index used by the sync loop.

use super::{Segment, Transcript};
use std::sync::Arc;

/// Lookup structure over a finished transcript.
///
/// Built once when acquisition completes and shared behind `Arc` with the
/// sync loop, which only reads from it.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    transcript: Arc<Transcript>,
    /// True when segments are out of order or one runs past the start of
    /// its successor; lookups then fall back to a linear scan.
    overlapping: bool,
}

impl SegmentIndex {
    pub fn new(transcript: Arc<Transcript>) -> Self {
        let overlapping = !transcript.is_sorted()
            || transcript
                .segments
                .windows(2)
                .any(|w| w[0].end() > w[1].start);

        Self {
            transcript,
            overlapping,
        }
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    pub fn segments(&self) -> &[Segment] {
        &self.transcript.segments
    }

    pub fn len(&self) -> usize {
        self.transcript.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.transcript.segments.get(index)
    }

    /// Index of the segment with `start <= time < start + duration`.
    ///
    /// When segments overlap the first containing segment wins, matching a
    /// front-to-back scan. Otherwise a binary search over the sorted starts is
    /// used.
    pub fn resolve(&self, time: f64) -> Option<usize> {
        let segments = self.segments();

        if self.overlapping {
            return segments.iter().position(|s| s.contains(time));
        }

        let after = segments.partition_point(|s| s.start <= time);
        let candidate = after.checked_sub(1)?;
        segments[candidate].contains(time).then_some(candidate)
    }

    /// Index of the word in `segment` being spoken at `time`.
    pub fn active_word(&self, segment: usize, time: f64) -> Option<usize> {
        self.get(segment)?.active_word(time)
    }
}

impl From<Transcript> for SegmentIndex {
    fn from(transcript: Transcript) -> Self {
        Self::new(Arc::new(transcript))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Word;

    fn gapped() -> SegmentIndex {
        Transcript::new(
            "vid",
            "en",
            vec![
                Segment::new("one", 0.0, 5.0),
                Segment::new("two", 5.0, 5.0),
                Segment::new("three", 12.0, 3.0),
            ],
        )
        .into()
    }

    #[test]
    fn test_resolve_out_of_order_segments() {
        let index: SegmentIndex = Transcript::new(
            "vid",
            "en",
            vec![
                Segment::new("late", 10.0, 2.0),
                Segment::new("early", 0.0, 5.0),
            ],
        )
        .into();
        assert_eq!(index.resolve(1.0), Some(1));
        assert_eq!(index.resolve(11.0), Some(0));
        assert_eq!(index.resolve(7.0), None);
    }

    #[test]
    fn test_resolve_with_gap() {
        let index = gapped();
        assert_eq!(index.resolve(4.0), Some(0));
        assert_eq!(index.resolve(5.0), Some(1));
        assert_eq!(index.resolve(10.0), None);
        assert_eq!(index.resolve(12.5), Some(2));
    }

    #[test]
    fn test_resolve_outside_range() {
        let index = gapped();
        assert_eq!(index.resolve(-1.0), None);
        assert_eq!(index.resolve(15.0), None);
        assert_eq!(index.resolve(100.0), None);
    }

    #[test]
    fn test_resolve_overlapping_prefers_first() {
        let index: SegmentIndex = Transcript::new(
            "vid",
            "en",
            vec![Segment::new("long", 0.0, 5.0), Segment::new("inner", 3.0, 4.0)],
        )
        .into();
        assert_eq!(index.resolve(4.0), Some(0));
        assert_eq!(index.resolve(6.0), Some(1));
    }

    #[test]
    fn test_resolve_empty() {
        let index: SegmentIndex = Transcript::new("vid", "en", vec![]).into();
        assert!(index.is_empty());
        assert_eq!(index.resolve(0.0), None);
    }

    #[test]
    fn test_active_word() {
        let index: SegmentIndex = Transcript::new(
            "vid",
            "en",
            vec![Segment::new("hello there", 0.0, 2.0)
                .with_words(vec![Word::new("hello", 0.1, 0.6), Word::new("there", 0.7, 1.4)])],
        )
        .into();
        assert_eq!(index.active_word(0, 0.05), None);
        assert_eq!(index.active_word(0, 0.3), Some(0));
        assert_eq!(index.active_word(0, 0.65), None);
        assert_eq!(index.active_word(0, 1.0), Some(1));
        assert_eq!(index.active_word(1, 1.0), None);
    }
}
