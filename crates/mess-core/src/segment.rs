//! # Chain Segment
//!
//! A `Segment` is a non-empty run of headers where each header names the
//! previous one as its parent, numbers increase by one, and timestamps never
//! decrease. These properties are checked once in [`Segment::new`]; every
//! holder of a `Segment` can rely on them afterwards.
//!
//! The segment's own difficulty sum excludes its base: the total difficulty
//! of the tip is `td(base parent) + segment.difficulty_sum()`.

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::error::InconsistentInput;
use crate::hash::BlockHash;
use crate::header::Header;

/// A validated, contiguous, non-empty sequence of headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Header>", into = "Vec<Header>")]
pub struct Segment {
    headers: Vec<Header>,
}

impl Segment {
    /// Validate linkage, numbering and timestamp order.
    pub fn new(headers: Vec<Header>) -> Result<Self, InconsistentInput> {
        if headers.is_empty() {
            return Err(InconsistentInput::EmptySegment);
        }
        for pair in headers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let expected_number = prev.number().checked_add(1).ok_or(
                InconsistentInput::NonConsecutiveNumber {
                    expected: u64::MAX,
                    actual: next.number(),
                },
            )?;
            if next.number() != expected_number {
                return Err(InconsistentInput::NonConsecutiveNumber {
                    expected: expected_number,
                    actual: next.number(),
                });
            }
            if next.parent_hash() != prev.hash() {
                return Err(InconsistentInput::BrokenLink {
                    number: next.number(),
                    expected: *prev.hash(),
                    actual: *next.parent_hash(),
                });
            }
            if next.timestamp() < prev.timestamp() {
                return Err(InconsistentInput::TimestampRegression {
                    number: next.number(),
                    timestamp: next.timestamp(),
                    ancestor_timestamp: prev.timestamp(),
                });
            }
        }
        Ok(Self { headers })
    }

    /// All headers, oldest first.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// The oldest header.
    pub fn first(&self) -> &Header {
        // Non-empty by construction.
        &self.headers[0]
    }

    /// The newest header.
    pub fn tip(&self) -> &Header {
        &self.headers[self.headers.len() - 1]
    }

    /// Parent hash of the oldest header — the block this segment builds on.
    pub fn base_parent_hash(&self) -> &BlockHash {
        self.first().parent_hash()
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Always `false`; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate headers oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.headers.iter()
    }

    /// Sum of the segment's own header difficulties.
    pub fn difficulty_sum(&self) -> Difficulty {
        self.headers.iter().map(Header::difficulty).sum()
    }

    /// Check that `parent` is the block this segment builds on and that the
    /// first header neither skips a number nor goes back in time.
    pub fn check_attaches_to(&self, parent: &Header) -> Result<(), InconsistentInput> {
        let first = self.first();
        if first.parent_hash() != parent.hash() {
            return Err(InconsistentInput::BrokenLink {
                number: first.number(),
                expected: *parent.hash(),
                actual: *first.parent_hash(),
            });
        }
        let expected = parent.number().wrapping_add(1);
        if first.number() != expected {
            return Err(InconsistentInput::NonConsecutiveNumber {
                expected,
                actual: first.number(),
            });
        }
        if first.timestamp() < parent.timestamp() {
            return Err(InconsistentInput::TimestampRegression {
                number: first.number(),
                timestamp: first.timestamp(),
                ancestor_timestamp: parent.timestamp(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<Header>> for Segment {
    type Error = InconsistentInput;

    fn try_from(headers: Vec<Header>) -> Result<Self, Self::Error> {
        Segment::new(headers)
    }
}

impl From<Segment> for Vec<Header> {
    fn from(segment: Segment) -> Self {
        segment.headers
    }
}

impl<'a> IntoIterator for &'a Segment {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize, spacing: u64) -> Vec<Header> {
        let mut out = Vec::with_capacity(len);
        let mut parent = BlockHash::ZERO;
        for i in 0..len as u64 {
            let h = Header::new(i + 1, (i + 1) * spacing, Difficulty::from(100u64), parent, 0);
            parent = *h.hash();
            out.push(h);
        }
        out
    }

    #[test]
    fn accepts_contiguous_chain() {
        let seg = Segment::new(chain(5, 10)).unwrap();
        assert_eq!(seg.len(), 5);
        assert!(!seg.is_empty());
        assert_eq!(seg.first().number(), 1);
        assert_eq!(seg.tip().number(), 5);
        assert_eq!(seg.base_parent_hash(), &BlockHash::ZERO);
        assert_eq!(seg.difficulty_sum(), Difficulty::from(500u64));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Segment::new(vec![]), Err(InconsistentInput::EmptySegment));
    }

    #[test]
    fn rejects_gap_in_numbers() {
        let mut headers = chain(3, 10);
        headers.remove(1);
        let err = Segment::new(headers).unwrap_err();
        assert_eq!(
            err,
            InconsistentInput::NonConsecutiveNumber {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn rejects_broken_link() {
        let mut headers = chain(2, 10);
        headers[1] = Header::new(2, 20, Difficulty::from(100u64), BlockHash::ZERO, 0);
        assert!(matches!(
            Segment::new(headers),
            Err(InconsistentInput::BrokenLink { number: 2, .. })
        ));
    }

    #[test]
    fn rejects_timestamp_regression() {
        let first = Header::new(1, 50, Difficulty::from(1u64), BlockHash::ZERO, 0);
        let second = Header::new(2, 49, Difficulty::from(1u64), *first.hash(), 0);
        assert!(matches!(
            Segment::new(vec![first, second]),
            Err(InconsistentInput::TimestampRegression { number: 2, .. })
        ));
    }

    #[test]
    fn equal_timestamps_are_allowed() {
        let first = Header::new(1, 50, Difficulty::from(1u64), BlockHash::ZERO, 0);
        let second = Header::new(2, 50, Difficulty::from(1u64), *first.hash(), 0);
        assert!(Segment::new(vec![first, second]).is_ok());
    }

    #[test]
    fn attachment_to_parent() {
        let parent = Header::new(0, 100, Difficulty::from(1u64), BlockHash::ZERO, 0);
        let child = Header::new(1, 110, Difficulty::from(1u64), *parent.hash(), 0);
        let seg = Segment::new(vec![child]).unwrap();
        assert!(seg.check_attaches_to(&parent).is_ok());

        let early = Header::new(1, 99, Difficulty::from(1u64), *parent.hash(), 0);
        assert!(matches!(
            Segment::new(vec![early]).unwrap().check_attaches_to(&parent),
            Err(InconsistentInput::TimestampRegression { number: 1, .. })
        ));

        let skipped = Header::new(2, 110, Difficulty::from(1u64), *parent.hash(), 0);
        assert!(matches!(
            Segment::new(vec![skipped]).unwrap().check_attaches_to(&parent),
            Err(InconsistentInput::NonConsecutiveNumber { expected: 1, actual: 2 })
        ));

        let stranger = Header::new(0, 100, Difficulty::from(2u64), BlockHash::ZERO, 0);
        assert!(matches!(
            seg.check_attaches_to(&stranger),
            Err(InconsistentInput::BrokenLink { .. })
        ));
    }

    #[test]
    fn deserialization_revalidates() {
        let seg = Segment::new(chain(3, 10)).unwrap();
        let json = serde_json::to_value(&seg).unwrap();
        assert!(json.is_array());
        let back: Segment = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, seg);

        let mut arr = json.as_array().unwrap().clone();
        arr.swap(0, 2);
        assert!(serde_json::from_value::<Segment>(serde_json::Value::Array(arr)).is_err());
    }
}
