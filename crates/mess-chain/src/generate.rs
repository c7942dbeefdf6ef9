//! # Synthetic Chain Generator
//!
//! Deterministic header generation for tests and the `mess` CLI. Not a
//! consensus validator: difficulty follows a Homestead-style step so that
//! faster blocks are heavier, which is all the reorg gate needs to see.
//!
//! ```text
//! Δt         = timestamp - parent.timestamp
//! adjustment = max(1 - Δt / 10, -99)
//! difficulty = max(parent + parent / 2048 * adjustment, 131072)
//! ```

use mess_core::{BlockHash, Difficulty, Header, InconsistentInput, Segment};
use num_bigint::BigUint;
use num_traits::Zero;

/// Lowest difficulty the generator produces; also the genesis difficulty.
pub const MIN_DIFFICULTY: u64 = 131_072;
/// Nominal block interval in seconds.
pub const TARGET_BLOCK_TIME: u64 = 10;

const DIFFICULTY_BOUND_DIVISOR: u64 = 2048;
const MAX_DOWNWARD_STEPS: i64 = 99;

/// Block 0: timestamp 0, minimum difficulty, zero parent.
pub fn genesis() -> Header {
    Header::new(0, 0, Difficulty::from(MIN_DIFFICULTY), BlockHash::ZERO, 0)
}

/// Difficulty of a child of `parent` stamped at `timestamp`.
pub fn next_difficulty(parent: &Header, timestamp: u64) -> Difficulty {
    let parent_diff = parent.difficulty().as_biguint();
    let delta = timestamp.saturating_sub(parent.timestamp());
    let slow_steps = (delta / TARGET_BLOCK_TIME).min(i64::MAX as u64) as i64;
    let adjustment = (1 - slow_steps).max(-MAX_DOWNWARD_STEPS);
    let step: BigUint = parent_diff / DIFFICULTY_BOUND_DIVISOR;
    let change = &step * adjustment.unsigned_abs();
    let next = if adjustment >= 0 {
        parent_diff + change
    } else if change >= *parent_diff {
        BigUint::zero()
    } else {
        parent_diff - change
    };
    Difficulty::from(next).max(Difficulty::from(MIN_DIFFICULTY))
}

/// Builds a run of headers on top of a parent.
///
/// Each block is stamped `10 + time_offset` seconds after its parent
/// (never earlier than the parent). Branches built on the same parent with
/// the same timing differ only through `seed`, which goes into every nonce.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    parent: Header,
    time_offset: i64,
    seed: u64,
}

impl SegmentBuilder {
    /// Start a builder on `parent` with nominal spacing and seed 0.
    pub fn on(parent: &Header) -> Self {
        Self {
            parent: parent.clone(),
            time_offset: 0,
            seed: 0,
        }
    }

    /// Seconds added to the nominal 10-second spacing. Negative values make
    /// blocks faster and therefore heavier.
    pub fn time_offset(mut self, offset: i64) -> Self {
        self.time_offset = offset;
        self
    }

    /// Nonce seed distinguishing otherwise identical branches.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generate `len` headers.
    pub fn headers(&self, len: usize) -> Vec<Header> {
        let spacing = (TARGET_BLOCK_TIME as i64).saturating_add(self.time_offset).max(0) as u64;
        let mut out = Vec::with_capacity(len);
        let mut parent = self.parent.clone();
        for _ in 0..len {
            let timestamp = parent.timestamp().saturating_add(spacing);
            let header = Header::new(
                parent.number() + 1,
                timestamp,
                next_difficulty(&parent, timestamp),
                *parent.hash(),
                self.seed,
            );
            out.push(header.clone());
            parent = header;
        }
        out
    }

    /// Generate a validated segment of `len` headers.
    pub fn build(&self, len: usize) -> Result<Segment, InconsistentInput> {
        Segment::new(self.headers(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_spacing_keeps_difficulty() {
        let g = genesis();
        let seg = SegmentBuilder::on(&g).build(5).unwrap();
        for (i, h) in seg.iter().enumerate() {
            assert_eq!(h.number(), i as u64 + 1);
            assert_eq!(h.timestamp(), (i as u64 + 1) * 10);
            assert_eq!(h.difficulty(), &Difficulty::from(MIN_DIFFICULTY));
        }
    }

    #[test]
    fn faster_blocks_are_heavier() {
        let g = genesis();
        let seg = SegmentBuilder::on(&g).time_offset(-1).build(3).unwrap();
        assert_eq!(seg.first().timestamp(), 9);
        assert_eq!(seg.first().difficulty(), &Difficulty::from(131_136u64));
        assert!(seg.tip().difficulty() > seg.first().difficulty());
    }

    #[test]
    fn slow_blocks_never_drop_below_minimum() {
        let g = genesis();
        let seg = SegmentBuilder::on(&g).time_offset(500).build(3).unwrap();
        assert!(seg.iter().all(|h| h.difficulty() == &Difficulty::from(MIN_DIFFICULTY)));
    }

    #[test]
    fn downward_step_is_capped() {
        let parent = Header::new(1, 0, Difficulty::from(2_048_000u64), BlockHash::ZERO, 0);
        // 1 - 10_000/10 = -999, capped at -99: 2_048_000 - 1000 * 99.
        assert_eq!(next_difficulty(&parent, 10_000), Difficulty::from(1_949_000u64));
        assert_eq!(next_difficulty(&parent, 20), Difficulty::from(2_047_000u64));
    }

    #[test]
    fn seeds_separate_identical_branches() {
        let g = genesis();
        let a = SegmentBuilder::on(&g).build(2).unwrap();
        let b = SegmentBuilder::on(&g).seed(1).build(2).unwrap();
        assert_ne!(a.tip().hash(), b.tip().hash());
        assert_eq!(a.difficulty_sum(), b.difficulty_sum());
    }

    #[test]
    fn offset_cannot_reverse_time() {
        let g = genesis();
        let seg = SegmentBuilder::on(&g).time_offset(-50).build(2).unwrap();
        assert_eq!(seg.tip().timestamp(), 0);
    }

    #[test]
    fn empty_request_is_an_error() {
        assert_eq!(
            SegmentBuilder::on(&genesis()).build(0),
            Err(InconsistentInput::EmptySegment)
        );
    }
}
