//! Sequence builders for `generate!`.
//!
//! Any `IntoIterator` whose iterator is `'static` can back a generator; these
//! helpers cover the common shapes. Infinite sequences such as [`random`] must
//! be bounded with [`Iterator::take`] before they reach a generator site.

use std::cmp::Ordering;
use std::iter::{Fuse, Once};
use std::ops::Range;

use rand::SeedableRng;
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

use crate::error::{TrackerError, UsageError};

/// A single fixed element.
pub fn value<T>(item: T) -> Once<T> {
    std::iter::once(item)
}

/// A fixed list of elements, in order.
pub fn values<T, const N: usize>(items: [T; N]) -> std::array::IntoIter<T, N> {
    items.into_iter()
}

/// Half-open integer range `start..end`.
pub fn range<T>(start: T, end: T) -> Range<T>
where
    Range<T>: Iterator<Item = T>,
{
    start..end
}

/// Elements of any iterator, in order.
pub fn from_iter<I: IntoIterator>(items: I) -> I::IntoIter {
    items.into_iter()
}

/// Numeric types usable with [`range_step`].
pub trait Step: Copy + PartialOrd {
    const ZERO: Self;

    /// `self + step`, or `None` when the result is not representable.
    fn forward(self, step: Self) -> Option<Self>;
}

macro_rules! impl_step_int {
    ($($ty:ty),*) => {
        $(impl Step for $ty {
            const ZERO: Self = 0;

            fn forward(self, step: Self) -> Option<Self> {
                self.checked_add(step)
            }
        })*
    };
}

macro_rules! impl_step_float {
    ($($ty:ty),*) => {
        $(impl Step for $ty {
            const ZERO: Self = 0.0;

            fn forward(self, step: Self) -> Option<Self> {
                Some(self + step)
            }
        })*
    };
}

impl_step_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_step_float!(f32, f64);

/// Sequence returned by [`range_step`].
#[derive(Debug, Clone)]
pub struct RangeStep<T> {
    next: Option<T>,
    end: T,
    step: T,
    ascending: bool,
}

impl<T: Step> Iterator for RangeStep<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let current = self.next?;
        let in_range = if self.ascending {
            current < self.end
        } else {
            current > self.end
        };
        if !in_range {
            self.next = None;
            return None;
        }
        self.next = current.forward(self.step);
        Some(current)
    }
}

/// `start`, `start + step`, ... stopping before `end`. `step` may be
/// negative for a descending range.
pub fn range_step<T: Step>(start: T, end: T, step: T) -> Result<RangeStep<T>, TrackerError> {
    if step == T::ZERO {
        return Err(UsageError::ZeroStep.into());
    }
    Ok(RangeStep {
        next: Some(start),
        end,
        step,
        ascending: step > T::ZERO,
    })
}

/// Infinite sequence returned by [`random`].
pub struct Random<T: SampleUniform> {
    rng: StdRng,
    distribution: Uniform<T>,
}

impl<T: SampleUniform> Iterator for Random<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        Some(self.distribution.sample(&mut self.rng))
    }
}

/// Uniformly distributed values in `low..=high`, reproducible from `seed`.
pub fn random<T>(low: T, high: T, seed: u64) -> Result<Random<T>, TrackerError>
where
    T: SampleUniform + PartialOrd,
{
    // NaN bounds compare as unordered.
    if !matches!(low.partial_cmp(&high), Some(Ordering::Less | Ordering::Equal)) {
        return Err(UsageError::EmptyRange.into());
    }
    Ok(Random {
        rng: StdRng::seed_from_u64(seed),
        distribution: Uniform::new_inclusive(low, high),
    })
}

/// Sequence returned by [`repeat`].
pub struct Repeat<I: Iterator> {
    source: Fuse<I>,
    cache: Vec<I::Item>,
    times: usize,
    round: usize,
    position: usize,
}

impl<I> Iterator for Repeat<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.times == 0 {
            return None;
        }
        if self.round == 0 {
            if let Some(item) = self.source.next() {
                self.cache.push(item.clone());
                return Some(item);
            }
            self.round = 1;
        }
        while self.round < self.times && !self.cache.is_empty() {
            if let Some(item) = self.cache.get(self.position) {
                self.position += 1;
                return Some(item.clone());
            }
            self.round += 1;
            self.position = 0;
        }
        None
    }
}

/// The whole of `items`, played `times` times over.
pub fn repeat<I>(times: usize, items: I) -> Repeat<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Clone,
{
    Repeat {
        source: items.into_iter().fuse(),
        cache: Vec::new(),
        times,
        round: 0,
        position: 0,
    }
}

/// Sequence returned by [`chunk`].
pub struct Chunk<I> {
    source: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunk<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Vec<I::Item>> {
        let group: Vec<I::Item> = self.source.by_ref().take(self.size).collect();
        (group.len() == self.size).then_some(group)
    }
}

/// Consecutive groups of `size` elements; a short final group is dropped.
pub fn chunk<I: IntoIterator>(size: usize, items: I) -> Result<Chunk<I::IntoIter>, TrackerError> {
    if size == 0 {
        return Err(UsageError::ZeroChunkSize.into());
    }
    Ok(Chunk {
        source: items.into_iter(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sequences() {
        assert_eq!(value(3).collect::<Vec<_>>(), vec![3]);
        assert_eq!(values(["a", "b"]).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(range(2, 5).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(
            from_iter(vec![1, 1, 2]).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
    }

    #[test]
    fn range_step_ascends_and_descends() {
        let up: Vec<i32> = range_step(0, 10, 4).expect("step").collect();
        assert_eq!(up, vec![0, 4, 8]);
        let down: Vec<i32> = range_step(3, -3, -2).expect("step").collect();
        assert_eq!(down, vec![3, 1, -1]);
    }

    #[test]
    fn range_step_stops_on_overflow() {
        let all: Vec<u8> = range_step(0u8, 255, 100).expect("step").collect();
        assert_eq!(all, vec![0, 100, 200]);
    }

    #[test]
    fn range_step_supports_floats() {
        let all: Vec<f64> = range_step(0.0, 1.0, 0.5).expect("step").collect();
        assert_eq!(all, vec![0.0, 0.5]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = range_step(0, 10, 0).err().expect("zero step");
        assert_eq!(err, TrackerError::Usage(UsageError::ZeroStep));
    }

    #[test]
    fn random_is_bounded_and_reproducible() {
        let first: Vec<u32> = random(1, 6, 42).expect("random").take(50).collect();
        let second: Vec<u32> = random(1, 6, 42).expect("random").take(50).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|n| (1..=6).contains(n)));
    }

    #[test]
    fn random_rejects_inverted_bounds() {
        let err = random(5, 1, 0).err().expect("inverted bounds");
        assert_eq!(err, TrackerError::Usage(UsageError::EmptyRange));
    }

    #[test]
    fn random_rejects_nan_bounds() {
        for (low, high) in [(f64::NAN, 1.0), (0.0, f64::NAN)] {
            let err = random(low, high, 0).err().expect("nan bounds");
            assert_eq!(err, TrackerError::Usage(UsageError::EmptyRange));
        }
    }

    #[test]
    fn repeat_replays_whole_sequence() {
        let all: Vec<i32> = repeat(3, [1, 2]).collect();
        assert_eq!(all, vec![1, 2, 1, 2, 1, 2]);
        assert_eq!(repeat(0, [1, 2]).count(), 0);
        assert_eq!(repeat(4, Vec::<i32>::new()).count(), 0);
    }

    #[test]
    fn chunk_groups_and_drops_short_tail() {
        let all: Vec<Vec<i32>> = chunk(2, 1..=5).expect("chunk").collect();
        assert_eq!(all, vec![vec![1, 2], vec![3, 4]]);
        let err = chunk(0, 1..=5).err().expect("zero size");
        assert_eq!(err, TrackerError::Usage(UsageError::ZeroChunkSize));
    }
}
