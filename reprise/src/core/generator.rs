//! Type-erased generator cursors owned by generator tracker nodes.

use std::any::{Any, type_name};
use std::cell::OnceCell;
use std::fmt::Debug;
use std::iter::Fuse;

use crate::error::{TrackerError, UsageError};

/// Non-generic view of a generator, as stored inside a tracker node.
pub trait ErasedGenerator: Any {
    /// Move to the next element. Returns `false` once the sequence is
    /// exhausted; exhaustion is terminal.
    fn advance(&mut self) -> bool;

    /// Zero-based index of the current element.
    fn current_index(&self) -> usize;

    /// Move forward to element `n`. Staying in place is a no-op.
    fn skip_to(&mut self, n: usize) -> Result<(), TrackerError>;

    /// Human-readable rendering of the current element, cached until the
    /// cursor moves.
    fn current_as_string(&self) -> &str;

    /// Name of the element type, for diagnostics.
    fn value_type(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Stateful cursor over a lazy sequence.
///
/// The first element is pulled at construction, so a cursor always has a
/// current value. A failed advance leaves the last element in place.
pub struct GeneratorCursor<T> {
    source: Fuse<Box<dyn Iterator<Item = T>>>,
    current: T,
    index: usize,
    repr: OnceCell<String>,
}

impl<T: Debug + 'static> GeneratorCursor<T> {
    pub fn new<I>(sequence: I) -> Result<Self, TrackerError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        let boxed: Box<dyn Iterator<Item = T>> = Box::new(sequence.into_iter());
        let mut source = boxed.fuse();
        let current = source.next().ok_or(UsageError::EmptyGenerator)?;
        Ok(Self {
            source,
            current,
            index: 0,
            repr: OnceCell::new(),
        })
    }

    pub fn current(&self) -> &T {
        &self.current
    }
}

impl<T: Debug + 'static> ErasedGenerator for GeneratorCursor<T> {
    fn advance(&mut self) -> bool {
        match self.source.next() {
            Some(value) => {
                self.current = value;
                self.index += 1;
                self.repr = OnceCell::new();
                true
            }
            None => false,
        }
    }

    fn current_index(&self) -> usize {
        self.index
    }

    fn skip_to(&mut self, n: usize) -> Result<(), TrackerError> {
        if n < self.index {
            return Err(UsageError::SkipBackwards {
                current: self.index,
                requested: n,
            }
            .into());
        }
        while self.index < n {
            if !self.advance() {
                return Err(TrackerError::GeneratorExhausted {
                    requested: n,
                    reached: self.index,
                });
            }
        }
        Ok(())
    }

    fn current_as_string(&self) -> &str {
        self.repr.get_or_init(|| format!("{:?}", self.current))
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Recover the typed cursor behind an erased generator.
pub fn downcast_cursor<T: 'static>(generator: &dyn ErasedGenerator) -> Option<&GeneratorCursor<T>> {
    generator.as_any().downcast_ref::<GeneratorCursor<T>>()
}
