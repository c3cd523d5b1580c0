//! Typed indices for the memory-op graph.
//!
//! Blocks, ops and values live in flat vectors owned by the graph and are
//! referred to by small copyable ids. [`IndexVec`] keeps the id type attached
//! to the vector so a `BlockId` can never index the op table by accident.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for types that can be used as indices into an [`IndexVec`].
pub trait Idx: Copy + Eq + fmt::Debug {
    fn from_usize(idx: usize) -> Self;
    fn index(self) -> usize;
}

/// A vector indexed by a specific id type.
#[derive(Clone, PartialEq, Eq)]
pub struct IndexVec<I, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(&I)>,
}

impl<I: Idx, T> IndexVec<I, T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Create a vector holding `len` clones of `value`.
    pub fn from_elem_n(value: T, len: usize) -> Self
    where
        T: Clone,
    {
        Self {
            raw: vec![value; len],
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Append an element and return its id.
    #[inline]
    pub fn push(&mut self, value: T) -> I {
        let idx = I::from_usize(self.raw.len());
        self.raw.push(value);
        idx
    }

    /// The id the next `push` will return.
    #[inline]
    pub fn next_index(&self) -> I {
        I::from_usize(self.raw.len())
    }

    #[inline]
    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    #[inline]
    pub fn get_mut(&mut self, idx: I) -> Option<&mut T> {
        self.raw.get_mut(idx.index())
    }

    #[inline]
    pub fn contains(&self, idx: I) -> bool {
        idx.index() < self.raw.len()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.raw.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.raw.iter_mut()
    }

    pub fn iter_enumerated(&self) -> impl DoubleEndedIterator<Item = (I, &T)> + '_ {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, value)| (I::from_usize(i), value))
    }

    pub fn indices(&self) -> impl DoubleEndedIterator<Item = I> {
        (0..self.raw.len()).map(I::from_usize)
    }
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    #[inline]
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

impl<I: Idx, T: fmt::Debug> fmt::Debug for IndexVec<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_enumerated()).finish()
    }
}
