#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "smallvec")]
use smallvec::SmallVec;
use std::{fmt::Debug, ops::Deref};

#[cfg(feature = "smallvec")]
pub type InnerBuff<T> = SmallVec<[T; 8]>;

#[cfg(not(feature = "smallvec"))]
pub type InnerBuff<T> = Vec<T>;

/// A sorted, deduplicated buffer of values. Used throughout the library for
/// variable scopes (cliques, sepsets, interface sets), where membership tests
/// and set algebra on small ordered collections dominate.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct SortedBuffer<T> {
    inner: InnerBuff<T>,
}

impl<T> SortedBuffer<T> {
    pub fn new() -> Self {
        SortedBuffer {
            inner: InnerBuff::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }

    #[inline]
    pub fn contains(&self, value: &T) -> bool
    where
        T: Ord,
    {
        self.inner.binary_search(value).is_ok()
    }

    /// Position of `value` in the sorted order, if present.
    #[inline]
    pub fn position(&self, value: &T) -> Option<usize>
    where
        T: Ord,
    {
        self.inner.binary_search(value).ok()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.inner.iter()
    }

    #[inline]
    pub fn insert(&mut self, value: T)
    where
        T: Ord,
    {
        match self.inner.binary_search(&value) {
            Ok(_) => {}
            Err(pos) => self.inner.insert(pos, value),
        }
    }

    #[inline]
    pub fn remove(&mut self, value: &T)
    where
        T: Ord,
    {
        if let Ok(pos) = self.inner.binary_search(value) {
            self.inner.remove(pos);
        }
    }

    pub fn intersection(&self, other: &SortedBuffer<T>) -> SortedBuffer<T>
    where
        T: Ord + Clone,
    {
        let mut out = SortedBuffer::new();
        let (mut i, mut j) = (0, 0);
        while i < self.inner.len() && j < other.inner.len() {
            match self.inner[i].cmp(&other.inner[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.inner.push(self.inner[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        out
    }

    pub fn union(&self, other: &SortedBuffer<T>) -> SortedBuffer<T>
    where
        T: Ord + Clone,
    {
        let mut out = self.clone();
        for value in other.iter() {
            out.insert(value.clone());
        }
        out
    }

    pub fn is_subset_of(&self, other: &SortedBuffer<T>) -> bool
    where
        T: Ord,
    {
        self.inner.iter().all(|v| other.contains(v))
    }
}

impl<T> Default for SortedBuffer<T> {
    fn default() -> Self {
        SortedBuffer::new()
    }
}

impl<T> Deref for SortedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> FromIterator<T> for SortedBuffer<T>
where
    T: Ord,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut inner = InnerBuff::new();
        inner.extend(iter);
        inner.sort_unstable();
        inner.dedup();
        SortedBuffer { inner }
    }
}

impl<T> Debug for SortedBuffer<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.inner.as_slice())
    }
}
