//! Small lazy-sequence helpers.

use tracing::trace;

pub mod roster;

pub use roster::{Lecturer, Member, Rewind, Student, UniversityClass};

/// Counter starting at `n`
///
/// Nothing happens until the first `next`; every later call steps by one.
/// Unbounded in practice, it ends after yielding `i64::MAX` instead of
/// overflowing.
pub fn count(n: i64) -> Count {
    Count {
        next: n,
        started: false,
    }
}

#[derive(Debug, Clone)]
pub struct Count {
    next: i64,
    started: bool,
}

impl Iterator for Count {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.started {
            self.next = self.next.checked_add(1)?;
            trace!(value = self.next, "loop");
        } else {
            self.started = true;
            trace!(value = self.next, "start");
        }
        Some(self.next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (i64::MAX as i128 - self.next as i128) + i128::from(!self.started);
        match usize::try_from(left) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// Wraps any iterable in a plain, single-pass iterator
pub fn generatorify<I: IntoIterator>(iterable: I) -> Generator<I::IntoIter> {
    Generator {
        inner: iterable.into_iter(),
    }
}

#[derive(Debug, Clone)]
pub struct Generator<I> {
    inner: I,
}

impl<I: Iterator> Iterator for Generator<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        self.inner.next()
    }
}

/// Returns whether every item equals the first one. Stops at the first
/// mismatch; an empty sequence counts as all the same.
pub fn all_same<I>(iterable: I) -> bool
where
    I: IntoIterator,
    I::Item: PartialEq,
{
    let mut iter = iterable.into_iter();
    match iter.next() {
        Some(first) => iter.all(|item| item == first),
        None => true,
    }
}
