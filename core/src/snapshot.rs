use std::cell::{Cell, RefCell};

/// Position of a fetch in issue order. Later fetches compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchSeq(u64);

impl FetchSeq {
    /// Sequence of a snapshot that did not come from a tracked fetch.
    pub const INITIAL: FetchSeq = FetchSeq(0);

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced,
    /// Same value as the current snapshot; nothing to re-render.
    Unchanged,
    /// A fetch issued later has already been applied.
    Stale,
}

/// Canonical client-side copy of a server resource.
///
/// The whole value is replaced on every apply, never patched. Each fetch
/// takes a sequence number from [`begin`](Self::begin) before it starts, and
/// its result is dropped if a fetch that started later already landed.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    current: RefCell<Option<T>>,
    issued: Cell<u64>,
    applied: Cell<u64>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self {
            current: RefCell::new(None),
            issued: Cell::new(0),
            applied: Cell::new(0),
        }
    }
}

impl<T: Clone + PartialEq> SnapshotCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> FetchSeq {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        FetchSeq(next)
    }

    pub fn apply(&self, seq: FetchSeq, value: T) -> Applied {
        if seq.0 <= self.applied.get() {
            return Applied::Stale;
        }
        self.applied.set(seq.0);
        let mut current = self.current.borrow_mut();
        if current.as_ref() == Some(&value) {
            return Applied::Unchanged;
        }
        *current = Some(value);
        Applied::Replaced
    }

    pub fn get(&self) -> Option<T> {
        self.current.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.current.borrow().as_ref())
    }

    pub fn last_applied(&self) -> FetchSeq {
        FetchSeq(self.applied.get())
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_none()
    }
}

/// A fetched value tagged with the sequence it was fetched under.
///
/// Equality ignores the sequence so the polling loop only reports real
/// changes in content.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub seq: FetchSeq,
    pub value: T,
}

impl<T: PartialEq> PartialEq for Fetched<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
