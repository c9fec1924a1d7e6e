//! Allocation tracking and cycle collection
//!
//! Objects are reference counted, so acyclic garbage is freed as soon as its
//! last handle drops. Cycles, such as the clone of a cyclic graph, keep
//! themselves alive; [`Heap::collect`] finds and frees them.
//!
//! ## Algorithm
//!
//! Collection uses trial deletion instead of explicit roots:
//!
//! 1. Count, for every tracked object, the references held by other tracked
//!    objects
//! 2. Any object with more handles than internal references is held from
//!    outside the heap and becomes a root
//! 3. Mark everything reachable from the roots
//! 4. Reset the slots of every unmarked object, which breaks the cycles and
//!    lets reference counting free them
//!
//! Collection must not race with threads that move handles between the
//! stack and tracked objects; run it while the graphs are quiescent.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::object::{GcRef, WeakRef};

const MIN_PRUNE_THRESHOLD: usize = 1024;

struct Tracked {
    objects: Vec<WeakRef>,
    prune_at: usize,
}

impl Tracked {
    fn prune(&mut self) {
        self.objects.retain(WeakRef::is_live);
        self.prune_at = (self.objects.len() * 2).max(MIN_PRUNE_THRESHOLD);
    }
}

/// Registry of every object allocated through a [`crate::TypeRegistry`]
pub struct Heap {
    tracked: Mutex<Tracked>,
    collections: AtomicUsize,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self {
            tracked: Mutex::new(Tracked {
                objects: Vec::new(),
                prune_at: MIN_PRUNE_THRESHOLD,
            }),
            collections: AtomicUsize::new(0),
        }
    }

    pub(crate) fn track(&self, obj: GcRef) -> GcRef {
        let mut tracked = self.tracked.lock();
        if tracked.objects.len() >= tracked.prune_at {
            tracked.prune();
        }
        tracked.objects.push(obj.downgrade());
        obj
    }

    /// Number of tracked objects still alive
    pub fn allocation_count(&self) -> usize {
        self.tracked
            .lock()
            .objects
            .iter()
            .filter(|obj| obj.is_live())
            .count()
    }

    /// Number of completed collections
    pub fn collection_count(&self) -> usize {
        self.collections.load(Ordering::Relaxed)
    }

    /// Free every cycle no longer reachable from outside the heap, returning
    /// the number of objects reclaimed
    pub fn collect(&self) -> usize {
        let mut tracked = self.tracked.lock();
        tracked.prune();

        let live: Vec<GcRef> = tracked
            .objects
            .iter()
            .filter_map(WeakRef::upgrade)
            .collect();
        tracing::debug!(target: "replica::heap", objects = live.len(), "collection starting");

        let index: FxHashMap<usize, usize> = live
            .iter()
            .enumerate()
            .map(|(i, obj)| (obj.addr(), i))
            .collect();

        let mut internal = vec![0usize; live.len()];
        for obj in &live {
            for child in obj.children() {
                if let Some(&i) = index.get(&child.addr()) {
                    internal[i] += 1;
                }
            }
        }

        // `live` itself holds one handle per object
        let mut marked = vec![false; live.len()];
        let mut pending: Vec<usize> = Vec::new();
        let mut roots = 0;
        for (i, obj) in live.iter().enumerate() {
            if obj.handle_count().saturating_sub(1) > internal[i] {
                marked[i] = true;
                pending.push(i);
                roots += 1;
            }
        }

        while let Some(i) = pending.pop() {
            for child in live[i].children() {
                if let Some(&j) = index.get(&child.addr())
                    && !marked[j]
                {
                    marked[j] = true;
                    pending.push(j);
                }
            }
        }

        let mut released = Vec::new();
        let mut reclaimed = 0;
        for (obj, _) in live.iter().zip(&marked).filter(|(_, marked)| !**marked) {
            tracing::trace!(
                target: "replica::heap",
                addr = format_args!("{:#x}", obj.addr()),
                "releasing unreachable object"
            );
            released.push(obj.release());
            reclaimed += 1;
        }

        drop(released);
        drop(live);
        tracked.prune();
        self.collections.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            target: "replica::heap",
            roots,
            reclaimed,
            remaining = tracked.objects.len(),
            "collection complete"
        );
        reclaimed
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("tracked", &self.tracked.lock().objects.len())
            .field("collections", &self.collection_count())
            .finish()
    }
}
