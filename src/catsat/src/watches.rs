//! Per-literal watch lists.
//!
//! `watches[lit]` holds the clauses that must be inspected when `lit`
//! becomes true (falsifying `¬lit` inside them). Deleted clauses are purged
//! lazily: deletion only smudges the two affected lists, and a list is
//! cleaned the next time it is looked at, or wholesale before a GC.

use {
    crate::clause::{CRef, ClauseAllocator, LMap, Lit},
    crate::intmap::IntMapBool,
    std::mem,
};

/// Entry of a watch list. `blocker` is some other literal of the clause;
/// when the blocker is already true the clause is satisfied and need not be
/// loaded at all.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Watcher {
    pub cref: CRef,
    pub blocker: Lit,
}

impl Watcher {
    pub fn new(cref: CRef, blocker: Lit) -> Self {
        Self { cref, blocker }
    }
}

impl PartialEq for Watcher {
    #[inline(always)]
    fn eq(&self, rhs: &Self) -> bool {
        self.cref == rhs.cref
    }
}
impl Eq for Watcher {}

#[derive(Debug, Default)]
pub(crate) struct Watches {
    occs: LMap<Vec<Watcher>>,
    dirty: IntMapBool<Lit>,
    dirties: Vec<Lit>,
}

impl Watches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make room for the watch list of `lit`.
    pub fn init(&mut self, lit: Lit) {
        self.occs.reserve_default(lit);
        self.occs[lit].clear();
        self.dirty.reserve(lit);
    }

    #[inline]
    pub fn push(&mut self, lit: Lit, w: Watcher) {
        self.occs[lit].push(w);
    }

    #[allow(dead_code)] // used by invariant checks in tests
    pub fn as_slice(&self, lit: Lit) -> &[Watcher] {
        &self.occs[lit]
    }

    /// Mark the list of `lit` as containing deleted clauses.
    pub fn smudge(&mut self, lit: Lit) {
        if !self.dirty[lit] {
            self.dirty.insert(lit);
            self.dirties.push(lit);
        }
    }

    fn deleted(ca: &ClauseAllocator, w: &Watcher) -> bool {
        ca.get_ref(w.cref).mark() == 1
    }

    pub fn clean(&mut self, lit: Lit, ca: &ClauseAllocator) {
        self.occs[lit].retain(|w| !Self::deleted(ca, w));
        self.dirty.set(lit, false);
    }

    pub fn clean_all(&mut self, ca: &ClauseAllocator) {
        let dirties = mem::take(&mut self.dirties);
        for lit in dirties {
            // dirties may contain duplicates, skip lists already cleaned
            if self.dirty[lit] {
                self.clean(lit, ca);
            }
        }
    }

    /// Take the whole (clean) bucket of `lit` out, for the
    /// collect-keep-then-swap rebuild during propagation.
    pub fn take(&mut self, lit: Lit, ca: &ClauseAllocator) -> Vec<Watcher> {
        if self.dirty[lit] {
            self.clean(lit, ca);
        }
        mem::take(&mut self.occs[lit])
    }

    /// Restore the bucket taken by [`Watches::take`].
    pub fn put_back(&mut self, lit: Lit, ws: Vec<Watcher>) {
        debug_assert!(self.occs[lit].is_empty());
        self.occs[lit] = ws;
    }

    /// Point every watcher at the clause's new home. The lists must have
    /// been cleaned first.
    pub fn reloc_all(&mut self, ca: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for (_, ws) in self.occs.iter_mut() {
            for w in ws.iter_mut() {
                ca.reloc(&mut w.cref, to);
            }
        }
    }
}
