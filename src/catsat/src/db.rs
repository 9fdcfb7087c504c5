//! The clause database: original and learnt clauses over the arena,
//! clause-activity bookkeeping, level-0 simplification, reduction of the
//! learnt set, and arena garbage collection.

use {
    crate::assignment::Assignment,
    crate::callbacks::Callbacks,
    crate::clause::{lbool, CRef, ClauseAllocator, Lit},
    crate::watches::{Watcher, Watches},
    std::mem,
};

/// Which learnt clauses go first when the database is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceStrategy {
    /// Lowest-activity clauses are deleted first; binary clauses are kept.
    #[default]
    Activity,
    /// Highest-LBD clauses are deleted first.
    Lbd,
}

#[derive(Debug)]
pub(crate) struct ClauseDb {
    pub ca: ClauseAllocator,
    /// List of problem clauses.
    pub clauses: Vec<CRef>,
    /// List of learnt clauses.
    pub learnts: Vec<CRef>,
    /// Amount to bump next clause with.
    cla_inc: f64,
    clause_decay: f64,
    strategy: ReduceStrategy,
    reduce_first: u32,
    reduce_inc: f64,
    num_reduces: u64,
    num_clauses: u64,
    num_learnts: u64,
    clauses_literals: u64,
    learnts_literals: u64,
}

impl ClauseDb {
    pub fn new(
        clause_decay: f64,
        strategy: ReduceStrategy,
        reduce_first: u32,
        reduce_inc: f64,
    ) -> Self {
        Self {
            ca: ClauseAllocator::new(),
            clauses: vec![],
            learnts: vec![],
            cla_inc: 1.0,
            clause_decay,
            strategy,
            reduce_first,
            reduce_inc,
            num_reduces: 0,
            num_clauses: 0,
            num_learnts: 0,
            clauses_literals: 0,
            learnts_literals: 0,
        }
    }

    pub fn num_clauses(&self) -> u64 {
        self.num_clauses
    }
    pub fn num_learnts(&self) -> u64 {
        self.num_learnts
    }
    pub fn literals(&self) -> u64 {
        self.clauses_literals + self.learnts_literals
    }

    /// The learnt set is reduced once it outgrows this. The threshold rises
    /// with each reduction and with the trail, so a search that fixes many
    /// variables is allowed to keep more clauses.
    pub fn reduce_threshold(&self, trail_len: usize) -> usize {
        self.reduce_first as usize + (self.reduce_inc * self.num_reduces as f64) as usize + trail_len
    }

    /// Allocate a clause of size >= 2 and register its watches.
    pub fn add(&mut self, lits: &[Lit], learnt: bool, watches: &mut Watches) -> CRef {
        debug_assert!(lits.len() >= 2);
        let cr = self.ca.alloc(lits, learnt);
        if learnt {
            self.learnts.push(cr);
        } else {
            self.clauses.push(cr);
        }
        self.attach(cr, watches);
        cr
    }

    fn attach(&mut self, cr: CRef, watches: &mut Watches) {
        let (c0, c1, learnt, size) = {
            let c = self.ca.get_ref(cr);
            debug_assert!(c.size() > 1);
            (c[0], c[1], c.learnt(), c.size())
        };
        watches.push(!c0, Watcher::new(cr, c1));
        watches.push(!c1, Watcher::new(cr, c0));
        if learnt {
            self.num_learnts += 1;
            self.learnts_literals += size as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += size as u64;
        }
    }

    /// Is `cr` the reason of the assignment of its first literal? Such
    /// clauses must survive any reduction.
    pub fn locked(&self, cr: CRef, assign: &Assignment) -> bool {
        let c = self.ca.get_ref(cr);
        let c0 = c[0];
        assign.value_lit(c0) == lbool::TRUE && assign.reason(c0.var()) == cr
    }

    /// Delete a clause: detach (lazily) from its two watch lists, mark it,
    /// and return its arena space to the wasted pool.
    pub fn remove(&mut self, cr: CRef, assign: &mut Assignment, watches: &mut Watches) {
        let locked = self.locked(cr, assign);
        {
            let c = self.ca.get_ref(cr);
            watches.smudge(!c[0]);
            watches.smudge(!c[1]);
            if c.learnt() {
                self.num_learnts -= 1;
                self.learnts_literals -= c.size() as u64;
            } else {
                self.num_clauses -= 1;
                self.clauses_literals -= c.size() as u64;
            }
            if locked {
                // don't leave a reason pointing at freed memory
                assign.invalidate_reason(c[0].var());
            }
        }
        self.ca.get_mut(cr).set_mark(1);
        self.ca.free(cr);
    }

    pub fn bump(&mut self, cr: CRef) {
        let new_activity = {
            let mut c = self.ca.get_mut(cr);
            let a = c.activity() + self.cla_inc as f32;
            c.set_activity(a);
            a
        };
        if new_activity > 1e20 {
            // Rescale:
            for &learnt in self.learnts.iter() {
                let mut c = self.ca.get_mut(learnt);
                let a = c.activity() * 1e-20;
                c.set_activity(a);
            }
            self.cla_inc *= 1e-20;
        }
    }

    pub fn decay(&mut self) {
        self.cla_inc *= 1.0 / self.clause_decay;
    }

    /// Level-0 simplification of one clause list: drop satisfied clauses,
    /// strip permanently-false literals from the rest (the two watched
    /// slots are untouched, they are unassigned here).
    pub fn remove_satisfied(&mut self, learnt: bool, assign: &mut Assignment, watches: &mut Watches) {
        debug_assert_eq!(assign.decision_level(), 0);
        let mut cs = mem::take(if learnt {
            &mut self.learnts
        } else {
            &mut self.clauses
        });
        let mut j = 0;
        for i in 0..cs.len() {
            let cr = cs[i];
            let satisfied = {
                let c = self.ca.get_ref(cr);
                c.iter().any(|&l| assign.value_lit(l) == lbool::TRUE)
            };
            if satisfied {
                self.remove(cr, assign, watches);
            } else {
                let shaved = {
                    let mut c = self.ca.get_mut(cr);
                    debug_assert_eq!(assign.value_lit(c.lit(0)), lbool::UNDEF);
                    debug_assert_eq!(assign.value_lit(c.lit(1)), lbool::UNDEF);
                    let orig = c.size();
                    let mut end = orig;
                    let mut k = 2;
                    while k < end {
                        if assign.value_lit(c.lit(k)) == lbool::FALSE {
                            debug_assert_eq!(assign.level(c.lit(k).var()), 0);
                            end -= 1;
                            let moved = c.lit(end);
                            c.set_lit(k, moved);
                        } else {
                            k += 1;
                        }
                    }
                    c.shrink(end);
                    orig - end
                };
                if shaved > 0 {
                    if learnt {
                        self.learnts_literals -= shaved as u64;
                    } else {
                        self.clauses_literals -= shaved as u64;
                    }
                    self.ca.free_amount(shaved);
                }
                cs[j] = cr;
                j += 1;
            }
        }
        cs.truncate(j);
        if learnt {
            self.learnts = cs;
        } else {
            self.clauses = cs;
        }
    }

    /// Remove roughly half of the learnt clauses.
    ///
    /// Both strategies skip locked clauses, so this is best effort, not an
    /// exact count. Runs at level 0 (the engine restarts first).
    pub fn reduce<Cb: Callbacks>(
        &mut self,
        assign: &mut Assignment,
        watches: &mut Watches,
        cb: &mut Cb,
    ) {
        debug_assert_eq!(assign.decision_level(), 0);
        self.num_reduces += 1;
        let n = self.learnts.len();
        if n == 0 {
            return;
        }

        match self.strategy {
            ReduceStrategy::Activity => {
                // Clauses before the midpoint die unless binary or locked;
                // after it, only clauses below the mean activity do.
                let extra_lim = self.cla_inc / n as f64;
                {
                    let ca = &self.ca;
                    self.learnts.sort_unstable_by(|&x, &y| {
                        let cx = ca.get_ref(x);
                        let cy = ca.get_ref(y);
                        Ord::cmp(&(cx.size() <= 2), &(cy.size() <= 2))
                            .then(
                                PartialOrd::partial_cmp(&cx.activity(), &cy.activity())
                                    .expect("NaN activity"),
                            )
                            .then(Ord::cmp(&x, &y))
                    });
                }
                let mut j = 0;
                for i in 0..n {
                    let cr = self.learnts[i];
                    let doomed = {
                        let c = self.ca.get_ref(cr);
                        c.size() > 2
                            && !self.locked(cr, assign)
                            && (i < n / 2 || (c.activity() as f64) < extra_lim)
                    };
                    if doomed {
                        cb.on_delete_clause(self.ca.get_ref(cr).lits());
                        self.remove(cr, assign, watches);
                    } else {
                        self.learnts[j] = cr;
                        j += 1;
                    }
                }
                self.learnts.truncate(j);
            }
            ReduceStrategy::Lbd => {
                // Highest LBD (least valuable) first.
                {
                    let ca = &self.ca;
                    self.learnts.sort_unstable_by(|&x, &y| {
                        let cx = ca.get_ref(x);
                        let cy = ca.get_ref(y);
                        Ord::cmp(&cy.lbd(), &cx.lbd())
                            .then(
                                PartialOrd::partial_cmp(&cx.activity(), &cy.activity())
                                    .expect("NaN activity"),
                            )
                            .then(Ord::cmp(&x, &y))
                    });
                }
                let mut j = 0;
                for i in 0..n {
                    let cr = self.learnts[i];
                    let doomed = i < n / 2 && !self.locked(cr, assign);
                    if doomed {
                        cb.on_delete_clause(self.ca.get_ref(cr).lits());
                        self.remove(cr, assign, watches);
                    } else {
                        self.learnts[j] = cr;
                        j += 1;
                    }
                }
                self.learnts.truncate(j);
            }
        }

        // deleted clauses leave every watch list before we return
        watches.clean_all(&self.ca);
    }

    /// Compact the arena by moving live clauses into a fresh allocator.
    pub fn garbage_collect<Cb: Callbacks>(
        &mut self,
        assign: &mut Assignment,
        watches: &mut Watches,
        cb: &mut Cb,
    ) {
        let mut to = ClauseAllocator::with_start_cap(self.ca.len() - self.ca.wasted());

        watches.clean_all(&self.ca);
        watches.reloc_all(&mut self.ca, &mut to);
        assign.reloc_reasons(&mut self.ca, &mut to);

        for list in [&mut self.learnts, &mut self.clauses] {
            let mut j = 0;
            for i in 0..list.len() {
                let mut cr = list[i];
                if self.ca.get_ref(cr).mark() != 1 {
                    self.ca.reloc(&mut cr, &mut to);
                    list[j] = cr;
                    j += 1;
                }
            }
            list.truncate(j);
        }

        cb.on_gc(
            (self.ca.len() * ClauseAllocator::UNIT_SIZE) as usize,
            (to.len() * ClauseAllocator::UNIT_SIZE) as usize,
        );
        self.ca = to;
    }

    /// GC once the wasted fraction of the arena crosses `garbage_frac`.
    pub fn check_garbage<Cb: Callbacks>(
        &mut self,
        garbage_frac: f64,
        assign: &mut Assignment,
        watches: &mut Watches,
        cb: &mut Cb,
    ) {
        if self.ca.wasted() as f64 > self.ca.len() as f64 * garbage_frac {
            self.garbage_collect(assign, watches, cb);
        }
    }
}
