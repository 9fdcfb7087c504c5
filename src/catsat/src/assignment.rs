//! The assignment: trail, per-variable values/reasons/levels, and the
//! propagation queue head.
//!
//! The trail is the chronological record of every assigned literal;
//! `trail_lim` stores the trail height at each decision, so decision level
//! `d` spans `trail[trail_lim[d-1]..trail_lim[d]]`. `qhead` is the index of
//! the next literal to propagate; propagation is a loop over `dequeue`.

use {
    crate::clause::{lbool, CRef, Lit, VMap, Var},
    crate::vsids::VarOrder,
};

#[derive(Debug, Clone, Copy)]
struct VarData {
    reason: CRef,
    level: u32,
}

impl Default for VarData {
    fn default() -> Self {
        Self {
            reason: CRef::UNDEF,
            level: 0,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Assignment {
    /// Current value of each variable.
    ass: VMap<lbool>,
    /// Reason and level of each assigned variable.
    vardata: VMap<VarData>,
    /// Assignment stack, in the order assignments were made.
    trail: Vec<Lit>,
    /// Trail height at each decision.
    trail_lim: Vec<u32>,
    /// Index into `trail` of the next literal to propagate.
    qhead: usize,
    /// Last polarity each variable was assigned with (phase saving).
    phase: VMap<bool>,
    /// Phase saving mode (0=none, 1=limited, 2=full).
    phase_saving: i32,
}

impl Assignment {
    pub fn new(phase_saving: i32) -> Self {
        Self {
            phase_saving,
            ..Default::default()
        }
    }

    /// Allocate the slots for a fresh variable.
    pub fn init_var(&mut self, v: Var) {
        self.ass.insert_default(v, lbool::UNDEF);
        self.vardata.insert_default(v, VarData::default());
        self.phase.reserve(v, false);
    }

    #[inline(always)]
    pub fn value(&self, v: Var) -> lbool {
        self.ass[v]
    }

    #[inline(always)]
    pub fn value_lit(&self, p: Lit) -> lbool {
        self.ass[p.var()] ^ !p.sign()
    }

    /// `value_lit`, but only for variables pinned at level 0; `UNDEF`
    /// otherwise. Such values can never be undone by backtracking.
    pub fn fixed(&self, p: Lit) -> lbool {
        if self.level(p.var()) == 0 {
            self.value_lit(p)
        } else {
            lbool::UNDEF
        }
    }

    #[inline(always)]
    pub fn level(&self, v: Var) -> u32 {
        self.vardata[v].level
    }

    #[inline(always)]
    pub fn reason(&self, v: Var) -> CRef {
        self.vardata[v].reason
    }

    /// Forget the reason of `v`. Called when the reason clause is about to
    /// be deleted (only legal for clauses whose deletion keeps `v` implied,
    /// i.e. during level-0 simplification).
    pub fn invalidate_reason(&mut self, v: Var) {
        self.vardata[v].reason = CRef::UNDEF;
    }

    #[inline(always)]
    pub fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    #[inline(always)]
    pub fn num_assigns(&self) -> u32 {
        self.trail.len() as u32
    }

    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// The level-0 prefix of the trail: literals that hold in every model.
    pub fn proved_at_lvl_0(&self) -> &[Lit] {
        let end = self
            .trail_lim
            .first()
            .map_or(self.trail.len(), |&x| x as usize);
        &self.trail[..end]
    }

    pub fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len() as u32);
    }

    /// Record `p` as true. Precondition: `p` is currently unassigned.
    pub fn unchecked_enqueue(&mut self, p: Lit, from: CRef) {
        debug_assert_eq!(
            self.value_lit(p),
            lbool::UNDEF,
            "lit {:?} should be undef",
            p
        );
        self.ass[p.var()] = lbool::new(p.sign());
        self.vardata[p.var()] = VarData {
            reason: from,
            level: self.decision_level(),
        };
        self.trail.push(p);
    }

    /// Tolerant enqueue: no-op on an already-true literal, failure (without
    /// mutation) on an already-false one.
    pub fn enqueue(&mut self, p: Lit, from: CRef) -> bool {
        let v = self.value_lit(p);
        if v == lbool::TRUE {
            true
        } else if v == lbool::FALSE {
            false
        } else {
            self.unchecked_enqueue(p, from);
            true
        }
    }

    /// Next literal awaiting propagation, advancing the queue head.
    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    /// Skip whatever is left in the propagation queue (used when a conflict
    /// makes the remaining queued literals moot).
    pub fn drain_queue(&mut self) {
        self.qhead = self.trail.len();
    }

    /// Undo all assignments above `level`. A no-op when `level` is not below
    /// the current decision level. Unassigned variables are handed back to
    /// the decision heap, and their last polarity is saved for phase saving.
    pub fn backtrack_to(&mut self, level: u32, order: &mut VarOrder) {
        if self.decision_level() <= level {
            return;
        }
        let bound = self.trail_lim[level as usize] as usize;
        let last_lim = *self.trail_lim.last().unwrap() as usize;
        for c in (bound..self.trail.len()).rev() {
            let p = self.trail[c];
            let x = p.var();
            self.ass[x] = lbool::UNDEF;
            if self.phase_saving > 1 || (self.phase_saving == 1 && c > last_lim) {
                self.phase[x] = p.sign();
            }
            order.insert(x);
        }
        self.qhead = bound;
        self.trail.truncate(bound);
        self.trail_lim.truncate(level as usize);
    }

    /// Saved polarity for the next decision on `v`.
    pub fn saved_phase(&self, v: Var) -> bool {
        self.phase[v]
    }

    /// Follow reason clauses into the new arena during GC.
    ///
    /// A reason is moved if its clause already relocated or is locked;
    /// other reasons are left dangling, they can never be read again
    /// (their clause is dead and the variable will be re-propagated or was
    /// fixed at level 0 with the clause surviving elsewhere).
    pub fn reloc_reasons(
        &mut self,
        ca: &mut crate::clause::ClauseAllocator,
        to: &mut crate::clause::ClauseAllocator,
    ) {
        for i in 0..self.trail.len() {
            let v = self.trail[i].var();
            let reason = self.vardata[v].reason;
            if reason == CRef::UNDEF {
                continue;
            }
            let keep = {
                let c = ca.get_ref(reason);
                // a relocated clause's first slot is the forwarding
                // reference, the locked test is only valid before that
                c.reloced() || {
                    let c0 = c[0];
                    self.value_lit(c0) == lbool::TRUE && self.vardata[c0.var()].reason == reason
                }
            };
            if keep {
                ca.reloc(&mut self.vardata[v].reason, to);
            }
        }
    }

    /// Rough fraction of the search space already covered, weighing level
    /// `i` assignments by `1 / num_vars^i`.
    pub fn progress_estimate(&self, num_vars: u32) -> f64 {
        if num_vars == 0 {
            return 1.0;
        }
        let f = 1.0 / num_vars as f64;
        let mut progress = 0.0;
        for i in 0..=self.decision_level() {
            let beg = if i == 0 {
                0
            } else {
                self.trail_lim[i as usize - 1] as usize
            };
            let end = if i == self.decision_level() {
                self.trail.len()
            } else {
                self.trail_lim[i as usize] as usize
            };
            progress += f.powi(i as i32) * (end - beg) as f64;
        }
        progress / num_vars as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vsids::VarOrder;

    fn setup(n: u32) -> (Assignment, VarOrder) {
        let mut a = Assignment::new(2);
        let mut o = VarOrder::new(0.95);
        for i in 0..n {
            let v = Var::from_idx(i);
            a.init_var(v);
            o.init_var(v, true);
        }
        (a, o)
    }

    #[test]
    fn test_enqueue_and_value() {
        let (mut a, _) = setup(2);
        let p = Lit::new(Var::from_idx(0), true);
        assert_eq!(a.value_lit(p), lbool::UNDEF);
        assert!(a.enqueue(p, CRef::UNDEF));
        assert_eq!(a.value_lit(p), lbool::TRUE);
        assert_eq!(a.value_lit(!p), lbool::FALSE);
        // tolerant re-enqueue
        assert!(a.enqueue(p, CRef::UNDEF));
        assert_eq!(a.num_assigns(), 1);
        // conflicting enqueue fails without mutating
        assert!(!a.enqueue(!p, CRef::UNDEF));
        assert_eq!(a.num_assigns(), 1);
    }

    #[test]
    fn test_dequeue_order() {
        let (mut a, _) = setup(3);
        let lits: Vec<Lit> = (0..3).map(|i| Lit::new(Var::from_idx(i), true)).collect();
        for &p in &lits {
            a.unchecked_enqueue(p, CRef::UNDEF);
        }
        assert_eq!(a.dequeue(), Some(lits[0]));
        assert_eq!(a.dequeue(), Some(lits[1]));
        assert_eq!(a.dequeue(), Some(lits[2]));
        assert_eq!(a.dequeue(), None);
    }

    #[test]
    fn test_backtrack_restores() {
        let (mut a, mut o) = setup(3);
        let p0 = Lit::new(Var::from_idx(0), true);
        let p1 = Lit::new(Var::from_idx(1), false);
        a.unchecked_enqueue(p0, CRef::UNDEF);
        a.new_decision_level();
        a.unchecked_enqueue(p1, CRef::UNDEF);
        assert_eq!(a.decision_level(), 1);
        assert_eq!(a.level(p1.var()), 1);
        while a.dequeue().is_some() {}
        a.backtrack_to(0, &mut o);
        assert_eq!(a.decision_level(), 0);
        assert_eq!(a.value_lit(p1), lbool::UNDEF);
        assert_eq!(a.value_lit(p0), lbool::TRUE);
        assert_eq!(a.num_assigns(), 1);
        // queue head followed the trail back
        assert_eq!(a.dequeue(), None);
        // phase of the undone assignment was saved
        assert!(!a.saved_phase(p1.var()));
        // out-of-range backtrack is a no-op
        a.backtrack_to(5, &mut o);
        assert_eq!(a.num_assigns(), 1);
    }

    #[test]
    fn test_fixed_only_at_level_0() {
        let (mut a, _) = setup(2);
        let p0 = Lit::new(Var::from_idx(0), true);
        let p1 = Lit::new(Var::from_idx(1), true);
        a.unchecked_enqueue(p0, CRef::UNDEF);
        a.new_decision_level();
        a.unchecked_enqueue(p1, CRef::UNDEF);
        assert_eq!(a.fixed(p0), lbool::TRUE);
        assert_eq!(a.fixed(!p0), lbool::FALSE);
        assert_eq!(a.fixed(p1), lbool::UNDEF);
    }
}
