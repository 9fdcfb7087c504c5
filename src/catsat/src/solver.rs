/*****************************************************************************************[solver.rs]
Copyright (c) 2003-2006, Niklas Een, Niklas Sorensson (MiniSat)
Copyright (c) 2007-2010, Niklas Sorensson (MiniSat)

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

use {
    crate::assignment::Assignment,
    crate::callbacks::{Callbacks, ProgressStatus},
    crate::clause::{lbool, CRef, Kind, LSet, Lit, VMap, Var},
    crate::db::{ClauseDb, ReduceStrategy},
    crate::interface::SolverInterface,
    crate::restart::RestartSched,
    crate::vsids::{BranchMode, VarOrder},
    crate::watches::{Watcher, Watches},
    std::{
        fmt,
        sync::atomic::{AtomicBool, Ordering},
    },
};

/// The main solver structure.
///
/// A `Solver` object contains the whole state of the CDCL engine: the
/// assignment trail, the clause database, watch lists, the decision heap,
/// the restart schedule, and statistics.
///
/// It is parametrized by `Callbacks`.
pub struct Solver<Cb: Callbacks> {
    // Extra results: (read-only member variable)
    /// If the problem is satisfiable, this vector contains the model (if any).
    model: Vec<lbool>,
    /// If the problem is unsatisfiable under assumptions, this set
    /// represents the final conflict expressed in the assumptions.
    conflict: LSet,

    cb: Cb,
    asynch_interrupt: AtomicBool,

    opts: SolverOpts,
    assign: Assignment,
    db: ClauseDb,
    watches: Watches,
    order: VarOrder,
    restart: RestartSched,
    stats: Stats,

    /// If `false`, the constraints are already unsatisfiable. No part of
    /// the solver state may be used!
    ok: bool,
    /// Next variable to be created.
    next_var: Var,
    /// The user's preferred polarity of each variable.
    user_pol: VMap<lbool>,
    /// Current set of assumptions provided to solve by the user.
    assumptions: Vec<Lit>,
    /// Result of the most recent `solve` call.
    last_status: lbool,
    /// Variable count the decision heap priors were last built for.
    order_seeded_vars: u32,

    /// Number of top-level assignments since the last execution of `simplify`.
    simp_db_assigns: i64,
    /// Remaining number of propagations before the next `simplify` does real work.
    simp_db_props: i64,

    // Temporaries (to reduce allocation overhead). `seen` is cleared after
    // each conflict analysis via `analyze_toclear`.
    seen: VMap<bool>,
    analyze_toclear: Vec<Lit>,
    minimize_stack: Vec<Lit>,
    /// Generation-stamped level marks for LBD computation.
    lbd_stamp: Vec<u64>,
    lbd_gen: u64,

    // Resource constraints:
    conflict_budget: i64,
    propagation_budget: i64,
}

/// Search statistics, owned by the engine and readable at any time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub solves: u64,
    pub restarts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    /// Literals in learnt clauses before minimization.
    pub max_literals: u64,
    /// Literals in learnt clauses after minimization.
    pub tot_literals: u64,
}

/// Configuration of the solver.
#[derive(Debug, Clone)]
pub struct SolverOpts {
    /// Inverse of the activity decay factor for variables.
    pub var_decay: f64,
    /// Inverse of the activity decay factor for learnt clauses.
    pub clause_decay: f64,
    /// Controls conflict clause minimization (0=none, 1=basic, 2=deep).
    pub ccmin_mode: i32,
    /// Controls the level of phase saving (0=none, 1=limited, 2=full).
    pub phase_saving: i32,
    /// Use the Luby restart sequence (geometric otherwise).
    pub luby_restart: bool,
    /// The initial restart limit.
    pub restart_first: u32,
    /// Luby base, or the factor the restart limit grows by per restart.
    pub restart_inc: f64,
    /// Initial learnt-clause limit before the first reduction.
    pub reduce_first: u32,
    /// Growth of the learnt-clause limit per reduction.
    pub reduce_inc: f64,
    /// Which clauses a reduction deletes first.
    pub reduce_strategy: ReduceStrategy,
    /// How the next decision variable is picked.
    pub branch_mode: BranchMode,
    /// Remove satisfied original clauses during simplification.
    pub remove_satisfied: bool,
    /// The fraction of wasted memory allowed before a garbage collection
    /// is triggered.
    pub garbage_frac: f64,
}

impl Default for SolverOpts {
    fn default() -> SolverOpts {
        Self {
            var_decay: 0.95,
            clause_decay: 0.999,
            ccmin_mode: 2,
            phase_saving: 2,
            luby_restart: true,
            restart_first: 100,
            restart_inc: 2.0,
            reduce_first: 2000,
            reduce_inc: 300.0,
            reduce_strategy: ReduceStrategy::Activity,
            branch_mode: BranchMode::Vsids,
            remove_satisfied: false,
            garbage_frac: 0.20,
        }
    }
}

impl SolverOpts {
    /// Check that options are valid.
    pub fn check(&self) -> bool {
        (0.0 < self.var_decay && self.var_decay < 1.0)
            && (0.0 < self.clause_decay && self.clause_decay < 1.0)
            && (0 <= self.ccmin_mode && self.ccmin_mode <= 2)
            && (0 <= self.phase_saving && self.phase_saving <= 2)
            && 1 <= self.restart_first
            && (1.0 < self.restart_inc && self.restart_inc < f64::INFINITY)
            && 1 <= self.reduce_first
            // the threshold must keep growing per reduction, or a round of
            // undeletable (locked) clauses could re-trigger forever
            && (1.0 <= self.reduce_inc && self.reduce_inc < f64::INFINITY)
            && (0.0 < self.garbage_frac && self.garbage_frac < f64::INFINITY)
    }
}

impl<Cb: Callbacks> std::fmt::Debug for Solver<Cb> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("num_vars", &self.next_var.idx())
            .field("ok", &self.ok)
            .finish_non_exhaustive()
    }
}

impl<Cb: Callbacks + Default> Default for Solver<Cb> {
    fn default() -> Self {
        Solver::new(SolverOpts::default(), Default::default())
    }
}

impl<Cb: Callbacks> Solver<Cb> {
    /// Create a new solver with the given options and callbacks.
    pub fn new(opts: SolverOpts, cb: Cb) -> Self {
        assert!(opts.check());
        Self {
            model: vec![],
            conflict: LSet::new(),
            cb,
            asynch_interrupt: AtomicBool::new(false),
            assign: Assignment::new(opts.phase_saving),
            db: ClauseDb::new(
                opts.clause_decay,
                opts.reduce_strategy,
                opts.reduce_first,
                opts.reduce_inc,
            ),
            watches: Watches::new(),
            order: VarOrder::new(opts.var_decay),
            restart: RestartSched::new(opts.luby_restart, opts.restart_first, opts.restart_inc),
            stats: Stats::default(),
            ok: true,
            next_var: Var::from_idx(0),
            user_pol: VMap::new(),
            assumptions: vec![],
            last_status: lbool::UNDEF,
            order_seeded_vars: 0,
            simp_db_assigns: -1,
            simp_db_props: 0,
            seen: VMap::new(),
            analyze_toclear: vec![],
            minimize_stack: vec![],
            lbd_stamp: vec![],
            lbd_gen: 0,
            conflict_budget: -1,
            propagation_budget: -1,
            opts,
        }
    }

    /// Temporary access to the callbacks.
    pub fn cb(&self) -> &Cb {
        &self.cb
    }

    /// Temporary access to the callbacks.
    pub fn cb_mut(&mut self) -> &mut Cb {
        &mut self.cb
    }

    /// Search statistics so far.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Interrupt the search asynchronously. The ongoing `solve` returns
    /// UNDEF, with the solver left in a resumable state.
    pub fn interrupt_async(&self) {
        self.asynch_interrupt.store(true, Ordering::Relaxed);
    }

    /// Stop after (a total of) `x` conflicts; negative means no limit.
    pub fn set_conflict_budget(&mut self, x: i64) {
        self.conflict_budget = x;
    }

    /// Stop after (a total of) `x` propagations; negative means no limit.
    pub fn set_propagation_budget(&mut self, x: i64) {
        self.propagation_budget = x;
    }

    /// Remove all resource limits.
    pub fn budget_off(&mut self) {
        self.conflict_budget = -1;
        self.propagation_budget = -1;
    }

    fn has_been_interrupted(&self) -> bool {
        self.asynch_interrupt.load(Ordering::Relaxed)
    }

    fn within_budget(&self) -> bool {
        !self.has_been_interrupted()
            && (self.conflict_budget < 0 || self.stats.conflicts < self.conflict_budget as u64)
            && (self.propagation_budget < 0
                || self.stats.propagations < self.propagation_budget as u64)
            && !self.cb.stop()
    }

    fn progress_status(&self) -> ProgressStatus {
        ProgressStatus {
            conflicts: self.stats.conflicts,
            decisions: self.stats.decisions,
            propagations: self.stats.propagations,
            n_clauses: self.db.num_clauses(),
            n_learnts: self.db.num_learnts(),
            restarts: self.stats.restarts,
            progress_estimate: self.assign.progress_estimate(self.num_vars()) * 100.0,
        }
    }

    /// Model value display in DIMACS (`v` line).
    pub fn dimacs_model(&self) -> SolverPrintDimacs<Cb> {
        SolverPrintDimacs { s: self }
    }

    fn cancel_until(&mut self, level: u32) {
        self.assign.backtrack_to(level, &mut self.order);
    }

    /// Add clause during or before search; the literals need not be sorted
    /// or deduplicated.
    fn add_clause_(&mut self, clause: &mut Vec<Lit>) -> bool {
        if !self.ok {
            return false;
        }
        clause.sort_unstable();

        // remove duplicates, already-satisfied clauses, permanently false
        // literals, and tautologies
        let mut last_lit = Lit::UNDEF;
        let mut j = 0;
        for i in 0..clause.len() {
            let lit_i = clause[i];
            let value = self.assign.value_lit(lit_i);
            let lvl = self.assign.level(lit_i.var());
            if (value == lbool::TRUE && lvl == 0) || lit_i == !last_lit {
                return true; // tautology or satisfied already at level 0
            } else if !(value == lbool::FALSE && lvl == 0) && lit_i != last_lit {
                // not a duplicate
                last_lit = lit_i;
                clause[j] = lit_i;
                j += 1;
            }
        }
        clause.truncate(j);

        if clause.is_empty() {
            self.ok = false;
            false
        } else if clause.len() == 1 {
            if !self.assign.enqueue(clause[0], CRef::UNDEF) {
                self.ok = false;
            }
            self.ok
        } else {
            self.db.add(clause, false, &mut self.watches);
            true
        }
    }

    /// Propagates all enqueued facts.
    ///
    /// If a conflict arises, the conflicting clause is returned, otherwise
    /// `None`.
    ///
    /// # Post-conditions:
    ///
    /// - the propagation queue is empty, even if there was a conflict.
    fn propagate(&mut self) -> Option<CRef> {
        let mut confl = None;
        let mut num_props: u64 = 0;

        while let Some(p) = self.assign.dequeue() {
            num_props += 1;
            let false_lit = !p;
            // Take the whole bucket out, collect the watchers to keep, and
            // swap it back in; watchers that move away are pushed onto
            // other literals' buckets in the meantime.
            let mut ws = self.watches.take(p, &self.db.ca);
            let end = ws.len();
            let mut i = 0;
            let mut j = 0;
            'clauses: while i < end {
                // Try to avoid inspecting the clause:
                let blocker = ws[i].blocker;
                if self.assign.value_lit(blocker) == lbool::TRUE {
                    ws[j] = ws[i];
                    j += 1;
                    i += 1;
                    continue;
                }

                // Make sure the false literal is in slot 1:
                let cr = ws[i].cref;
                i += 1;
                let mut c = self.db.ca.get_mut(cr);
                if c.lit(0) == false_lit {
                    c.swap(0, 1);
                }
                debug_assert_eq!(c.lit(1), false_lit);

                // If slot 0 is true, the clause is already satisfied.
                let first = c.lit(0);
                let w = Watcher::new(cr, first);
                if first != blocker && self.assign.value_lit(first) == lbool::TRUE {
                    ws[j] = w;
                    j += 1;
                    continue;
                }

                // Look for a new literal to watch:
                for k in 2..c.size() {
                    if self.assign.value_lit(c.lit(k)) != lbool::FALSE {
                        c.swap(1, k);
                        let new_watch = !c.lit(1);
                        debug_assert_ne!(new_watch, p);
                        self.watches.push(new_watch, w);
                        continue 'clauses;
                    }
                }

                // Did not find a watch -- clause is unit under assignment:
                ws[j] = w;
                j += 1;
                if self.assign.value_lit(first) == lbool::FALSE {
                    // conflict; skip the rest of the queue but finish
                    // rebuilding this bucket so the watch structure stays
                    // consistent
                    confl = Some(cr);
                    self.assign.drain_queue();
                    while i < end {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.assign.unchecked_enqueue(first, cr);
                }
            }
            ws.truncate(j);
            self.watches.put_back(p, ws);
            if confl.is_some() {
                break;
            }
        }
        self.stats.propagations += num_props;
        self.simp_db_props -= num_props as i64;

        confl
    }

    /// An abstraction of the level of a variable, as a bit in a 32-bit mask.
    #[inline]
    fn abstract_level(&self, v: Var) -> u32 {
        1 << (self.assign.level(v) & 31)
    }

    /// Distinct decision levels among `lits`.
    fn compute_lbd(&mut self, lits: &[Lit]) -> u32 {
        self.lbd_gen += 1;
        let mut lbd = 0;
        for &l in lits {
            let lvl = self.assign.level(l.var()) as usize;
            if lvl >= self.lbd_stamp.len() {
                self.lbd_stamp.resize(lvl + 1, 0);
            }
            if self.lbd_stamp[lvl] != self.lbd_gen {
                self.lbd_stamp[lvl] = self.lbd_gen;
                lbd += 1;
            }
        }
        lbd
    }

    /// Analyze a conflict and produce the clause to learn.
    ///
    /// # Pre-conditions:
    ///
    /// - current decision level is greater than 0.
    /// - `confl` is falsified by the current trail.
    ///
    /// # Post-conditions:
    ///
    /// - `out_learnt[0]` is the asserting literal (the negated first UIP).
    /// - if `out_learnt.len() > 1` then `out_learnt[1]` has the greatest
    ///   decision level of the remaining literals.
    ///
    /// Returns the backtrack level and the LBD of the learnt clause.
    fn analyze(&mut self, confl: CRef, out_learnt: &mut Vec<Lit>) -> (u32, u32) {
        debug_assert!(self.assign.decision_level() > 0);
        out_learnt.clear();
        out_learnt.push(Lit::UNDEF); // leave room for the asserting literal

        let conflict_level = self.assign.decision_level();
        let mut path_c: u32 = 0;
        let mut p = Lit::UNDEF;
        let mut index = self.assign.trail().len();
        let mut cur = confl;

        loop {
            debug_assert_ne!(cur, CRef::UNDEF, "reached a decision during resolution");
            if self.db.ca.get_ref(cur).learnt() {
                self.db.bump(cur);
            }
            let c = self.db.ca.get_ref(cur);
            // For a reason clause, slot 0 holds the literal it propagated
            // (that is `p`), which cannot appear in the learnt clause.
            let start = if p == Lit::UNDEF { 0 } else { 1 };
            for &q in &c.lits()[start..] {
                let v = q.var();
                debug_assert!(self.assign.level(v) <= conflict_level);
                if !self.seen[v] && self.assign.level(v) > 0 {
                    self.seen[v] = true;
                    self.order.bump(v);
                    if self.assign.level(v) == conflict_level {
                        // at conflict level: eliminated by resolution
                        path_c += 1;
                    } else {
                        out_learnt.push(q);
                    }
                }
            }

            // Select the next trail literal to resolve on:
            while !self.seen[self.assign.trail()[index - 1].var()] {
                index -= 1;
            }
            p = self.assign.trail()[index - 1];
            index -= 1;
            cur = self.assign.reason(p.var());
            self.seen[p.var()] = false;
            path_c -= 1;
            if path_c == 0 {
                break;
            }
        }
        debug_assert!(self.assign.value_lit(p) == lbool::TRUE);
        out_learnt[0] = !p;

        self.stats.max_literals += out_learnt.len() as u64;
        self.minimize_conflict(out_learnt);
        self.stats.tot_literals += out_learnt.len() as u64;

        let lbd = self.compute_lbd(out_learnt);

        // Find the correct backtrack level:
        let btlevel = if out_learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            let mut max_level = self.assign.level(out_learnt[1].var());
            for i in 2..out_learnt.len() {
                let level = self.assign.level(out_learnt[i].var());
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }
            // Swap-in this literal at index 1, it is the other watch:
            out_learnt.swap(max_i, 1);
            max_level
        };

        for &lit in &self.analyze_toclear {
            self.seen[lit.var()] = false; // `seen` is now cleared
        }
        debug_assert!(out_learnt
            .iter()
            .all(|&l| self.assign.value_lit(l) == lbool::FALSE));
        (btlevel, lbd)
    }

    /// Shrink the learnt clause by self-subsuming resolution.
    fn minimize_conflict(&mut self, out_learnt: &mut Vec<Lit>) {
        self.analyze_toclear.clear();
        self.analyze_toclear.extend_from_slice(out_learnt);
        let new_size = if self.opts.ccmin_mode == 2 {
            let mut abstract_levels: u32 = 0;
            for &q in &out_learnt[1..] {
                abstract_levels |= self.abstract_level(q.var());
            }

            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                // a literal can go only if it is implied, and redundantly so
                if self.assign.reason(lit.var()) == CRef::UNDEF
                    || !self.lit_redundant(lit, abstract_levels)
                {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else if self.opts.ccmin_mode == 1 {
            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                let x = lit.var();
                let reason = self.assign.reason(x);
                let retain = if reason == CRef::UNDEF {
                    true
                } else {
                    // drop the literal if every antecedent is already in
                    // the clause (or fixed at level 0)
                    let c = self.db.ca.get_ref(reason);
                    c.lits()[1..]
                        .iter()
                        .any(|&l| !self.seen[l.var()] && self.assign.level(l.var()) > 0)
                };
                if retain {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else {
            out_learnt.len()
        };
        out_learnt.truncate(new_size);
    }

    /// Check if `p` can be removed from the conflict clause being built.
    ///
    /// It can be removed if it is implied by literals of level 0
    /// exclusively, or if resolving with its reason subsumes the clause.
    fn lit_redundant(&mut self, p: Lit, abstract_levels: u32) -> bool {
        self.minimize_stack.clear();
        self.minimize_stack.push(p);

        let top = self.analyze_toclear.len();

        while let Some(q) = self.minimize_stack.pop() {
            let cr = self.assign.reason(q.var());
            debug_assert_ne!(cr, CRef::UNDEF);
            let c = self.db.ca.get_ref(cr);

            for &l in &c.lits()[1..] {
                let v = l.var();
                // variables at level 0 or already marked: skip
                if self.assign.level(v) == 0 || self.seen[v] {
                    continue;
                }
                if self.assign.reason(v) != CRef::UNDEF
                    && (self.abstract_level(v) & abstract_levels) != 0
                {
                    // keep expanding this antecedent
                    self.seen[v] = true;
                    self.minimize_stack.push(l);
                    self.analyze_toclear.push(l);
                } else {
                    // `l` is a decision or lives outside the clause's
                    // levels: `p` cannot be eliminated, roll back the marks
                    for &a in &self.analyze_toclear[top..] {
                        self.seen[a.var()] = false;
                    }
                    self.analyze_toclear.truncate(top);
                    return false;
                }
            }
        }

        true
    }

    /// Specialized analysis to express the final conflict in terms of
    /// assumptions. Computes the set of assumptions that led to the
    /// assignment of `p` into `self.conflict`.
    fn analyze_final(&mut self, p: Lit) {
        self.conflict.clear();
        self.conflict.insert(p);

        if self.assign.decision_level() == 0 {
            return; // no assumptions used
        }

        self.seen[p.var()] = true;

        let first_decision = self.assign.proved_at_lvl_0().len();
        for i in (first_decision..self.assign.trail().len()).rev() {
            let lit = self.assign.trail()[i];
            let x = lit.var();
            if !self.seen[x] {
                continue;
            }
            let reason = self.assign.reason(x);
            if reason == CRef::UNDEF {
                debug_assert!(self.assign.level(x) > 0);
                self.conflict.insert(!lit);
            } else {
                let c = self.db.ca.get_ref(reason);
                for &q in &c.lits()[1..] {
                    if self.assign.level(q.var()) > 0 {
                        self.seen[q.var()] = true;
                    }
                }
            }
            self.seen[x] = false;
        }

        self.seen[p.var()] = false;
    }

    /// Pick the literal to branch on next, `Lit::UNDEF` when every decision
    /// variable is assigned.
    fn pick_branch_lit(&mut self) -> Lit {
        let next = match self.opts.branch_mode {
            BranchMode::Vsids => loop {
                match self.order.pop_best() {
                    None => break Var::UNDEF,
                    // lazy deletion: drop vars that got assigned since
                    Some(v) if self.assign.value(v) == lbool::UNDEF && self.order.is_decision(v) => {
                        break v
                    }
                    Some(_) => continue,
                }
            },
            BranchMode::Sequential => (0..self.num_vars())
                .map(Var::from_idx)
                .find(|&v| self.order.is_decision(v) && self.assign.value(v) == lbool::UNDEF)
                .unwrap_or(Var::UNDEF),
        };

        if next == Var::UNDEF {
            Lit::UNDEF
        } else if self.user_pol[next] != lbool::UNDEF {
            Lit::new(next, self.user_pol[next] == lbool::TRUE)
        } else {
            Lit::new(next, self.assign.saved_phase(next))
        }
    }

    /// Search for a model, allowing up to `nof_conflicts` conflicts before
    /// giving the restart policy a say.
    ///
    /// # Output:
    ///
    /// - `lbool::TRUE` if a full assignment over decision variables was found.
    /// - `lbool::FALSE` if the clause set is unsatisfiable.
    /// - `lbool::UNDEF` when the conflict bound or the budget is reached.
    fn search(&mut self, nof_conflicts: u64, tmp_learnt: &mut Vec<Lit>) -> lbool {
        debug_assert!(self.ok);
        let mut conflict_c: u64 = 0;

        loop {
            if let Some(confl) = self.propagate() {
                // conflict
                self.stats.conflicts += 1;
                conflict_c += 1;
                if self.assign.decision_level() == 0 {
                    return lbool::FALSE;
                }

                let (btlevel, lbd) = self.analyze(confl, tmp_learnt);
                trace!("learnt clause {:?} (backtrack to {})", tmp_learnt, btlevel);
                self.cb.on_new_clause(tmp_learnt, Kind::Learnt);
                self.cancel_until(btlevel);

                if tmp_learnt.len() == 1 {
                    // the lemma asserts a literal at level 0
                    self.assign.unchecked_enqueue(tmp_learnt[0], CRef::UNDEF);
                } else {
                    let cr = self.db.add(tmp_learnt, true, &mut self.watches);
                    {
                        let mut c = self.db.ca.get_mut(cr);
                        c.set_lbd(lbd);
                    }
                    self.db.bump(cr);
                    self.assign.unchecked_enqueue(tmp_learnt[0], cr);
                }

                self.order.decay();
                self.db.decay();

                if self.stats.conflicts % 1024 == 0 {
                    let st = self.progress_status();
                    self.cb.on_progress(|| st);
                }
            } else {
                // no conflict
                if conflict_c >= nof_conflicts || !self.within_budget() {
                    // Reached bound on number of conflicts:
                    self.cancel_until(0);
                    return lbool::UNDEF;
                }

                // Simplify the set of problem clauses:
                if self.assign.decision_level() == 0 && !self.simplify_internal() {
                    return lbool::FALSE;
                }

                if self.db.learnts.len()
                    > self.db.reduce_threshold(self.assign.num_assigns() as usize)
                {
                    // Reduce the set of learnt clauses; restart first so the
                    // database is cleaned at level 0.
                    self.cancel_until(0);
                    self.stats.restarts += 1;
                    self.cb.on_restart();
                    self.reduce_db();
                    if !self.ok {
                        return lbool::FALSE;
                    }
                    continue;
                }

                // select the next decision (assumptions first, then the heap)
                let mut next = Lit::UNDEF;
                while (self.assign.decision_level() as usize) < self.assumptions.len() {
                    // Perform user provided assumption:
                    let p = self.assumptions[self.assign.decision_level() as usize];
                    let v = self.assign.value_lit(p);
                    if v == lbool::TRUE {
                        // Dummy decision level, since `p` is true already:
                        self.assign.new_decision_level();
                    } else if v == lbool::FALSE {
                        // the assumptions themselves are contradictory
                        self.analyze_final(!p);
                        return lbool::FALSE;
                    } else {
                        next = p;
                        break;
                    }
                }

                if next == Lit::UNDEF {
                    // new variable decision:
                    next = self.pick_branch_lit();
                    if next == Lit::UNDEF {
                        // full assignment found
                        return lbool::TRUE;
                    }
                    self.stats.decisions += 1;
                }

                // Increase decision level and enqueue `next` with no
                // justification, it is a decision
                debug!("pick-next {:?}", next);
                self.assign.new_decision_level();
                self.assign.unchecked_enqueue(next, CRef::UNDEF);
            }
        }
    }

    /// Main solve method (assumptions are in `self.assumptions`).
    fn solve_internal(&mut self) -> lbool {
        assert_eq!(self.assign.decision_level(), 0);
        self.model.clear();
        self.conflict.clear();
        self.last_status = lbool::UNDEF;
        if !self.ok {
            return lbool::FALSE;
        }
        self.stats.solves += 1;

        // (re)build the decision heap; occurrence counts make a reasonable
        // static prior the first time a variable is seen
        if self.order_seeded_vars != self.num_vars() {
            self.build_order();
            self.order_seeded_vars = self.num_vars();
        } else {
            self.rebuild_order_heap();
        }
        self.restart.reset();

        let mut tmp_learnt: Vec<Lit> = vec![];
        info!("search.start");
        self.cb.on_start();

        let mut status = lbool::UNDEF;
        loop {
            let nof_conflicts = self.restart.next_limit();
            status = self.search(nof_conflicts, &mut tmp_learnt);
            if !self.within_budget() {
                break;
            }
            if status != lbool::UNDEF {
                break;
            }
            info!("search.restart");
            self.restart.advance();
            self.stats.restarts += 1;
            self.cb.on_restart();
        }

        self.cb.on_result(status);

        if status == lbool::TRUE {
            // Extend & copy model:
            let num_vars = self.num_vars();
            self.model.resize(num_vars as usize, lbool::UNDEF);
            for i in 0..num_vars {
                let v = Var::from_idx(i);
                self.model[i as usize] = self.assign.value(v);
            }
        } else if status == lbool::FALSE && self.conflict.len() == 0 {
            // NOTE: a `false` result with a non-empty conflict means the
            // *assumptions* are to blame; the clause set itself may well be
            // satisfiable, so `ok` stays true in that case.
            self.ok = false;
        }

        self.cancel_until(0);
        self.last_status = status;
        debug!("res: {:?}", status);
        status
    }

    /// Seed variable activities with occurrence counts over the problem
    /// clauses and build the heap.
    fn build_order(&mut self) {
        let nv = self.num_vars();
        let mut counts: VMap<f64> = VMap::new();
        if nv > 0 {
            counts.reserve(Var::from_idx(nv - 1), 0.0);
        }
        for &cr in &self.db.clauses {
            for &l in self.db.ca.get_ref(cr).lits() {
                counts[l.var()] += 1.0;
            }
        }
        for i in 0..nv {
            let v = Var::from_idx(i);
            self.order.set_activity(v, counts[v]);
        }
        self.rebuild_order_heap();
    }

    fn rebuild_order_heap(&mut self) {
        let mut vs = vec![];
        for v in (0..self.num_vars()).map(Var::from_idx) {
            if self.order.is_decision(v) && self.assign.value(v) == lbool::UNDEF {
                vs.push(v);
            }
        }
        self.order.rebuild(&vs);
    }

    /// Top-level simplification: propagate, then drop satisfied clauses
    /// and strip permanently false literals.
    fn simplify_internal(&mut self) -> bool {
        debug_assert_eq!(self.assign.decision_level(), 0);
        if !self.ok || self.propagate().is_some() {
            self.ok = false;
            return false;
        }

        if self.assign.num_assigns() as i64 == self.simp_db_assigns || self.simp_db_props > 0 {
            return true;
        }

        self.cb.on_simplify();
        self.db
            .remove_satisfied(true, &mut self.assign, &mut self.watches);
        if self.opts.remove_satisfied {
            self.db
                .remove_satisfied(false, &mut self.assign, &mut self.watches);
        }
        self.watches.clean_all(&self.db.ca);
        self.db.check_garbage(
            self.opts.garbage_frac,
            &mut self.assign,
            &mut self.watches,
            &mut self.cb,
        );
        self.rebuild_order_heap();

        self.simp_db_assigns = self.assign.num_assigns() as i64;
        // (shouldn't depend on stats really, but it will do for now)
        self.simp_db_props = self.db.literals() as i64;

        true
    }

    /// Reduce the learnt-clause database. Runs at level 0, right after the
    /// forced restart.
    fn reduce_db(&mut self) {
        debug_assert_eq!(self.assign.decision_level(), 0);
        debug!("reduce_db.start");
        if !self.simplify_internal() {
            return;
        }
        self.db
            .reduce(&mut self.assign, &mut self.watches, &mut self.cb);
        self.db.check_garbage(
            self.opts.garbage_frac,
            &mut self.assign,
            &mut self.watches,
            &mut self.cb,
        );
        debug!("reduce_db.done");
    }
}

// public API
impl<Cb: Callbacks> SolverInterface for Solver<Cb> {
    fn num_vars(&self) -> u32 {
        self.next_var.idx()
    }
    fn num_clauses(&self) -> u64 {
        self.db.num_clauses()
    }
    fn num_learnts(&self) -> u64 {
        self.db.num_learnts()
    }

    fn is_ok(&self) -> bool {
        self.ok
    }

    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        assert_eq!(
            self.assign.decision_level(),
            0,
            "add variable at non-zero decision level"
        );
        let v = self.next_var;
        self.next_var = Var::from_idx(v.idx() + 1);
        self.assign.init_var(v);
        self.order.init_var(v, dvar);
        self.watches.init(Lit::new(v, false));
        self.watches.init(Lit::new(v, true));
        self.seen.insert_default(v, false);
        self.user_pol.insert_default(v, upol);
        v
    }

    fn new_var_default(&mut self) -> Var {
        self.new_var(lbool::UNDEF, true)
    }

    fn var_of_int(&mut self, v_idx: u32) -> Var {
        while v_idx >= self.num_vars() {
            self.new_var_default();
        }
        let var = Var::from_idx(v_idx);
        debug_assert_eq!(var.idx(), v_idx);
        var
    }

    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool {
        debug!("add toplevel clause {:?}", clause);
        assert_eq!(
            self.assign.decision_level(),
            0,
            "add clause at non-zero decision level"
        );
        self.add_clause_(clause)
    }

    fn add_clause_dimacs(&mut self, lits: &[i32]) -> bool {
        let mut clause: Vec<Lit> = Vec::with_capacity(lits.len());
        for &i in lits {
            assert_ne!(i, 0, "`0` is a DIMACS terminator, not a literal");
            let v = self.var_of_int(i.unsigned_abs() - 1);
            clause.push(Lit::new(v, i > 0));
        }
        self.add_clause_reuse(&mut clause)
    }

    fn simplify(&mut self) -> bool {
        self.simplify_internal()
    }

    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool {
        self.asynch_interrupt.store(false, Ordering::SeqCst);
        self.assumptions.clear();
        self.assumptions.extend_from_slice(assumps);
        self.solve_internal()
    }

    fn get_model(&self) -> &[lbool] {
        assert_eq!(
            self.last_status,
            lbool::TRUE,
            "get_model: last solve was not SAT"
        );
        &self.model
    }

    fn value_var(&self, v: Var) -> lbool {
        self.model
            .get(v.idx() as usize)
            .map_or(lbool::UNDEF, |&val| val)
    }

    fn value_lit(&self, lit: Lit) -> lbool {
        self.value_var(lit.var()) ^ !lit.sign()
    }

    fn value_lvl_0(&self, lit: Lit) -> lbool {
        self.assign.fixed(lit)
    }

    fn proved_at_lvl_0(&self) -> &[Lit] {
        self.assign.proved_at_lvl_0()
    }

    fn unsat_core(&self) -> &[Lit] {
        self.conflict.as_slice()
    }

    fn unsat_core_contains_lit(&self, lit: Lit) -> bool {
        self.conflict.has(lit)
    }

    fn unsat_core_contains_var(&self, v: Var) -> bool {
        let lit = Lit::new(v, true);
        self.unsat_core_contains_lit(lit) || self.unsat_core_contains_lit(!lit)
    }

    fn print_stats(&self) {
        println!("c restarts              : {}", self.stats.restarts);
        println!("c conflicts             : {:<12}", self.stats.conflicts);
        println!("c decisions             : {:<12}", self.stats.decisions);
        println!("c propagations          : {:<12}", self.stats.propagations);
        println!(
            "c conflict literals     : {:<12}   ({:4.2} % deleted)",
            self.stats.tot_literals,
            (self.stats.max_literals - self.stats.tot_literals) as f64 * 100.0
                / self.stats.max_literals as f64
        );
    }
}

/// Print the model as a DIMACS `v` line.
pub struct SolverPrintDimacs<'a, Cb: Callbacks + 'a> {
    s: &'a Solver<Cb>,
}

impl<'a, Cb: Callbacks> fmt::Display for SolverPrintDimacs<'a, Cb> {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        write!(out, "v ")?;
        for (i, &val) in self.s.model.iter().enumerate() {
            if val == lbool::TRUE {
                write!(out, "{} ", i + 1)?
            } else if val == lbool::FALSE {
                write!(out, "-{} ", i + 1)?
            }
        }
        writeln!(out, "0")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callbacks::Basic;

    fn mk() -> Solver<Basic> {
        Solver::new(SolverOpts::default(), Basic::new())
    }

    fn assert_watch_invariant(s: &Solver<Basic>) {
        // every non-deleted clause of size >= 2 is watched by the negations
        // of its first two literals, exactly once each
        for &cr in s.db.clauses.iter().chain(s.db.learnts.iter()) {
            let c = s.db.ca.get_ref(cr);
            if c.mark() == 1 {
                continue;
            }
            for slot in 0..2u32 {
                let lit = c[slot];
                let n = s
                    .watches
                    .as_slice(!lit)
                    .iter()
                    .filter(|w| w.cref == cr)
                    .count();
                assert_eq!(n, 1, "clause {:?} watch count for {:?}", cr, lit);
            }
        }
    }

    #[test]
    fn test_propagation_chain() {
        let mut s = mk();
        // 1, (-1 2), (-2 3): everything follows at level 0
        s.add_clause_dimacs(&[-1, 2]);
        s.add_clause_dimacs(&[-2, 3]);
        s.add_clause_dimacs(&[1]);
        assert!(s.propagate().is_none());
        for i in 0..3 {
            let v = Var::from_idx(i);
            assert_eq!(s.assign.value(v), lbool::TRUE);
            assert_eq!(s.assign.level(v), 0);
        }
        assert_watch_invariant(&s);
    }

    #[test]
    fn test_propagation_conflict_drains_queue() {
        let mut s = mk();
        s.add_clause_dimacs(&[-1, 2]);
        s.add_clause_dimacs(&[-1, -2]);
        s.add_clause_dimacs(&[1]);
        assert!(s.propagate().is_some());
        // the queue was drained despite the conflict
        assert!(s.assign.dequeue().is_none());
        assert_watch_invariant(&s);
    }

    #[test]
    fn test_trail_invariant_after_backtrack() {
        let mut s = mk();
        s.add_clause_dimacs(&[-1, 2]);
        s.add_clause_dimacs(&[-1, 3]);
        assert!(s.propagate().is_none());
        s.assign.new_decision_level();
        let l1 = Lit::new(Var::from_idx(0), true);
        s.assign.unchecked_enqueue(l1, CRef::UNDEF);
        assert!(s.propagate().is_none());
        assert_eq!(s.assign.num_assigns(), 3);
        s.cancel_until(0);
        assert_eq!(s.assign.num_assigns(), 0);
        assert!(s.assign.dequeue().is_none());
        assert_watch_invariant(&s);
    }

    #[test]
    fn test_learn_unit_from_conflict() {
        // (-1 2) (-1 -2): deciding 1 must teach the solver -1
        let mut s = mk();
        s.add_clause_dimacs(&[-1, 2]);
        s.add_clause_dimacs(&[-1, -2]);
        let r = s.solve_limited(&[]);
        assert_eq!(r, lbool::TRUE);
        assert_eq!(s.value_lit(Lit::new(Var::from_idx(0), true)), lbool::FALSE);
    }
}
