use crate::clause::{lbool, Kind, Lit};

/// Basic callbacks to the solver.
///
/// Every method has a no-op default, so any subset can be overridden. The
/// clause hooks (`on_new_clause`/`on_delete_clause`) fire at exactly the
/// points where the clause database changes and are the seam a proof logger
/// plugs into; a solver with the default no-ops behaves identically.
pub trait Callbacks {
    /// Called before starting to solve.
    fn on_start(&mut self) {}

    /// Called after a restart.
    fn on_restart(&mut self) {}

    /// Called whenever the solver simplifies its set of clauses.
    fn on_simplify(&mut self) {}

    /// Called after a clause GC with the arena sizes in bytes.
    fn on_gc(&mut self, _old_size: usize, _new_size: usize) {}

    /// Called regularly to indicate progress. The status is only computed
    /// if the implementation asks for it.
    fn on_progress(&mut self, _compute: impl FnOnce() -> ProgressStatus) {}

    /// Called when a clause enters the database.
    fn on_new_clause(&mut self, _c: &[Lit], _k: Kind) {}

    /// Called when a clause is deleted from the database.
    fn on_delete_clause(&mut self, _c: &[Lit]) {}

    /// Called when a result is computed.
    fn on_result(&mut self, _s: lbool) {}

    /// Should we stop? Called regularly for asynchronous interrupts and such.
    fn stop(&self) -> bool {
        false
    }
}

/// Progress indicator from the SAT solver.
///
/// This is given to `Callbacks` regularly so it can log it somehow.
#[derive(Debug, Clone, Copy)]
pub struct ProgressStatus {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub n_clauses: u64,
    pub n_learnts: u64,
    pub restarts: u64,
    pub progress_estimate: f64,
}

/// Basic set of callbacks.
///
/// This doesn't do anything except storing a function for `stop`.
pub struct Basic {
    stop: Option<Box<dyn Fn() -> bool>>,
}

impl Callbacks for Basic {
    fn stop(&self) -> bool {
        match self.stop {
            None => false,
            Some(ref f) => f(),
        }
    }
}

impl Basic {
    /// Allocate a new set of callbacks.
    pub fn new() -> Self {
        Basic { stop: None }
    }

    /// Set the `stop` function.
    pub fn set_stop<F>(&mut self, f: F)
    where
        F: 'static + Fn() -> bool,
    {
        self.stop = Some(Box::new(f));
    }
}

impl Default for Basic {
    fn default() -> Self {
        Basic::new()
    }
}
