/* Main Interface */

use crate::clause::{lbool, Lit, Var};

/// Main interface for a solver: it makes it possible to add clauses,
/// allocate variables, and check for satisfiability.
///
/// Everything here is callable between `solve_limited` calls, so the solver
/// can be used incrementally: add clauses, solve under assumptions, add more
/// clauses, solve again.
pub trait SolverInterface {
    fn num_vars(&self) -> u32;
    fn num_clauses(&self) -> u64;
    fn num_learnts(&self) -> u64;

    /// `false` once the clause set has been proved unsatisfiable
    /// independently of any assumptions.
    fn is_ok(&self) -> bool;

    /// Creates a new SAT variable in the solver. If `dvar` is cleared, the
    /// variable will not be used as a decision variable (NOTE! This has
    /// effects on the meaning of a SATISFIABLE result).
    ///
    /// Only valid at decision level 0.
    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var;

    /// Create a new variable with the default polarity.
    fn new_var_default(&mut self) -> Var;

    /// Obtain the variable with the given 0-based index, creating it (and
    /// everything below it) if needed.
    fn var_of_int(&mut self, v_idx: u32) -> Var;

    /// Add a clause to the solver. Returns `false` if the solver is in an
    /// UNSAT state. The given vector may be modified.
    ///
    /// Only valid at decision level 0.
    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool;

    /// Add a clause given in the DIMACS convention: non-zero integers whose
    /// sign is the polarity and whose magnitude is the 1-based variable
    /// number. Grows the variable set as needed.
    fn add_clause_dimacs(&mut self, lits: &[i32]) -> bool;

    /// Simplify the clause database according to the current top-level
    /// assignment: satisfied clauses are dropped, permanently false
    /// literals stripped.
    fn simplify(&mut self) -> bool;

    /// Search for a model that respects the given assumptions (and the
    /// configured resource budgets).
    ///
    /// Returns `lbool::TRUE` (satisfiable; a model is available),
    /// `lbool::FALSE` (unsatisfiable; an unsat core over the assumptions is
    /// available), or `lbool::UNDEF` (budget exhausted or interrupted; the
    /// solver may be called again to resume).
    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool;

    /// Query the whole model.
    ///
    /// Precondition: the last result was SAT (ie `lbool::TRUE`); anything
    /// else is a usage error and panics.
    fn get_model(&self) -> &[lbool];

    /// Query the model for a variable.
    fn value_var(&self, v: Var) -> lbool;

    /// Query the model for a literal.
    fn value_lit(&self, lit: Lit) -> lbool;

    /// Value of this literal if it is assigned at level 0, `UNDEF` otherwise.
    fn value_lvl_0(&self, lit: Lit) -> lbool;

    /// The literals proved at level 0 so far. These keep their value in
    /// every later solve.
    fn proved_at_lvl_0(&self) -> &[Lit];

    /// Return the unsat core (a subset of the assumptions).
    ///
    /// Precondition: last result was UNSAT.
    fn unsat_core(&self) -> &[Lit];

    /// Does this literal occur in the unsat core?
    fn unsat_core_contains_lit(&self, lit: Lit) -> bool;

    /// Does this variable occur in the unsat core?
    fn unsat_core_contains_var(&self, v: Var) -> bool;

    /// Print some current statistics to standard output.
    fn print_stats(&self);
}
