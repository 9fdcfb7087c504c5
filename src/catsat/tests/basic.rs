//! End-to-end tests of the solver through its public interface.

use catsat::{
    lbool, BasicSolver, Callbacks, ClauseKind, Lit, Proof, ReduceStrategy, Solver,
    SolverInterface, SolverOpts,
};

fn solver_of(clauses: &[&[i32]]) -> BasicSolver {
    let mut s = BasicSolver::default();
    for c in clauses {
        s.add_clause_dimacs(c);
    }
    s
}

/// DIMACS-convention literal against a solver (creates the variable).
fn lit<S: SolverInterface>(s: &mut S, i: i32) -> Lit {
    let v = s.var_of_int(i.unsigned_abs() - 1);
    Lit::new(v, i > 0)
}

/// Check that `model` satisfies every clause.
fn check_model(clauses: &[&[i32]], model: &[lbool]) {
    for c in clauses {
        let sat = c.iter().any(|&i| {
            let value = model[(i.unsigned_abs() - 1) as usize];
            if i > 0 {
                value == lbool::TRUE
            } else {
                value == lbool::FALSE
            }
        });
        assert!(sat, "clause {:?} not satisfied by model {:?}", c, model);
    }
}

/// Pigeonhole principle: `n` pigeons into `m` holes.
fn pigeonhole(n: u32, m: u32) -> Vec<Vec<i32>> {
    let p = |i: u32, j: u32| (i * m + j + 1) as i32;
    let mut clauses = vec![];
    for i in 0..n {
        clauses.push((0..m).map(|j| p(i, j)).collect::<Vec<_>>());
    }
    for j in 0..m {
        for i in 0..n {
            for k in i + 1..n {
                clauses.push(vec![-p(i, j), -p(k, j)]);
            }
        }
    }
    clauses
}

#[test]
fn test_unique_solution() {
    let clauses: &[&[i32]] = &[&[-1, 2], &[1, 2], &[-1, -2]];
    let mut s = solver_of(clauses);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    let model = s.get_model().to_vec();
    assert_eq!(model[0], lbool::FALSE);
    assert_eq!(model[1], lbool::TRUE);
    check_model(clauses, &model);
}

#[test]
fn test_over_constrained_unsat() {
    let mut s = solver_of(&[&[-1, 2], &[1, 2], &[-1, -2], &[1, -2]]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert!(!s.is_ok());
    // UNSAT is final: adding clauses cannot revive the solver
    assert!(!s.add_clause_dimacs(&[1]));
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn test_empty_clause_set_is_sat() {
    let mut s = BasicSolver::default();
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert!(s.get_model().is_empty());

    // a variable but no clauses: still SAT, with the variable valued
    let mut s = BasicSolver::default();
    s.new_var_default();
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert_eq!(s.get_model().len(), 1);
}

#[test]
fn test_contradicting_units() {
    let mut s = solver_of(&[&[1], &[-1]]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    // detected at level 0, before any decision
    assert_eq!(s.stats().decisions, 0);
}

#[test]
fn test_assumption_picks_branch() {
    let clauses: &[&[i32]] = &[&[-1, 2], &[1, 2], &[-1, -2]];
    let mut s = solver_of(clauses);
    let not1 = lit(&mut s, -1);
    assert_eq!(s.solve_limited(&[not1]), lbool::TRUE);
    let model = s.get_model().to_vec();
    assert_eq!(model[0], lbool::FALSE);
    check_model(clauses, &model);
}

#[test]
fn test_assumption_against_unique_solution() {
    let mut s = solver_of(&[&[-1, 2], &[1, 2], &[-1, -2]]);
    let l1 = lit(&mut s, 1);
    assert_eq!(s.solve_limited(&[l1]), lbool::FALSE);
    // the clause set itself is still satisfiable
    assert!(s.is_ok());
    assert!(s.unsat_core_contains_var(l1.var()));
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn test_assumption_contradicts_unit() {
    let mut s = solver_of(&[&[1]]);
    let not1 = lit(&mut s, -1);
    assert_eq!(s.solve_limited(&[not1]), lbool::FALSE);
    assert!(s.is_ok());
    let core = s.unsat_core();
    assert!(!core.is_empty());
    // the core names the guilty assumption (as the negation it implies)
    assert!(s.unsat_core_contains_lit(!not1));
    assert!(s.unsat_core_contains_var(not1.var()));
}

#[test]
fn test_assumptions_hold_in_model() {
    let mut s = solver_of(&[&[1, 2, 3], &[-1, -2], &[-2, -3]]);
    let a2 = lit(&mut s, 2);
    assert_eq!(s.solve_limited(&[a2]), lbool::TRUE);
    assert_eq!(s.value_lit(a2), lbool::TRUE);
}

#[test]
fn test_resolve_idempotent() {
    let clauses: &[&[i32]] = &[&[1, 2], &[-1, 3], &[-3, -2], &[2, 3]];
    let mut s = solver_of(clauses);
    let r1 = s.solve_limited(&[]);
    assert_eq!(r1, lbool::TRUE);
    let m1 = s.get_model().to_vec();
    let r2 = s.solve_limited(&[]);
    assert_eq!(r2, lbool::TRUE);
    let m2 = s.get_model().to_vec();
    check_model(clauses, &m1);
    assert_eq!(m1, m2, "re-solve changed the model");
}

#[test]
fn test_deterministic_across_runs() {
    let clauses: &[&[i32]] = &[&[1, 2, 3], &[-1, -2], &[-1, -3], &[-2, -3], &[1, 2]];
    let mut a = solver_of(clauses);
    let mut b = solver_of(clauses);
    assert_eq!(a.solve_limited(&[]), lbool::TRUE);
    assert_eq!(b.solve_limited(&[]), lbool::TRUE);
    assert_eq!(a.get_model(), b.get_model());
    assert_eq!(a.stats().decisions, b.stats().decisions);
    assert_eq!(a.stats().conflicts, b.stats().conflicts);
}

#[test]
fn test_incremental_strengthening() {
    // solve, pin the found branch down, solve again, until UNSAT
    let mut s = solver_of(&[&[1, 2], &[2, 3], &[-1, -3]]);
    let mut rounds = 0;
    while s.solve_limited(&[]) == lbool::TRUE {
        rounds += 1;
        assert!(rounds <= 8, "too many models for 3 variables");
        // block the current model
        let blocking: Vec<i32> = (0..s.num_vars())
            .map(|i| {
                let positive = s.get_model()[i as usize] == lbool::TRUE;
                let mag = (i + 1) as i32;
                if positive {
                    -mag
                } else {
                    mag
                }
            })
            .collect();
        s.add_clause_dimacs(&blocking);
    }
    assert!(rounds > 0, "the initial formula is satisfiable");
    assert!(!s.is_ok());
}

#[test]
fn test_pigeonhole_unsat() {
    let clauses = pigeonhole(5, 4);
    let mut s = BasicSolver::default();
    for c in &clauses {
        s.add_clause_dimacs(c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert!(s.stats().conflicts > 0);
}

#[test]
fn test_pigeonhole_sat_when_it_fits() {
    let clauses = pigeonhole(4, 4);
    let mut s = BasicSolver::default();
    for c in &clauses {
        s.add_clause_dimacs(c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    let refs: Vec<&[i32]> = clauses.iter().map(|c| c.as_slice()).collect();
    check_model(&refs, &s.get_model().to_vec());
}

#[test]
fn test_budget_unknown_then_resume() {
    let clauses = pigeonhole(6, 5);
    let mut s = BasicSolver::default();
    for c in &clauses {
        s.add_clause_dimacs(c);
    }
    s.set_conflict_budget(1);
    assert_eq!(s.solve_limited(&[]), lbool::UNDEF);
    // solver state stayed valid; resume with no budget and finish
    s.budget_off();
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn test_callback_stop_gives_unknown() {
    let clauses = pigeonhole(6, 5);
    let mut cb = catsat::BasicCallbacks::new();
    cb.set_stop(|| true);
    let mut s: BasicSolver = Solver::new(SolverOpts::default(), cb);
    for c in &clauses {
        s.add_clause_dimacs(c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::UNDEF);
}

#[test]
#[should_panic(expected = "get_model")]
fn test_get_model_needs_sat() {
    let mut s = solver_of(&[&[1], &[-1]]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    let _ = s.get_model();
}

#[test]
fn test_level_0_values() {
    let mut s = solver_of(&[&[1], &[-1, 2]]);
    assert!(s.simplify());
    let l1 = lit(&mut s, 1);
    let l2 = lit(&mut s, 2);
    let l3 = lit(&mut s, 3);
    assert_eq!(s.value_lvl_0(l1), lbool::TRUE);
    assert_eq!(s.value_lvl_0(l2), lbool::TRUE);
    assert_eq!(s.value_lvl_0(!l1), lbool::FALSE);
    assert_eq!(s.value_lvl_0(l3), lbool::UNDEF);
    assert_eq!(s.proved_at_lvl_0().len(), 2);
}

#[test]
fn test_tautology_and_duplicates_dropped() {
    let mut s = BasicSolver::default();
    assert!(s.add_clause_dimacs(&[1, -1, 2])); // tautology, dropped
    assert_eq!(s.num_clauses(), 0);
    assert!(s.add_clause_dimacs(&[3, 3, 4])); // duplicate literal collapsed
    assert_eq!(s.num_clauses(), 1);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn test_reduction_preserves_answers() {
    // force aggressive reductions and make sure answers do not change
    for strategy in [ReduceStrategy::Activity, ReduceStrategy::Lbd] {
        let opts = SolverOpts {
            reduce_first: 1,
            reduce_inc: 1.0,
            reduce_strategy: strategy,
            ..SolverOpts::default()
        };
        let mut s: BasicSolver = Solver::new(opts.clone(), Default::default());
        for c in &pigeonhole(5, 4) {
            s.add_clause_dimacs(c);
        }
        assert_eq!(s.solve_limited(&[]), lbool::FALSE, "{:?}", strategy);

        let mut s: BasicSolver = Solver::new(opts, Default::default());
        let clauses = pigeonhole(4, 4);
        for c in &clauses {
            s.add_clause_dimacs(c);
        }
        assert_eq!(s.solve_limited(&[]), lbool::TRUE, "{:?}", strategy);
        let refs: Vec<&[i32]> = clauses.iter().map(|c| c.as_slice()).collect();
        check_model(&refs, &s.get_model().to_vec());
    }
}

/// Callbacks recording a DRAT proof, as the CLI does.
#[derive(Default)]
struct ProofCb {
    proof: Proof,
}

impl Callbacks for ProofCb {
    fn on_new_clause(&mut self, c: &[Lit], k: ClauseKind) {
        if k == ClauseKind::Learnt {
            self.proof.create_clause(c);
        }
    }
    fn on_delete_clause(&mut self, c: &[Lit]) {
        self.proof.delete_clause(c);
    }
}

#[test]
fn test_drat_proof_well_formed() {
    let mut s: Solver<ProofCb> = Solver::new(SolverOpts::default(), ProofCb::default());
    for c in &pigeonhole(4, 3) {
        s.add_clause_dimacs(c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);

    let text = s.cb().proof.to_string();
    assert!(!text.is_empty());
    for line in text.lines() {
        let line = line.trim();
        assert!(
            line == "0" || line.ends_with(" 0"),
            "ill-terminated proof line: {:?}",
            line
        );
        if let Some(rest) = line.strip_prefix('d') {
            assert!(rest.starts_with(' '), "bad deletion line: {:?}", line);
        }
    }
    // the recorded refutation ends with the empty clause
    assert!(text.trim_end().ends_with('0'));

    let mut binary = vec![];
    s.cb().proof.write_binary(&mut binary).unwrap();
    assert!(binary.starts_with(b"a") || binary.starts_with(b"d"));
    assert_eq!(binary.last(), Some(&0u8));
}

#[test]
fn test_proof_callbacks_are_transparent() {
    // a proof-recording solver and a no-op solver agree everywhere
    let clauses = pigeonhole(5, 4);
    let mut with_proof: Solver<ProofCb> = Solver::new(SolverOpts::default(), ProofCb::default());
    let mut without = BasicSolver::default();
    for c in &clauses {
        with_proof.add_clause_dimacs(c);
        without.add_clause_dimacs(c);
    }
    assert_eq!(with_proof.solve_limited(&[]), without.solve_limited(&[]));
    assert_eq!(
        with_proof.stats().conflicts,
        without.stats().conflicts,
        "proof recording changed the search"
    );
}
