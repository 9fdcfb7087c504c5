//! Property tests cross-checking the solver against exhaustive enumeration
//! on small random formulas.

use catsat::{lbool, BasicSolver, Lit, SolverInterface};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Cnf {
    num_vars: u32,
    clauses: Vec<Vec<i32>>,
}

fn cnf_strategy() -> impl Strategy<Value = Cnf> {
    (1u32..=8).prop_flat_map(|nv| {
        let lit = (1..=nv as i32, any::<bool>()).prop_map(|(v, pos)| if pos { v } else { -v });
        let clause = prop::collection::vec(lit, 1..=4);
        prop::collection::vec(clause, 0..=24).prop_map(move |clauses| Cnf {
            num_vars: nv,
            clauses,
        })
    })
}

fn lit_holds(l: i32, assignment: u32) -> bool {
    let bit = (assignment >> (l.unsigned_abs() - 1)) & 1 == 1;
    if l > 0 {
        bit
    } else {
        !bit
    }
}

/// Truth-table satisfiability check.
fn brute_force_sat(cnf: &Cnf) -> bool {
    (0u32..(1u32 << cnf.num_vars)).any(|a| {
        cnf.clauses
            .iter()
            .all(|c| c.iter().any(|&l| lit_holds(l, a)))
    })
}

fn solver_of(cnf: &Cnf) -> BasicSolver {
    let mut s = BasicSolver::default();
    s.var_of_int(cnf.num_vars - 1); // fix the variable count up front
    for c in &cnf.clauses {
        s.add_clause_dimacs(c);
    }
    s
}

fn model_satisfies(model: &[lbool], clauses: &[Vec<i32>]) -> bool {
    clauses.iter().all(|c| {
        c.iter().any(|&l| {
            let val = model[(l.unsigned_abs() - 1) as usize];
            if l > 0 {
                val == lbool::TRUE
            } else {
                val == lbool::FALSE
            }
        })
    })
}

proptest! {
    #[test]
    fn matches_brute_force(cnf in cnf_strategy()) {
        let expected = brute_force_sat(&cnf);
        let mut s = solver_of(&cnf);
        let res = s.solve_limited(&[]);
        prop_assert_eq!(res, if expected { lbool::TRUE } else { lbool::FALSE });
        if expected {
            let model = s.get_model().to_vec();
            prop_assert!(model_satisfies(&model, &cnf.clauses));
        }
    }

    #[test]
    fn assumption_matches_adding_a_unit(
        (cnf, avar, apos) in (cnf_strategy(), any::<u32>(), any::<bool>())
    ) {
        let v = (avar % cnf.num_vars) + 1;
        let unit = if apos { v as i32 } else { -(v as i32) };

        let mut strengthened = cnf.clone();
        strengthened.clauses.push(vec![unit]);
        let expected = brute_force_sat(&strengthened);

        let mut s = solver_of(&cnf);
        let a = Lit::new(s.var_of_int(v - 1), apos);
        let res = s.solve_limited(&[a]);
        prop_assert_eq!(res, if expected { lbool::TRUE } else { lbool::FALSE });
        if expected {
            let model = s.get_model().to_vec();
            prop_assert!(model_satisfies(&model, &cnf.clauses));
            // the assumption holds in the model
            prop_assert_eq!(s.value_lit(a), lbool::TRUE);
        } else {
            // the core only mentions assumptions
            prop_assert!(s.unsat_core().iter().all(|&l| l.var() == a.var()));
        }
    }

    #[test]
    fn resolving_twice_is_stable(cnf in cnf_strategy()) {
        let mut s = solver_of(&cnf);
        let r1 = s.solve_limited(&[]);
        let r2 = s.solve_limited(&[]);
        prop_assert_eq!(r1, r2);
    }
}
