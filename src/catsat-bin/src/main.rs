/*****************************************************************************************[main.rs]
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

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use flate2::bufread::GzDecoder;
use log::debug;

use catsat::{
    lbool, BranchMode, Callbacks, ClauseKind, Lit, ProgressStatus, Proof, ReduceStrategy, Solver,
    SolverInterface, SolverOpts,
};

mod system;

/// CDCL SAT solver for DIMACS CNF problems.
#[derive(Parser, Debug)]
#[command(name = "catsat", version, about)]
struct Opts {
    /// Input file in DIMACS CNF (gzip auto-detected); stdin when absent.
    input_file: Option<PathBuf>,

    /// File the result (and model or proof) is also written to.
    result_output_file: Option<PathBuf>,

    /// Produce a proof in DRAT on stdout (or the result file).
    #[arg(long)]
    proof: bool,

    /// Emit the DRAT proof in binary instead of text.
    #[arg(long, requires = "proof")]
    proof_binary: bool,

    /// Verbosity level (0-2).
    #[arg(long, default_value_t = 1)]
    verb: i32,

    /// CPU time limit in seconds (no limit if <= 0).
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    cpu_lim: f64,

    /// Conflict budget; when exhausted the answer is INDETERMINATE.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    conflict_budget: i64,

    /// Fail if the clause count does not match the DIMACS header.
    #[arg(long)]
    strict: bool,

    /// Accept the incremental .icnf format.
    #[arg(long)]
    incremental: bool,

    /// The variable activity decay factor.
    #[arg(long, default_value_t = 0.95)]
    var_decay: f64,

    /// The clause activity decay factor.
    #[arg(long = "cla-decay", default_value_t = 0.999)]
    clause_decay: f64,

    /// Conflict clause minimization (0=none, 1=basic, 2=deep).
    #[arg(long, default_value_t = 2)]
    ccmin_mode: i32,

    /// Phase saving (0=none, 1=limited, 2=full).
    #[arg(long, default_value_t = 2)]
    phase_saving: i32,

    /// Do not use the Luby restart sequence (geometric restarts instead).
    #[arg(long = "no-luby")]
    no_luby_restart: bool,

    /// The base restart interval.
    #[arg(long = "rfirst", default_value_t = 100)]
    restart_first: u32,

    /// Restart interval increase factor.
    #[arg(long = "rinc", default_value_t = 2.0)]
    restart_inc: f64,

    /// Learnt clause limit before the first database reduction.
    #[arg(long, default_value_t = 2000)]
    reduce_first: u32,

    /// Learnt clause limit increase per reduction.
    #[arg(long, default_value_t = 300.0)]
    reduce_inc: f64,

    /// Which learnt clauses a reduction deletes first.
    #[arg(long, value_enum, default_value = "activity")]
    reduce_strategy: ReduceArg,

    /// Branch on activity order, or sequentially by index.
    #[arg(long, value_enum, default_value = "vsids")]
    branch: BranchArg,

    /// The fraction of wasted memory allowed before a garbage collection
    /// is triggered.
    #[arg(long = "gc-frac", default_value_t = 0.20)]
    garbage_frac: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReduceArg {
    Activity,
    Lbd,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BranchArg {
    Vsids,
    Sequential,
}

/// Callbacks of the CLI: proof recording, progress lines, CPU budget.
#[derive(Default)]
struct CliCallbacks {
    proof: Option<Proof>,
    stop: Option<Box<dyn Fn() -> bool>>,
    verbosity: i32,
}

impl Callbacks for CliCallbacks {
    fn on_progress(&mut self, compute: impl FnOnce() -> ProgressStatus) {
        if self.verbosity >= 2 {
            let st = compute();
            println!(
                "c | {:9} conflicts | {:9} decisions | {:7} clauses | {:7} learnts | {:6.3} % |",
                st.conflicts, st.decisions, st.n_clauses, st.n_learnts, st.progress_estimate
            );
        }
    }

    fn on_new_clause(&mut self, c: &[Lit], k: ClauseKind) {
        if k == ClauseKind::Learnt {
            if let Some(p) = &mut self.proof {
                p.create_clause(c);
            }
        }
    }

    fn on_delete_clause(&mut self, c: &[Lit]) {
        if let Some(p) = &mut self.proof {
            p.delete_clause(c);
        }
    }

    fn stop(&self) -> bool {
        match &self.stop {
            None => false,
            Some(f) => f(),
        }
    }
}

fn main() {
    env_logger::init();
    let exitcode = main2().unwrap_or_else(|err| {
        eprintln!("{:#}", err);
        exit(1)
    });
    exit(exitcode);
}

fn main2() -> anyhow::Result<i32> {
    let resource = system::ResourceMeasure::new();
    let opts = Opts::parse();

    let solver_opts = SolverOpts {
        var_decay: opts.var_decay,
        clause_decay: opts.clause_decay,
        ccmin_mode: opts.ccmin_mode,
        phase_saving: opts.phase_saving,
        luby_restart: !opts.no_luby_restart,
        restart_first: opts.restart_first,
        restart_inc: opts.restart_inc,
        reduce_first: opts.reduce_first,
        reduce_inc: opts.reduce_inc,
        reduce_strategy: match opts.reduce_strategy {
            ReduceArg::Activity => ReduceStrategy::Activity,
            ReduceArg::Lbd => ReduceStrategy::Lbd,
        },
        branch_mode: match opts.branch {
            BranchArg::Vsids => BranchMode::Vsids,
            BranchArg::Sequential => BranchMode::Sequential,
        },
        garbage_frac: opts.garbage_frac,
        ..SolverOpts::default()
    };
    if !solver_opts.check() {
        bail!("invalid option value");
    }

    let cb = CliCallbacks {
        proof: if opts.proof { Some(Proof::new()) } else { None },
        stop: None,
        verbosity: opts.verb,
    };
    let mut solver = Solver::new(solver_opts, cb);

    // setup timeout handler, if any
    if opts.cpu_lim > 0.0 {
        let max_cpu = opts.cpu_lim;
        let r = system::ResourceMeasure::new();
        solver.cb_mut().stop = Some(Box::new(move || r.cpu_time() > max_cpu));
    }
    if opts.conflict_budget >= 0 {
        solver.set_conflict_budget(opts.conflict_budget);
    }

    let initial_time = Instant::now();

    if let Some(input_file) = &opts.input_file {
        debug!("solve file {}", input_file.display());
        let file = BufReader::new(
            File::open(input_file)
                .with_context(|| format!("cannot open `{}`", input_file.display()))?,
        );
        read_input_autogz(file, &mut solver, opts.strict, opts.incremental)?;
    } else {
        println!("c Reading from standard input... Use '--help' for help.");
        let stdin = io::stdin();
        read_input_autogz(stdin.lock(), &mut solver, opts.strict, opts.incremental)?;
    }

    let mut resfile = match &opts.result_output_file {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create `{}`", path.display()))?,
        )),
        None => None,
    };

    if opts.verb > 0 {
        println!(
            "c |  Number of variables:  {:12}                                         |",
            solver.num_vars()
        );
        println!(
            "c |  Number of clauses:    {:12}                                         |",
            solver.num_clauses()
        );
        let duration = Instant::now() - initial_time;
        println!(
            "c |  Parse time:           {:9}.{:02} s                                       |",
            duration.as_secs(),
            duration.subsec_nanos() / 10_000_000
        );
    }

    if !solver.simplify() {
        if let Some(resfile) = resfile.as_mut() {
            writeln!(resfile, "s UNSAT")?;
            write_proof(&solver, resfile, opts.proof_binary)?;
            resfile.flush()?;
        }
        if opts.verb > 0 {
            println!("c Solved by unit propagation");
            solver.print_stats();
        }
        if opts.proof && resfile.is_none() {
            write_proof(&solver, &mut io::stdout().lock(), opts.proof_binary)?;
        }
        println!("s UNSATISFIABLE");
        return Ok(20);
    }

    let ret = solver.solve_limited(&[]);
    if opts.verb > 0 {
        solver.print_stats();
        println!("c CPU time              : {:.3}s", resource.cpu_time());
    }
    if ret == lbool::TRUE {
        println!("s SATISFIABLE");
        println!("{}", solver.dimacs_model());
    } else if ret == lbool::FALSE {
        println!("s UNSATISFIABLE");
        if opts.proof && resfile.is_none() {
            write_proof(&solver, &mut io::stdout().lock(), opts.proof_binary)?;
        }
    } else {
        println!("s INDETERMINATE");
    }

    if let Some(resfile) = resfile.as_mut() {
        if ret == lbool::TRUE {
            writeln!(resfile, "s SAT")?;
            writeln!(resfile, "{}", solver.dimacs_model())?;
        } else if ret == lbool::FALSE {
            writeln!(resfile, "s UNSAT")?;
            write_proof(&solver, resfile, opts.proof_binary)?;
        } else {
            writeln!(resfile, "s INDET")?;
        }
        resfile.flush()?;
    }
    drop(resfile);

    let exitcode = if ret == lbool::TRUE {
        10
    } else if ret == lbool::FALSE {
        20
    } else {
        0
    };
    Ok(exitcode)
}

fn write_proof<W: Write>(
    solver: &Solver<CliCallbacks>,
    out: &mut W,
    binary: bool,
) -> io::Result<()> {
    if let Some(proof) = &solver.cb().proof {
        if binary {
            proof.write_binary(out)?;
        } else {
            proof.write_text(out)?;
        }
    }
    Ok(())
}

fn read_input_autogz<R: BufRead>(
    mut input: R,
    solver: &mut Solver<CliCallbacks>,
    is_strict: bool,
    incremental: bool,
) -> anyhow::Result<()> {
    let is_gz = input.fill_buf()?.starts_with(b"\x1F\x8B");
    if is_gz {
        read_input(
            BufReader::new(GzDecoder::new(input)),
            solver,
            is_strict,
            incremental,
        )
    } else {
        read_input(input, solver, is_strict, incremental)
    }
}

fn read_input<R: BufRead>(
    mut input: R,
    solver: &mut Solver<CliCallbacks>,
    is_strict: bool,
    incremental: bool,
) -> anyhow::Result<()> {
    catsat::dimacs::parse(&mut input, solver, is_strict, incremental)?;
    Ok(())
}
