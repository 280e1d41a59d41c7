//! Command-line front end for the cip-core solver.

mod reader_cip;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cip_core::{CipError, Engine, SolveStatus};
use reader_cip::CipReader;

#[derive(Parser)]
#[command(name = "cip")]
#[command(about = "Branch-and-bound solver for constraint integer programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file
    Solve {
        /// Path to the problem file (format chosen by extension)
        path: PathBuf,
        /// Parameter file applied before solving
        #[arg(long)]
        params: Option<PathBuf>,
        /// Time limit in seconds
        #[arg(long)]
        time_limit: Option<f64>,
        /// Node limit
        #[arg(long)]
        node_limit: Option<i64>,
        /// Objective limit (prunes like a known incumbent)
        #[arg(long)]
        obj_limit: Option<f64>,
    },
    /// Write the default parameter set to a file
    Params {
        /// Output path
        path: PathBuf,
    },
}

fn build_engine() -> Result<Engine, CipError> {
    let mut engine = Engine::new()?;
    engine.include_reader(Box::new(CipReader))?;
    Ok(engine)
}

fn run(cli: Cli) -> Result<(), CipError> {
    match cli.command {
        Commands::Solve {
            path,
            params,
            time_limit,
            node_limit,
            obj_limit,
        } => {
            let mut engine = build_engine()?;
            if let Some(params) = params {
                engine.params.read_file(&params)?;
            }
            if let Some(limit) = time_limit {
                engine.params.set_real("limits/time", limit)?;
            }
            if let Some(limit) = node_limit {
                engine.params.set_longint("limits/nodes", limit)?;
            }
            engine.read_problem(&path)?;
            if let Some(limit) = obj_limit {
                engine.set_objective_limit(limit);
            }

            let status = engine.solve()?;
            print_result(&engine, status);
            Ok(())
        }
        Commands::Params { path } => {
            let engine = build_engine()?;
            engine.params.write_file(&path)?;
            println!("wrote {} parameters to {}", engine.params.len(), path.display());
            Ok(())
        }
    }
}

fn print_result(engine: &Engine, status: SolveStatus) {
    println!("status            : {status:?}");
    println!("primal bound      : {:.9}", engine.primal_bound());
    println!("dual bound        : {:.9}", engine.dual_bound());
    println!("nodes             : {}", engine.node_count());
    println!("LP solves         : {}", engine.lp_solve_count());
    println!("separation rounds : {}", engine.separation_rounds());
    println!("cuts generated    : {}", engine.cuts_generated());
    println!("time (s)          : {:.3}", engine.elapsed());

    if let Some(sol) = engine.best_solution() {
        println!("best solution ({} nonzeros):", sol.nnz());
        for &v in engine.prob.trans_vars() {
            let var = engine.prob.var(v);
            let value = sol.value(&engine.prob, v);
            if value.abs() > 1e-9 {
                println!("  {} = {value}", var.name);
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        // Normal termination of the solving process, whatever the
        // verdict: success.
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            match e {
                // I/O and input trouble.
                CipError::Read(_)
                | CipError::Write(_)
                | CipError::NoFile(_)
                | CipError::FileCreate(_)
                | CipError::Parse { .. }
                | CipError::ParameterUnknown(_)
                | CipError::ParameterWrongType(_)
                | CipError::ParameterWrongValue(_)
                | CipError::PluginNotFound(_) => ExitCode::from(2),
                // Internal invariant failures.
                _ => ExitCode::from(3),
            }
        }
    }
}
