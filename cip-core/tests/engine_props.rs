//! Engine-level invariant tests: bound monotonicity, soundness,
//! apply/undo symmetry after solving, parameter persistence.

use cip_core::{Engine, SolveStatus, VarKind};

/// min x + y  s.t.  3x + 3y >= 10,  x, y in [0, 10] integer.
///
/// The LP relaxation is fractional, so the solve branches.
fn branching_engine() -> Engine {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("branching").unwrap();
    let x = engine.add_var("x", VarKind::Integer, 1.0, 0.0, 10.0).unwrap();
    let y = engine.add_var("y", VarKind::Integer, 1.0, 0.0, 10.0).unwrap();
    engine
        .add_linear_cons("c", &[(x, 3.0), (y, 3.0)], 10.0, f64::INFINITY)
        .unwrap();
    engine
}

#[test]
fn test_branching_solve_is_optimal() {
    let mut engine = branching_engine();
    let status = engine.solve().unwrap();

    assert_eq!(status, SolveStatus::Optimal);
    // ceil(10/3) = 4 units split over the two variables.
    assert!((engine.primal_bound() - 4.0).abs() < 1e-6);
    assert!(engine.node_count() >= 2, "expected actual branching");
}

#[test]
fn test_child_bounds_monotone() {
    let mut engine = branching_engine();
    engine.solve().unwrap();

    for node in engine.tree.nodes() {
        if let Some(parent) = node.parent {
            let pb = engine.tree.node(parent).lower_bound;
            assert!(
                node.lower_bound >= pb - 1e-9,
                "child bound {} below parent bound {}",
                node.lower_bound,
                pb
            );
        }
    }
}

#[test]
fn test_soundness_incumbent_passes_full_check() {
    let mut engine = branching_engine();
    engine.solve().unwrap();

    let sol = engine.best_solution().expect("incumbent").clone();
    assert!(engine.check_solution(&sol, true, true).unwrap());

    // The incumbent objective dominates no closed node's bound.
    assert!(engine.primal_bound() >= engine.dual_bound() - 1e-9);
}

#[test]
fn test_local_domains_restored_after_solve() {
    let mut engine = branching_engine();
    engine.solve().unwrap();

    // After the search unwinds, every local domain equals the global
    // one again (apply/undo symmetry over the whole tree walk).
    for &v in engine.prob.trans_vars() {
        let var = engine.prob.var(v);
        assert_eq!(var.local.lb, var.global.lb, "variable {}", var.name);
        assert_eq!(var.local.ub, var.global.ub, "variable {}", var.name);
        assert_eq!(var.local.holes, var.global.holes);
    }
}

#[test]
fn test_propagation_closes_root_without_lp() {
    // x + y >= 4 with x, y in [0, 2] forces x = y = 2 by propagation;
    // the pseudo solution is then feasible and no LP is ever solved.
    let mut engine = Engine::new().unwrap();
    engine.create_prob("fixpoint").unwrap();
    let x = engine.add_var("x", VarKind::Integer, 1.0, 0.0, 2.0).unwrap();
    let y = engine.add_var("y", VarKind::Integer, 1.0, 0.0, 2.0).unwrap();
    engine
        .add_linear_cons("c", &[(x, 1.0), (y, 1.0)], 4.0, f64::INFINITY)
        .unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::Optimal);
    assert!((engine.primal_bound() - 4.0).abs() < 1e-6);
    assert_eq!(engine.node_count(), 1);
    assert_eq!(engine.lp_solve_count(), 0);
}

#[test]
fn test_parameter_file_roundtrip() {
    let mut engine = Engine::new().unwrap();
    engine.params.set_real("limits/time", 123.5).unwrap();
    engine.params.set_int("separating/maxrounds", 2).unwrap();
    engine
        .params
        .set_longint("limits/nodes", 5000)
        .unwrap();

    let mut path = std::env::temp_dir();
    path.push(format!("cip-params-{}.set", std::process::id()));
    engine.params.write_file(&path).unwrap();

    let mut other = Engine::new().unwrap();
    other.params.read_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    for param in engine.params.iter() {
        let mirrored = other.params.get(param.name()).unwrap();
        assert_eq!(
            mirrored.current(),
            param.current(),
            "mismatch for {}",
            param.name()
        );
    }
}

#[test]
fn test_stats_surface_consistency() {
    let mut engine = branching_engine();
    engine.solve().unwrap();

    assert!(engine.lp_solve_count() >= 1);
    assert!(engine.node_count() >= 1);
    assert!(engine.elapsed() >= 0.0);
    // Optimality means the bounds meet.
    assert!((engine.primal_bound() - engine.dual_bound()).abs() < 1e-6);
}

#[test]
fn test_time_limit_reports_limit_status() {
    let mut engine = branching_engine();
    engine.params.set_real("limits/time", 0.0).unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::TimeLimit);
}

#[test]
fn test_solve_requires_problem() {
    let mut engine = Engine::new().unwrap();
    assert!(engine.solve().is_err());
}
