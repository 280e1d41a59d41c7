//! End-to-end tests for mixed-integer linear problems.

use cip_core::{Engine, ObjSense, SolOrigin, SolveStatus, VarKind};

/// min x + y  s.t.  x + y >= 1,  x, y binary.
fn cover_engine() -> Engine {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("cover").unwrap();
    let x = engine.add_var("x", VarKind::Binary, 1.0, 0.0, 1.0).unwrap();
    let y = engine.add_var("y", VarKind::Binary, 1.0, 0.0, 1.0).unwrap();
    engine
        .add_linear_cons("c", &[(x, 1.0), (y, 1.0)], 1.0, f64::INFINITY)
        .unwrap();
    engine
}

#[test]
fn test_trivial_cover_optimal() {
    let mut engine = cover_engine();
    let status = engine.solve().unwrap();

    assert_eq!(status, SolveStatus::Optimal);
    assert!((engine.primal_bound() - 1.0).abs() < 1e-6);
    assert!((engine.dual_bound() - 1.0).abs() < 1e-6);
    assert!(engine.node_count() <= 3);

    // The incumbent picks exactly one of the two variables.
    let sol = engine.best_solution().expect("incumbent").clone();
    let x = engine.prob.orig_vars()[0];
    let y = engine.prob.orig_vars()[1];
    let xv = sol.value(&engine.prob, x);
    let yv = sol.value(&engine.prob, y);
    assert!((xv + yv - 1.0).abs() < 1e-6);
    assert!((xv - xv.round()).abs() < 1e-6);
    assert!((yv - yv.round()).abs() < 1e-6);
}

#[test]
fn test_unbounded_problem_with_ray() {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("unbounded").unwrap();
    let x = engine
        .add_var("x", VarKind::Continuous, -1.0, 0.0, f64::INFINITY)
        .unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::Unbounded);

    let ray = engine.primal_ray().expect("primal ray").clone();
    assert!(ray.value(&engine.prob, x) > 0.0);
}

#[test]
fn test_infeasible_bounds_conflict() {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("infeasible").unwrap();
    let x = engine.add_var("x", VarKind::Binary, 0.0, 0.0, 1.0).unwrap();
    engine
        .add_linear_cons("ge", &[(x, 1.0)], 1.0, f64::INFINITY)
        .unwrap();
    engine
        .add_linear_cons("le", &[(x, 1.0)], f64::NEG_INFINITY, 0.0)
        .unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::Infeasible);
    assert!(engine.best_solution().is_none());
    assert_eq!(engine.dual_bound(), f64::INFINITY);
}

/// min x + y + 10 z  s.t.  5x + 5y + 10z >= 6,  x - y = 0,  all binary.
///
/// The root LP sits at (0.6, 0.6, 0); rounding the least fractional
/// variable in a dive reaches the feasible point (1, 1, 0).
fn coupled_engine() -> Engine {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("coupled").unwrap();
    let x = engine.add_var("x", VarKind::Binary, 1.0, 0.0, 1.0).unwrap();
    let y = engine.add_var("y", VarKind::Binary, 1.0, 0.0, 1.0).unwrap();
    let z = engine.add_var("z", VarKind::Binary, 10.0, 0.0, 1.0).unwrap();
    engine
        .add_linear_cons(
            "cover",
            &[(x, 5.0), (y, 5.0), (z, 10.0)],
            6.0,
            f64::INFINITY,
        )
        .unwrap();
    engine
        .add_linear_cons("couple", &[(x, 1.0), (y, -1.0)], 0.0, 0.0)
        .unwrap();
    engine
}

#[test]
fn test_diving_heuristic_finds_first_solution() {
    let mut engine = coupled_engine();
    let status = engine.solve().unwrap();

    assert_eq!(status, SolveStatus::Optimal);
    assert!((engine.primal_bound() - 2.0).abs() < 1e-6);

    // The rounding dive found a solution before the search did.
    let dived = engine
        .sols
        .iter()
        .any(|s| matches!(s.origin, SolOrigin::Heuristic(ref name) if name == "rounddive"));
    assert!(dived, "expected a solution of heuristic origin");
}

mod gomory {
    //! A test separator exercising the separation contract under the
    //! name the parameter keys expect.

    use cip_core::cons::SepaResult;
    use cip_core::plugins::{Cut, Separator};
    use cip_core::{CipResult, Engine, VarId};

    pub struct GomorySepa {
        pub entries: Vec<(VarId, f64)>,
        pub lhs: f64,
    }

    impl Separator for GomorySepa {
        fn name(&self) -> &'static str {
            "gomory"
        }

        fn execute_lp(&mut self, engine: &mut Engine, _depth: usize) -> CipResult<SepaResult> {
            let cut = Cut::ge("gomorycut", self.entries.clone(), self.lhs);
            Ok(if engine.add_cut(cut)? {
                SepaResult::Separated
            } else {
                SepaResult::DidNotFind
            })
        }
    }
}

fn coupled_engine_with_gomory() -> Engine {
    let mut engine = coupled_engine();
    let x = engine.prob.orig_vars()[0];
    let y = engine.prob.orig_vars()[1];
    let z = engine.prob.orig_vars()[2];
    // x + y + 2z >= 2 is valid for the integer hull and cuts (0.6, 0.6, 0).
    engine
        .include_separator(Box::new(gomory::GomorySepa {
            entries: vec![(x, 1.0), (y, 1.0), (z, 2.0)],
            lhs: 2.0,
        }))
        .unwrap();
    engine
}

#[test]
fn test_separator_generates_cuts() {
    let mut engine = coupled_engine_with_gomory();
    let status = engine.solve().unwrap();

    assert_eq!(status, SolveStatus::Optimal);
    assert!((engine.primal_bound() - 2.0).abs() < 1e-6);
    assert!(engine.cuts_of_separator("gomory") >= 1);
    assert!(engine.cuts_generated() >= 1);
    assert!(engine.separation_rounds() >= 1);
}

#[test]
fn test_separator_disabled_by_parameter_file() {
    let mut engine = coupled_engine_with_gomory();
    engine
        .params
        .read_str("separating/gomory/maxroundsroot = 0\nseparating/gomory/maxrounds = 0\n")
        .unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::Optimal);
    assert!((engine.primal_bound() - 2.0).abs() < 1e-6);
    assert_eq!(engine.cuts_of_separator("gomory"), 0);
}

/// A knapsack with a cardinality side constraint whose best-first dive
/// wanders through a strictly suboptimal region.
///
/// max 10a + 6b + 5c + 4d + 0.9e
/// s.t. 5a + 4b + 3c + 2d + 3e <= 6,  a + b + c + d + e >= 2, binary.
/// The optimum is 10 = b + d.
fn knapsack_engine() -> Engine {
    let mut engine = Engine::new().unwrap();
    engine.create_prob("knapsack").unwrap();
    engine.set_obj_sense(ObjSense::Maximize);
    let a = engine.add_var("a", VarKind::Binary, 10.0, 0.0, 1.0).unwrap();
    let b = engine.add_var("b", VarKind::Binary, 6.0, 0.0, 1.0).unwrap();
    let c = engine.add_var("c", VarKind::Binary, 5.0, 0.0, 1.0).unwrap();
    let d = engine.add_var("d", VarKind::Binary, 4.0, 0.0, 1.0).unwrap();
    let e = engine.add_var("e", VarKind::Binary, 0.9, 0.0, 1.0).unwrap();
    engine
        .add_linear_cons(
            "weight",
            &[(a, 5.0), (b, 4.0), (c, 3.0), (d, 2.0), (e, 3.0)],
            f64::NEG_INFINITY,
            6.0,
        )
        .unwrap();
    engine
        .add_linear_cons(
            "cardinality",
            &[(a, 1.0), (b, 1.0), (c, 1.0), (d, 1.0), (e, 1.0)],
            2.0,
            f64::INFINITY,
        )
        .unwrap();
    engine
}

#[test]
fn test_objective_limit_prunes_nodes() {
    let mut unlimited = knapsack_engine();
    let status = unlimited.solve().unwrap();
    assert_eq!(status, SolveStatus::Optimal);
    assert!((unlimited.primal_bound() - 10.0).abs() < 1e-6);
    let nodes_unlimited = unlimited.node_count();

    let mut limited = knapsack_engine();
    // Slightly above the optimum: the optimum survives, strictly worse
    // regions are pruned before exploration.
    limited.set_objective_limit(9.5);
    let status = limited.solve().unwrap();
    assert_eq!(status, SolveStatus::Optimal);
    assert!((limited.primal_bound() - 10.0).abs() < 1e-6);

    assert!(
        limited.node_count() < nodes_unlimited,
        "bounding should save nodes: {} vs {}",
        limited.node_count(),
        nodes_unlimited
    );
}

#[test]
fn test_maximization_reports_external_bounds() {
    let mut engine = knapsack_engine();
    engine.solve().unwrap();

    // Primal and dual bound agree at the proven optimum, in the
    // original (maximization) sense.
    assert!((engine.primal_bound() - 10.0).abs() < 1e-6);
    assert!((engine.dual_bound() - 10.0).abs() < 1e-6);
}

#[test]
fn test_node_limit_interrupts() {
    let mut engine = knapsack_engine();
    engine.params.set_longint("limits/nodes", 1).unwrap();

    let status = engine.solve().unwrap();
    assert_eq!(status, SolveStatus::NodeLimit);
    assert!(engine.node_count() <= 2);
}
