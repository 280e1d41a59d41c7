//! The LP solver contract consumed by the relaxation layer.

use crate::error::CipResult;

use super::{Col, Row};

/// A read-only view of the LP handed to the solver.
pub struct LpView<'a> {
    /// Columns with objective and current bounds.
    pub cols: &'a [Col],

    /// Rows with sparse coefficients and sides.
    pub rows: &'a [Row],
}

/// Outcome of a solve step.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// Optimal with a dual-feasible basis.
    Optimal {
        /// Primal values per column.
        primal: Vec<f64>,
        /// Dual values per row.
        duals: Vec<f64>,
        /// Reduced costs per column.
        redcosts: Vec<f64>,
        /// Objective value.
        objval: f64,
        /// Basic-variable snapshot in solver-internal indexing.
        basis: Vec<usize>,
    },

    /// Primal infeasible with a Farkas proof.
    Infeasible {
        /// Dual-ray multipliers per row certifying infeasibility.
        farkas: Vec<f64>,
    },

    /// Unbounded with an improving primal ray.
    Unbounded {
        /// A feasible point (best effort).
        primal: Vec<f64>,
        /// Improving ray per column.
        ray: Vec<f64>,
    },

    /// The iteration limit was hit before convergence.
    IterLimit,
}

/// Abstract LP solver: the engine owns the relaxation, the solver only
/// gets a view and a warm-start hint.
pub trait LpSolver {
    /// Solve the LP view.
    fn solve(&mut self, lp: &LpView<'_>, warm_basis: Option<&[usize]>) -> CipResult<SolveOutcome>;

    /// Solver name for diagnostics.
    fn name(&self) -> &'static str;
}
