//! LP relaxation interface: columns, rows, basis, dive mode.
//!
//! The engine exclusively owns the relaxation; plugins read it inside
//! callbacks and may modify it only within a dive they started. The
//! numerical solve is delegated to an [`LpSolver`] implementation.

mod simplex;
mod solver;

use std::collections::HashMap;

use sprs::CsVec;

use crate::error::{CipError, CipResult};
use crate::var::VarId;

pub use simplex::SimplexSolver;
pub use solver::{LpSolver, LpView, SolveOutcome};

/// Stable identity of an LP row; survives removals of other rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(pub u64);

/// An LP column backing one active variable.
#[derive(Debug, Clone)]
pub struct Col {
    /// The variable this column represents.
    pub var: VarId,

    /// Objective coefficient.
    pub obj: f64,

    /// Current lower bound.
    pub lb: f64,

    /// Current upper bound.
    pub ub: f64,
}

/// An LP row: sparse coefficients over columns with two sides.
#[derive(Debug, Clone)]
pub struct Row {
    /// Stable row identity.
    pub id: RowId,

    /// Row name.
    pub name: String,

    /// Sparse coefficients indexed by column.
    pub entries: CsVec<f64>,

    /// Left hand side (`-inf` if one-sided).
    pub lhs: f64,

    /// Right hand side (`+inf` if one-sided).
    pub rhs: f64,

    /// Valid only in the subtree of the node that added it.
    pub local: bool,

    /// Tree depth at which the row was added.
    pub depth: usize,

    /// True for separated cuts, false for handler relaxation rows.
    pub is_cut: bool,
}

impl Row {
    /// Activity of the row under dense column values.
    pub fn activity(&self, primal: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(ci, &a)| a * primal.get(ci).copied().unwrap_or(0.0))
            .sum()
    }

    /// Euclidean norm of the coefficient vector.
    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, &a)| a * a)
            .sum::<f64>()
            .sqrt()
    }

    /// Violation of the row at the given values, positive if violated.
    pub fn violation(&self, primal: &[f64]) -> f64 {
        let act = self.activity(primal);
        (self.lhs - act).max(act - self.rhs).max(0.0)
    }
}

/// Solve status of the relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LpStatus {
    /// Not solved since the last modification.
    #[default]
    NotSolved,

    /// Solved to optimality.
    Optimal,

    /// Primal infeasible (Farkas proof available).
    Infeasible,

    /// Unbounded (primal ray available).
    Unbounded,

    /// Iteration limit hit.
    IterLimit,

    /// Time limit hit.
    TimeLimit,

    /// Solver failure.
    Error,
}

/// Everything a dive may touch, snapshotted verbatim.
#[derive(Debug, Clone)]
struct DiveSnapshot {
    col_bounds: Vec<(f64, f64)>,
    nrows: usize,
    status: LpStatus,
    primal: Vec<f64>,
    duals: Vec<f64>,
    redcosts: Vec<f64>,
    objval: f64,
    ray: Option<Vec<f64>>,
    farkas: Option<Vec<f64>>,
    basis: Option<Vec<usize>>,
}

/// The LP relaxation: columns, rows, cached solution, dive substate.
pub struct Lp {
    cols: Vec<Col>,
    col_of_var: HashMap<VarId, usize>,
    rows: Vec<Row>,
    next_row_id: u64,

    status: LpStatus,
    primal: Vec<f64>,
    duals: Vec<f64>,
    redcosts: Vec<f64>,
    objval: f64,
    ray: Option<Vec<f64>>,
    farkas: Option<Vec<f64>>,
    basis: Option<Vec<usize>>,

    solver: Box<dyn LpSolver>,
    dive: Option<DiveSnapshot>,

    /// Number of LP solves performed.
    pub nsolves: u64,
}

impl Lp {
    /// Create an empty LP over the given solver.
    pub fn new(solver: Box<dyn LpSolver>) -> Self {
        Lp {
            cols: Vec::new(),
            col_of_var: HashMap::new(),
            rows: Vec::new(),
            next_row_id: 0,
            status: LpStatus::NotSolved,
            primal: Vec::new(),
            duals: Vec::new(),
            redcosts: Vec::new(),
            objval: 0.0,
            ray: None,
            farkas: None,
            basis: None,
            solver,
            dive: None,
            nsolves: 0,
        }
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    /// The column slice.
    pub fn cols(&self) -> &[Col] {
        &self.cols
    }

    /// The row slice.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The basis snapshot of the last optimal solve.
    pub fn basis(&self) -> Option<&[usize]> {
        self.basis.as_deref()
    }

    /// Add a column for a variable. Rejected while diving.
    pub fn add_col(&mut self, var: VarId, obj: f64, lb: f64, ub: f64) -> CipResult<usize> {
        if self.dive.is_some() {
            return Err(CipError::InvalidData("column addition while diving".into()));
        }
        if self.col_of_var.contains_key(&var) {
            return Err(CipError::InvalidData(format!(
                "variable {var} already has an LP column"
            )));
        }
        let idx = self.cols.len();
        self.col_of_var.insert(var, idx);
        self.cols.push(Col { var, obj, lb, ub });
        self.invalidate();
        Ok(idx)
    }

    /// Column index of a variable.
    pub fn col_index(&self, var: VarId) -> Option<usize> {
        self.col_of_var.get(&var).copied()
    }

    /// Change the bounds of a column.
    pub fn set_col_bounds(&mut self, col: usize, lb: f64, ub: f64) {
        let c = &mut self.cols[col];
        if c.lb != lb || c.ub != ub {
            c.lb = lb;
            c.ub = ub;
            self.invalidate();
        }
    }

    /// Add a row. `entries` are (column, coefficient) pairs.
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        entries: &[(usize, f64)],
        lhs: f64,
        rhs: f64,
        local: bool,
        depth: usize,
        is_cut: bool,
    ) -> CipResult<RowId> {
        let name = name.into();
        let mut sorted: Vec<(usize, f64)> = entries.to_vec();
        sorted.sort_by_key(|e| e.0);
        sorted.dedup_by(|a, b| {
            if a.0 == b.0 {
                b.1 += a.1;
                true
            } else {
                false
            }
        });
        if sorted.iter().any(|&(c, _)| c >= self.cols.len()) {
            return Err(CipError::InvalidData(format!(
                "row {name} references a missing column"
            )));
        }
        let id = RowId(self.next_row_id);
        self.next_row_id += 1;
        self.rows.push(Row {
            id,
            name,
            entries: CsVec::new(
                self.cols.len(),
                sorted.iter().map(|e| e.0).collect(),
                sorted.iter().map(|e| e.1).collect(),
            ),
            lhs,
            rhs,
            local,
            depth,
            is_cut,
        });
        self.invalidate();
        Ok(id)
    }

    /// True if a row with this identity is currently in the LP.
    pub fn has_row(&self, id: RowId) -> bool {
        self.rows.iter().any(|r| r.id == id)
    }

    /// Remove one row by identity; true if it was present.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.id != id);
        if self.rows.len() != before {
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Remove local rows added below the given depth (backtracking).
    pub fn remove_local_rows_above(&mut self, depth: usize) {
        let before = self.rows.len();
        self.rows.retain(|r| !r.local || r.depth <= depth);
        if self.rows.len() != before {
            self.invalidate();
        }
    }

    /// Solve the relaxation, caching the result.
    pub fn solve(&mut self, warm: bool) -> CipResult<LpStatus> {
        let warm_basis = if warm { self.basis.clone() } else { None };
        let view = LpView {
            cols: &self.cols,
            rows: &self.rows,
        };
        self.nsolves += 1;
        let outcome = match self.solver.solve(&view, warm_basis.as_deref()) {
            Ok(o) => o,
            Err(e) => {
                self.status = LpStatus::Error;
                return Err(e);
            }
        };
        self.ray = None;
        self.farkas = None;
        match outcome {
            SolveOutcome::Optimal {
                primal,
                duals,
                redcosts,
                objval,
                basis,
            } => {
                self.primal = primal;
                self.duals = duals;
                self.redcosts = redcosts;
                self.objval = objval;
                self.basis = Some(basis);
                self.status = LpStatus::Optimal;
            }
            SolveOutcome::Infeasible { farkas } => {
                self.farkas = Some(farkas);
                self.objval = f64::INFINITY;
                self.status = LpStatus::Infeasible;
            }
            SolveOutcome::Unbounded { primal, ray } => {
                self.primal = primal;
                self.ray = Some(ray);
                self.objval = f64::NEG_INFINITY;
                self.status = LpStatus::Unbounded;
            }
            SolveOutcome::IterLimit => {
                self.status = LpStatus::IterLimit;
            }
        }
        Ok(self.status)
    }

    /// Current solve status.
    pub fn status(&self) -> LpStatus {
        self.status
    }

    /// Objective value of the last solve.
    pub fn objval(&self) -> f64 {
        self.objval
    }

    /// Primal value of a column.
    pub fn col_primal(&self, col: usize) -> f64 {
        self.primal.get(col).copied().unwrap_or(0.0)
    }

    /// Primal value of a variable's column (0 without a column).
    pub fn var_primal(&self, var: VarId) -> f64 {
        self.col_index(var).map_or(0.0, |c| self.col_primal(c))
    }

    /// Dense primal vector.
    pub fn primal(&self) -> &[f64] {
        &self.primal
    }

    /// Dual value of a row by position.
    pub fn row_dual(&self, row: usize) -> f64 {
        self.duals.get(row).copied().unwrap_or(0.0)
    }

    /// Reduced cost of a column.
    pub fn redcost(&self, col: usize) -> f64 {
        self.redcosts.get(col).copied().unwrap_or(0.0)
    }

    /// Farkas multipliers per row after an infeasible solve.
    pub fn farkas_ray(&self) -> Option<&[f64]> {
        self.farkas.as_deref()
    }

    /// Primal ray per column after an unbounded solve.
    pub fn primal_ray(&self) -> Option<&[f64]> {
        self.ray.as_deref()
    }

    /// Ray component of a variable.
    pub fn var_ray(&self, var: VarId) -> f64 {
        match (&self.ray, self.col_index(var)) {
            (Some(ray), Some(c)) => ray.get(c).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// True while a dive is open.
    pub fn is_diving(&self) -> bool {
        self.dive.is_some()
    }

    /// Open a dive: snapshot column bounds, row set, basis and the
    /// cached solution. Dives may not be nested.
    pub fn start_dive(&mut self) -> CipResult<()> {
        if self.dive.is_some() {
            return Err(CipError::InvalidData("nested dive".into()));
        }
        self.dive = Some(DiveSnapshot {
            col_bounds: self.cols.iter().map(|c| (c.lb, c.ub)).collect(),
            nrows: self.rows.len(),
            status: self.status,
            primal: self.primal.clone(),
            duals: self.duals.clone(),
            redcosts: self.redcosts.clone(),
            objval: self.objval,
            ray: self.ray.clone(),
            farkas: self.farkas.clone(),
            basis: self.basis.clone(),
        });
        Ok(())
    }

    /// Close the dive, restoring the pre-dive LP verbatim.
    pub fn end_dive(&mut self) -> CipResult<()> {
        let snap = self
            .dive
            .take()
            .ok_or_else(|| CipError::InvalidData("end-dive without dive".into()))?;
        for (col, (lb, ub)) in self.cols.iter_mut().zip(snap.col_bounds) {
            col.lb = lb;
            col.ub = ub;
        }
        self.rows.truncate(snap.nrows);
        self.status = snap.status;
        self.primal = snap.primal;
        self.duals = snap.duals;
        self.redcosts = snap.redcosts;
        self.objval = snap.objval;
        self.ray = snap.ray;
        self.farkas = snap.farkas;
        self.basis = snap.basis;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.status = LpStatus::NotSolved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_lp() -> Lp {
        let mut lp = Lp::new(Box::new(SimplexSolver::default()));
        lp.add_col(VarId(0), 1.0, 0.0, 1.0).unwrap();
        lp.add_col(VarId(1), 1.0, 0.0, 1.0).unwrap();
        lp.add_row("cover", &[(0, 1.0), (1, 1.0)], 1.0, f64::INFINITY, false, 0, false)
            .unwrap();
        lp
    }

    #[test]
    fn test_solve_and_accessors() {
        let mut lp = small_lp();
        assert_eq!(lp.status(), LpStatus::NotSolved);

        let status = lp.solve(false).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((lp.objval() - 1.0).abs() < 1e-6);
        let sum = lp.var_primal(VarId(0)) + lp.var_primal(VarId(1));
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(lp.nsolves, 1);
    }

    #[test]
    fn test_bound_change_invalidates() {
        let mut lp = small_lp();
        lp.solve(false).unwrap();
        lp.set_col_bounds(0, 1.0, 1.0);
        assert_eq!(lp.status(), LpStatus::NotSolved);
    }

    #[test]
    fn test_dive_isolation_restores_verbatim() {
        let mut lp = small_lp();
        lp.solve(false).unwrap();

        let bounds_before: Vec<(f64, f64)> = lp.cols().iter().map(|c| (c.lb, c.ub)).collect();
        let nrows_before = lp.nrows();
        let basis_before = lp.basis().map(|b| b.to_vec());
        let obj_before = lp.objval();

        lp.start_dive().unwrap();
        assert!(lp.is_diving());
        assert!(lp.start_dive().is_err());

        lp.set_col_bounds(0, 1.0, 1.0);
        lp.add_row("divecut", &[(1, 1.0)], f64::NEG_INFINITY, 0.0, true, 3, true)
            .unwrap();
        lp.solve(true).unwrap();

        lp.end_dive().unwrap();
        let bounds_after: Vec<(f64, f64)> = lp.cols().iter().map(|c| (c.lb, c.ub)).collect();
        assert_eq!(bounds_before, bounds_after);
        assert_eq!(lp.nrows(), nrows_before);
        assert_eq!(lp.basis().map(|b| b.to_vec()), basis_before);
        assert_eq!(lp.objval(), obj_before);
        assert_eq!(lp.status(), LpStatus::Optimal);

        assert!(lp.end_dive().is_err());
    }

    #[test]
    fn test_local_row_removal() {
        let mut lp = small_lp();
        let deep = lp
            .add_row("local", &[(0, 1.0)], f64::NEG_INFINITY, 0.5, true, 4, true)
            .unwrap();
        let global = lp
            .add_row("global", &[(1, 1.0)], f64::NEG_INFINITY, 0.5, false, 4, true)
            .unwrap();

        lp.remove_local_rows_above(2);
        assert!(!lp.has_row(deep));
        assert!(lp.has_row(global));
    }

    #[test]
    fn test_infeasible_has_farkas() {
        let mut lp = Lp::new(Box::new(SimplexSolver::default()));
        lp.add_col(VarId(0), 0.0, 0.0, 1.0).unwrap();
        lp.add_row("ge", &[(0, 1.0)], 1.0, f64::INFINITY, false, 0, false)
            .unwrap();
        lp.add_row("le", &[(0, 1.0)], f64::NEG_INFINITY, 0.0, false, 0, false)
            .unwrap();

        assert_eq!(lp.solve(false).unwrap(), LpStatus::Infeasible);
        assert!(lp.farkas_ray().is_some());
    }
}
