//! Bundled dense simplex backend.
//!
//! A Big-M full-tableau simplex over the standard form obtained by
//! shifting bounded columns, mirroring upper-bounded ones and splitting
//! free ones. Intended as the reference [`LpSolver`]; production setups
//! plug an external solver behind the same trait.

use nalgebra::DMatrix;

use crate::error::{CipError, CipResult};

use super::solver::{LpSolver, LpView, SolveOutcome};

const PIVOT_TOL: f64 = 1e-9;
const COST_TOL: f64 = 1e-7;
const FEAS_TOL: f64 = 1e-7;

/// How an original column maps into standard-form variables.
#[derive(Debug, Clone, Copy)]
enum ColMap {
    /// `x = offset + s`.
    Shift { s: usize, offset: f64 },

    /// `x = offset - s`.
    Mirror { s: usize, offset: f64 },

    /// `x = s_pos - s_neg`.
    Split { pos: usize, neg: usize },
}

/// Standard form `A s = b, s >= 0` with bookkeeping to map back.
struct StdForm {
    nstruct: usize,
    cost: Vec<f64>,
    rows: Vec<Vec<(usize, f64)>>,
    b: Vec<f64>,
    col_map: Vec<ColMap>,
    /// Per standard row: originating LP row and the sign applied.
    row_map: Vec<Option<(usize, f64)>>,
}

impl StdForm {
    fn build(lp: &LpView<'_>) -> Self {
        let mut nstruct = 0usize;
        let mut cost = Vec::new();
        let mut col_map = Vec::with_capacity(lp.cols.len());
        let mut bound_rows: Vec<(usize, f64)> = Vec::new();

        for col in lp.cols {
            if col.lb.is_finite() {
                let s = nstruct;
                nstruct += 1;
                cost.push(col.obj);
                col_map.push(ColMap::Shift { s, offset: col.lb });
                if col.ub.is_finite() && col.ub > col.lb + PIVOT_TOL {
                    bound_rows.push((s, col.ub - col.lb));
                } else if col.ub.is_finite() {
                    // Fixed column: s <= 0.
                    bound_rows.push((s, (col.ub - col.lb).max(0.0)));
                }
            } else if col.ub.is_finite() {
                let s = nstruct;
                nstruct += 1;
                cost.push(-col.obj);
                col_map.push(ColMap::Mirror { s, offset: col.ub });
            } else {
                let pos = nstruct;
                let neg = nstruct + 1;
                nstruct += 2;
                cost.push(col.obj);
                cost.push(-col.obj);
                col_map.push(ColMap::Split { pos, neg });
            }
        }

        let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
        let mut b = Vec::new();
        let mut row_map: Vec<Option<(usize, f64)>> = Vec::new();

        // Substitute the column maps into each row, splitting ranged
        // rows into two one-sided ones.
        for (ri, row) in lp.rows.iter().enumerate() {
            let mut expr: Vec<(usize, f64)> = Vec::new();
            let mut constant = 0.0;
            for (ci, &a) in row.entries.iter() {
                match col_map[ci] {
                    ColMap::Shift { s, offset } => {
                        expr.push((s, a));
                        constant += a * offset;
                    }
                    ColMap::Mirror { s, offset } => {
                        expr.push((s, -a));
                        constant += a * offset;
                    }
                    ColMap::Split { pos, neg } => {
                        expr.push((pos, a));
                        expr.push((neg, -a));
                    }
                }
            }

            let eq = row.lhs.is_finite()
                && row.rhs.is_finite()
                && (row.rhs - row.lhs).abs() <= PIVOT_TOL;
            if eq {
                rows.push(expr);
                b.push(row.rhs - constant);
                row_map.push(Some((ri, 1.0)));
                continue;
            }
            if row.rhs.is_finite() {
                // a s + slack = rhs'.
                let slack = nstruct;
                nstruct += 1;
                cost.push(0.0);
                let mut e = expr.clone();
                e.push((slack, 1.0));
                rows.push(e);
                b.push(row.rhs - constant);
                row_map.push(Some((ri, 1.0)));
            }
            if row.lhs.is_finite() {
                // -a s + slack = -lhs'.
                let slack = nstruct;
                nstruct += 1;
                cost.push(0.0);
                let mut e: Vec<(usize, f64)> = expr.iter().map(|&(j, a)| (j, -a)).collect();
                e.push((slack, 1.0));
                rows.push(e);
                b.push(constant - row.lhs);
                row_map.push(Some((ri, -1.0)));
            }
        }

        // Column capacity rows: s + slack = cap.
        for (s, cap) in bound_rows {
            let slack = nstruct;
            nstruct += 1;
            cost.push(0.0);
            rows.push(vec![(s, 1.0), (slack, 1.0)]);
            b.push(cap);
            row_map.push(None);
        }

        // Normalize to b >= 0.
        for i in 0..rows.len() {
            if b[i] < 0.0 {
                b[i] = -b[i];
                for entry in &mut rows[i] {
                    entry.1 = -entry.1;
                }
                if let Some((_, sign)) = &mut row_map[i] {
                    *sign = -*sign;
                }
            }
        }

        StdForm {
            nstruct,
            cost,
            rows,
            b,
            col_map,
            row_map,
        }
    }

    /// Recover original column values from standard values.
    fn recover(&self, s: &[f64]) -> Vec<f64> {
        self.col_map
            .iter()
            .map(|m| match *m {
                ColMap::Shift { s: j, offset } => offset + s[j],
                ColMap::Mirror { s: j, offset } => offset - s[j],
                ColMap::Split { pos, neg } => s[pos] - s[neg],
            })
            .collect()
    }
}

/// Dense Big-M simplex solver.
#[derive(Debug, Clone)]
pub struct SimplexSolver {
    /// Iteration limit per solve.
    pub max_iters: usize,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        SimplexSolver { max_iters: 10_000 }
    }
}

impl LpSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn solve(&mut self, lp: &LpView<'_>, _warm_basis: Option<&[usize]>) -> CipResult<SolveOutcome> {
        let std = StdForm::build(lp);
        let m = std.rows.len();
        let n = std.nstruct;
        let ncols = n + m; // artificials appended

        let max_cost = std.cost.iter().fold(0.0f64, |acc, c| acc.max(c.abs()));
        let big_m = 1e7 * (1.0 + max_cost);

        // Full tableau with the right-hand side as the last column.
        let mut tab = DMatrix::<f64>::zeros(m, ncols + 1);
        for (i, row) in std.rows.iter().enumerate() {
            for &(j, a) in row {
                tab[(i, j)] += a;
            }
            tab[(i, n + i)] = 1.0;
            tab[(i, ncols)] = std.b[i];
        }

        let mut cost = vec![0.0; ncols];
        cost[..n].copy_from_slice(&std.cost);
        for item in cost.iter_mut().take(ncols).skip(n) {
            *item = big_m;
        }

        // Reduced costs with the all-artificial basis.
        let mut red = vec![0.0; ncols];
        for (j, rj) in red.iter_mut().enumerate() {
            let mut z = 0.0;
            for i in 0..m {
                z += big_m * tab[(i, j)];
            }
            *rj = cost[j] - z;
        }

        let mut basis: Vec<usize> = (n..ncols).collect();
        let mut iters = 0usize;

        loop {
            // Bland's rule: smallest improving index.
            let entering = (0..ncols).find(|&j| red[j] < -COST_TOL);
            let entering = match entering {
                Some(j) => j,
                None => break,
            };

            // Ratio test, ties broken by smallest basis index.
            let mut leave: Option<usize> = None;
            let mut best = f64::INFINITY;
            for i in 0..m {
                let a = tab[(i, entering)];
                if a > PIVOT_TOL {
                    let ratio = tab[(i, ncols)] / a;
                    let better = ratio < best - PIVOT_TOL
                        || (ratio < best + PIVOT_TOL
                            && leave.map_or(true, |l| basis[i] < basis[l]));
                    if better {
                        best = ratio;
                        leave = Some(i);
                    }
                }
            }

            let leave = match leave {
                Some(i) => i,
                None => {
                    // Unbounded direction in standard space.
                    let mut dir = vec![0.0; ncols];
                    dir[entering] = 1.0;
                    for i in 0..m {
                        dir[basis[i]] = -tab[(i, entering)];
                    }
                    let svals: Vec<f64> = (0..n)
                        .map(|j| basis.iter().position(|&bj| bj == j).map_or(0.0, |i| tab[(i, ncols)]))
                        .collect();
                    return Ok(SolveOutcome::Unbounded {
                        primal: std.recover(&svals),
                        ray: std.recover(&dir[..n].to_vec()),
                    });
                }
            };

            // Pivot on (leave, entering).
            let pivot = tab[(leave, entering)];
            for j in 0..=ncols {
                tab[(leave, j)] /= pivot;
            }
            for i in 0..m {
                if i != leave {
                    let factor = tab[(i, entering)];
                    if factor.abs() > PIVOT_TOL {
                        for j in 0..=ncols {
                            tab[(i, j)] -= factor * tab[(leave, j)];
                        }
                    }
                }
            }
            let rfactor = red[entering];
            for (j, rj) in red.iter_mut().enumerate() {
                *rj -= rfactor * tab[(leave, j)];
            }
            basis[leave] = entering;

            iters += 1;
            if iters >= self.max_iters {
                return Ok(SolveOutcome::IterLimit);
            }
        }

        // Optimal tableau; artificials still in the solution certify
        // infeasibility.
        let mut svals = vec![0.0; ncols];
        for i in 0..m {
            svals[basis[i]] = tab[(i, ncols)];
        }
        let infeasibility: f64 = svals[n..].iter().sum();

        // Duals from artificial reduced costs: red(art_i) = M - y_i.
        let mut duals = vec![0.0; lp.rows.len()];
        for i in 0..m {
            let y = big_m - red[n + i];
            if let Some((orig, sign)) = std.row_map[i] {
                duals[orig] += sign * y;
            }
        }

        if infeasibility > FEAS_TOL {
            let norm = duals.iter().fold(0.0f64, |acc, y| acc.max(y.abs()));
            let farkas = if norm > PIVOT_TOL {
                duals.iter().map(|y| y / norm).collect()
            } else {
                duals.clone()
            };
            return Ok(SolveOutcome::Infeasible { farkas });
        }

        let primal = std.recover(&svals[..n].to_vec());
        let objval: f64 = lp
            .cols
            .iter()
            .zip(&primal)
            .map(|(c, x)| c.obj * x)
            .sum();

        let redcosts = std
            .col_map
            .iter()
            .map(|mmap| match *mmap {
                ColMap::Shift { s, .. } => red[s],
                ColMap::Mirror { s, .. } => -red[s],
                ColMap::Split { pos, .. } => red[pos],
            })
            .collect();

        Ok(SolveOutcome::Optimal {
            primal,
            duals,
            redcosts,
            objval,
            basis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{Col, Row};
    use crate::var::VarId;
    use sprs::CsVec;

    fn col(var: usize, obj: f64, lb: f64, ub: f64) -> Col {
        Col {
            var: VarId(var),
            obj,
            lb,
            ub,
        }
    }

    fn row(entries: &[(usize, f64)], lhs: f64, rhs: f64) -> Row {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|e| e.0);
        let dim = sorted.last().map_or(0, |e| e.0 + 1);
        Row {
            id: super::super::RowId(0),
            name: "r".into(),
            entries: CsVec::new(
                dim,
                sorted.iter().map(|e| e.0).collect(),
                sorted.iter().map(|e| e.1).collect(),
            ),
            lhs,
            rhs,
            local: false,
            depth: 0,
            is_cut: false,
        }
    }

    fn solve(cols: Vec<Col>, rows: Vec<Row>) -> SolveOutcome {
        let mut solver = SimplexSolver::default();
        solver
            .solve(
                &LpView {
                    cols: &cols,
                    rows: &rows,
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_simple_optimum() {
        // min x + y, x + y >= 1, 0 <= x,y <= 1.
        let outcome = solve(
            vec![col(0, 1.0, 0.0, 1.0), col(1, 1.0, 0.0, 1.0)],
            vec![row(&[(0, 1.0), (1, 1.0)], 1.0, f64::INFINITY)],
        );
        match outcome {
            SolveOutcome::Optimal { primal, objval, .. } => {
                assert!((objval - 1.0).abs() < 1e-6);
                assert!((primal[0] + primal[1] - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_equality_and_negative_cost() {
        // min -x - 2y, x + y = 1, x,y >= 0: optimum y = 1.
        let outcome = solve(
            vec![
                col(0, -1.0, 0.0, f64::INFINITY),
                col(1, -2.0, 0.0, f64::INFINITY),
            ],
            vec![row(&[(0, 1.0), (1, 1.0)], 1.0, 1.0)],
        );
        match outcome {
            SolveOutcome::Optimal { primal, objval, .. } => {
                assert!((objval + 2.0).abs() < 1e-6);
                assert!((primal[1] - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_unbounded_ray() {
        // min -x, x >= 0 free above, no rows.
        let outcome = solve(vec![col(0, -1.0, 0.0, f64::INFINITY)], vec![]);
        match outcome {
            SolveOutcome::Unbounded { ray, .. } => {
                assert!(ray[0] > 0.5);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_infeasible_farkas() {
        // x >= 1 and x <= 0 with 0 <= x <= 1.
        let outcome = solve(
            vec![col(0, 0.0, 0.0, 1.0)],
            vec![
                row(&[(0, 1.0)], 1.0, f64::INFINITY),
                row(&[(0, 1.0)], f64::NEG_INFINITY, 0.0),
            ],
        );
        match outcome {
            SolveOutcome::Infeasible { farkas } => {
                assert_eq!(farkas.len(), 2);
                assert!(farkas.iter().any(|y| y.abs() > 1e-9));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_ranged_row() {
        // min x, 2 <= x + y <= 4, 0 <= x,y <= 3: optimum x = 0.
        let outcome = solve(
            vec![col(0, 1.0, 0.0, 3.0), col(1, 0.0, 0.0, 3.0)],
            vec![row(&[(0, 1.0), (1, 1.0)], 2.0, 4.0)],
        );
        match outcome {
            SolveOutcome::Optimal { primal, objval, .. } => {
                assert!(objval.abs() < 1e-6);
                assert!(primal[1] >= 2.0 - 1e-6);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_mirrored_column() {
        // min -x with x <= 5, unbounded below: optimum x = 5.
        let outcome = solve(vec![col(0, -1.0, f64::NEG_INFINITY, 5.0)], vec![]);
        match outcome {
            SolveOutcome::Optimal { primal, objval, .. } => {
                assert!((primal[0] - 5.0).abs() < 1e-6);
                assert!((objval + 5.0).abs() < 1e-6);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
