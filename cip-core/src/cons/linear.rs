//! Linear constraint handler: `lhs <= a^T x <= rhs`.
//!
//! The reference `needs-constraint` handler: feasibility check, LP row
//! contribution, activity-based domain propagation, rounding locks and a
//! few presolve reductions.

use crate::engine::{Engine, Tighten};
use crate::error::{CipError, CipResult};
use crate::lp::RowId;
use crate::sol::Solution;
use crate::var::VarId;

use super::constraint::{ConsData, ConsId};
use super::handler::{
    CheckResult, ConsHandler, EnforceResult, PresolResult, PresolStats, PropResult, SepaResult,
};

/// Feasibility tolerance for activity comparisons.
const CHECK_TOL: f64 = 1e-6;

/// Payload of a linear constraint.
#[derive(Debug, Clone)]
pub struct LinearConsData {
    /// Variables with nonzero coefficients.
    pub vars: Vec<VarId>,

    /// Matching coefficients.
    pub coefs: Vec<f64>,

    /// Left hand side (`-inf` for one-sided constraints).
    pub lhs: f64,

    /// Right hand side (`+inf` for one-sided constraints).
    pub rhs: f64,

    /// LP row of this constraint, once created.
    pub row: Option<RowId>,
}

impl LinearConsData {
    /// Create a payload. Coefficient and variable lists must match.
    pub fn new(vars: Vec<VarId>, coefs: Vec<f64>, lhs: f64, rhs: f64) -> CipResult<Self> {
        if vars.len() != coefs.len() {
            return Err(CipError::InvalidData(
                "linear constraint with mismatched lengths".into(),
            ));
        }
        if lhs > rhs {
            return Err(CipError::InvalidData(format!(
                "linear constraint with crossed sides [{lhs}, {rhs}]"
            )));
        }
        Ok(LinearConsData {
            vars,
            coefs,
            lhs,
            rhs,
            row: None,
        })
    }

    fn activity(&self, engine: &Engine, sol: &Solution) -> f64 {
        self.vars
            .iter()
            .zip(&self.coefs)
            .map(|(&v, &a)| a * sol.value(&engine.prob, v))
            .sum()
    }

    fn lp_activity(&self, engine: &Engine) -> f64 {
        self.vars
            .iter()
            .zip(&self.coefs)
            .map(|(&v, &a)| a * engine.lp_sol_value(v))
            .sum()
    }

    /// Minimum and maximum activity over the given bound accessor, with
    /// infinite-contribution counters.
    fn activity_bounds(
        &self,
        bound: impl Fn(VarId) -> (f64, f64),
    ) -> ActivityBounds {
        let mut b = ActivityBounds::default();
        for (&v, &a) in self.vars.iter().zip(&self.coefs) {
            let (lb, ub) = bound(v);
            let (toward_min, toward_max) = if a > 0.0 { (lb, ub) } else { (ub, lb) };
            if toward_min.is_finite() {
                b.min_finite += a * toward_min;
            } else {
                b.n_min_inf += 1;
            }
            if toward_max.is_finite() {
                b.max_finite += a * toward_max;
            } else {
                b.n_max_inf += 1;
            }
        }
        b
    }
}

/// Finite activity parts plus counts of infinite contributions.
#[derive(Debug, Default, Clone, Copy)]
struct ActivityBounds {
    min_finite: f64,
    n_min_inf: usize,
    max_finite: f64,
    n_max_inf: usize,
}

impl ActivityBounds {
    fn min(&self) -> f64 {
        if self.n_min_inf > 0 {
            f64::NEG_INFINITY
        } else {
            self.min_finite
        }
    }

    fn max(&self) -> f64 {
        if self.n_max_inf > 0 {
            f64::INFINITY
        } else {
            self.max_finite
        }
    }
}

/// The linear constraint handler.
#[derive(Debug, Default)]
pub struct LinearConsHandler;

impl LinearConsHandler {
    /// Handler name used at registration and on constraints.
    pub const NAME: &'static str = "linear";

    fn data<'a>(engine: &'a Engine, cons: ConsId) -> CipResult<&'a LinearConsData> {
        engine.cons_data::<LinearConsData>(cons)
    }

    /// Add the constraint's row to the LP if missing; true if added.
    fn ensure_row(engine: &mut Engine, cons: ConsId) -> CipResult<bool> {
        let data = Self::data(engine, cons)?;
        if let Some(row) = data.row {
            if engine.lp.has_row(row) {
                return Ok(false);
            }
        }
        let entries: Vec<(VarId, f64)> = data
            .vars
            .iter()
            .copied()
            .zip(data.coefs.iter().copied())
            .collect();
        let (lhs, rhs) = (data.lhs, data.rhs);
        let local = engine.conss.get(cons).flags.local;
        let name = engine.conss.get(cons).name.clone();
        let row = engine.add_lp_row(&name, &entries, lhs, rhs, local)?;
        engine.cons_data_mut::<LinearConsData>(cons)?.row = Some(row);
        Ok(true)
    }

    /// Propagate one constraint; returns the strongest result achieved.
    fn propagate_cons(&self, engine: &mut Engine, cons: ConsId) -> CipResult<PropResult> {
        let data = Self::data(engine, cons)?.clone();
        let bounds = data.activity_bounds(|v| {
            let var = engine.prob.var(v);
            (var.lb(), var.ub())
        });

        if bounds.min() > data.rhs + CHECK_TOL || bounds.max() < data.lhs - CHECK_TOL {
            return Ok(PropResult::Cutoff);
        }

        let mut reduced = false;
        for (&v, &a) in data.vars.iter().zip(&data.coefs) {
            let var = engine.prob.var(v);
            let (lb, ub) = (var.lb(), var.ub());

            // Residual minimum activity without v, only meaningful when
            // the infinities allow it.
            let toward_min = if a > 0.0 { lb } else { ub };
            let resid_min = match (bounds.n_min_inf, toward_min.is_finite()) {
                (0, true) => Some(bounds.min_finite - a * toward_min),
                (1, false) => Some(bounds.min_finite),
                _ => None,
            };
            let toward_max = if a > 0.0 { ub } else { lb };
            let resid_max = match (bounds.n_max_inf, toward_max.is_finite()) {
                (0, true) => Some(bounds.max_finite - a * toward_max),
                (1, false) => Some(bounds.max_finite),
                _ => None,
            };

            // rhs side bounds the direction that increases activity.
            if data.rhs.is_finite() {
                if let Some(resid) = resid_min {
                    let limit = (data.rhs - resid) / a;
                    let outcome = if a > 0.0 {
                        engine.tighten_local_ub(v, limit)?
                    } else {
                        engine.tighten_local_lb(v, limit)?
                    };
                    match outcome {
                        Tighten::Infeasible => return Ok(PropResult::Cutoff),
                        Tighten::Tightened => reduced = true,
                        Tighten::Unchanged => {}
                    }
                }
            }
            // lhs side bounds the direction that decreases activity.
            if data.lhs.is_finite() {
                if let Some(resid) = resid_max {
                    let limit = (data.lhs - resid) / a;
                    let outcome = if a > 0.0 {
                        engine.tighten_local_lb(v, limit)?
                    } else {
                        engine.tighten_local_ub(v, limit)?
                    };
                    match outcome {
                        Tighten::Infeasible => return Ok(PropResult::Cutoff),
                        Tighten::Tightened => reduced = true,
                        Tighten::Unchanged => {}
                    }
                }
            }
        }

        Ok(if reduced {
            PropResult::ReducedDom
        } else {
            PropResult::DidNotFind
        })
    }
}

impl ConsHandler for LinearConsHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "linear constraints lhs <= a^T x <= rhs"
    }

    fn sepa_priority(&self) -> i32 {
        100
    }

    fn enfo_priority(&self) -> i32 {
        -1_000_000
    }

    fn check_priority(&self) -> i32 {
        -1_000_000
    }

    fn prop_freq(&self) -> i32 {
        1
    }

    fn transform(&self, engine: &Engine, data: &dyn ConsData) -> CipResult<Box<dyn ConsData>> {
        let data = data
            .as_any()
            .downcast_ref::<LinearConsData>()
            .ok_or_else(|| CipError::InvalidData("foreign payload in linear handler".into()))?;
        let mut vars = Vec::with_capacity(data.vars.len());
        for &v in &data.vars {
            let t = engine.prob.var(v).transformed.ok_or_else(|| {
                CipError::InvalidData(format!("variable {v} has no transformed counterpart"))
            })?;
            vars.push(t);
        }
        let boxed: Box<dyn ConsData> = Box::new(LinearConsData {
            vars,
            coefs: data.coefs.clone(),
            lhs: data.lhs,
            rhs: data.rhs,
            row: None,
        });
        eprintln!("DEBUG transform produced tid={:?}", boxed.as_any().type_id());
        Ok(boxed)
    }

    fn init_lp(&mut self, engine: &mut Engine, conss: &[ConsId]) -> CipResult<()> {
        for &cons in conss {
            if engine.conss.get(cons).flags.separate {
                Self::ensure_row(engine, cons)?;
            }
        }
        Ok(())
    }

    fn separate_lp(&mut self, engine: &mut Engine, conss: &[ConsId]) -> CipResult<SepaResult> {
        let mut added = false;
        for &cons in conss {
            let data = Self::data(engine, cons)?;
            let act = data.lp_activity(engine);
            if act > data.rhs + CHECK_TOL || act < data.lhs - CHECK_TOL {
                added |= Self::ensure_row(engine, cons)?;
            }
        }
        Ok(if added {
            SepaResult::Separated
        } else {
            SepaResult::DidNotFind
        })
    }

    fn enforce_lp(&mut self, engine: &mut Engine, conss: &[ConsId]) -> CipResult<EnforceResult> {
        for &cons in conss {
            let data = Self::data(engine, cons)?;
            let act = data.lp_activity(engine);
            if act > data.rhs + CHECK_TOL || act < data.lhs - CHECK_TOL {
                // A violated constraint whose row is missing from the LP
                // is resolved by separating it.
                if Self::ensure_row(engine, cons)? {
                    return Ok(EnforceResult::Separated);
                }
                return Ok(EnforceResult::Infeasible);
            }
        }
        Ok(EnforceResult::Feasible)
    }

    fn enforce_pseudo(
        &mut self,
        engine: &mut Engine,
        conss: &[ConsId],
    ) -> CipResult<EnforceResult> {
        for &cons in conss {
            let data = Self::data(engine, cons)?;
            let act: f64 = data
                .vars
                .iter()
                .zip(&data.coefs)
                .map(|(&v, &a)| a * engine.prob.pseudo_value(v))
                .sum();
            if act > data.rhs + CHECK_TOL || act < data.lhs - CHECK_TOL {
                return Ok(EnforceResult::Infeasible);
            }
        }
        Ok(EnforceResult::Feasible)
    }

    fn check(
        &self,
        engine: &Engine,
        conss: &[ConsId],
        sol: &Solution,
        _check_integrality: bool,
        check_lp_rows: bool,
    ) -> CipResult<CheckResult> {
        for &cons in conss {
            if !engine.conss.get(cons).flags.check {
                continue;
            }
            let data = Self::data(engine, cons)?;
            if !check_lp_rows {
                if let Some(row) = data.row {
                    if engine.lp.has_row(row) {
                        continue;
                    }
                }
            }
            let act = data.activity(engine, sol);
            if act > data.rhs + CHECK_TOL || act < data.lhs - CHECK_TOL {
                return Ok(CheckResult::Infeasible);
            }
        }
        Ok(CheckResult::Feasible)
    }

    fn propagate(&mut self, engine: &mut Engine, conss: &[ConsId]) -> CipResult<PropResult> {
        let mut result = PropResult::DidNotFind;
        for &cons in conss {
            if !engine.conss.get(cons).flags.propagate {
                continue;
            }
            match self.propagate_cons(engine, cons)? {
                PropResult::Cutoff => return Ok(PropResult::Cutoff),
                PropResult::ReducedDom => result = PropResult::ReducedDom,
                _ => {}
            }
        }
        Ok(result)
    }

    fn presolve(
        &mut self,
        engine: &mut Engine,
        conss: &[ConsId],
        stats: &mut PresolStats,
    ) -> CipResult<PresolResult> {
        let before = stats.total();
        for &cons in conss {
            let data = Self::data(engine, cons)?.clone();

            // Empty constraint: feasibility is decided by its sides.
            if data.vars.is_empty() {
                if data.lhs > CHECK_TOL || data.rhs < -CHECK_TOL {
                    return Ok(PresolResult::Cutoff);
                }
                self.lock(engine, cons, -1)?;
                engine.delete_cons(cons)?;
                stats.ndelconss += 1;
                continue;
            }

            // Singleton: translate the sides into variable bounds.
            if data.vars.len() == 1 {
                let v = data.vars[0];
                let a = data.coefs[0];
                let (mut lb, mut ub) = (data.lhs / a, data.rhs / a);
                if a < 0.0 {
                    std::mem::swap(&mut lb, &mut ub);
                }
                let var = engine.prob.var(v);
                if lb > var.global.ub + CHECK_TOL || ub < var.global.lb - CHECK_TOL {
                    return Ok(PresolResult::Cutoff);
                }
                if lb > var.global.lb + CHECK_TOL {
                    engine.prob.set_global_lb(v, lb)?;
                    stats.nchgbds += 1;
                }
                let var = engine.prob.var(v);
                if ub < var.global.ub - CHECK_TOL {
                    engine.prob.set_global_ub(v, ub)?;
                    stats.nchgbds += 1;
                }
                self.lock(engine, cons, -1)?;
                engine.delete_cons(cons)?;
                stats.ndelconss += 1;
            }
        }
        Ok(if stats.total() > before {
            PresolResult::Success
        } else {
            PresolResult::DidNotFind
        })
    }

    fn lock(&self, engine: &mut Engine, cons: ConsId, amount: i32) -> CipResult<()> {
        let data = Self::data(engine, cons)?.clone();
        for (&v, &a) in data.vars.iter().zip(&data.coefs) {
            let mut down = 0;
            let mut up = 0;
            // Decreasing activity can violate the lhs, increasing the rhs.
            if a > 0.0 {
                if data.lhs.is_finite() {
                    down += amount;
                }
                if data.rhs.is_finite() {
                    up += amount;
                }
            } else {
                if data.lhs.is_finite() {
                    up += amount;
                }
                if data.rhs.is_finite() {
                    down += amount;
                }
            }
            engine.prob.var_mut(v).add_locks(down, up);
        }
        Ok(())
    }

    fn print(&self, engine: &Engine, cons: ConsId) -> String {
        match Self::data(engine, cons) {
            Ok(data) => {
                let terms: Vec<String> = data
                    .vars
                    .iter()
                    .zip(&data.coefs)
                    .map(|(v, a)| format!("{a:+} {}", engine.prob.var(*v).name))
                    .collect();
                format!("{} <= {} <= {}", data.lhs, terms.join(" "), data.rhs)
            }
            Err(_) => "<corrupt linear constraint>".into(),
        }
    }

    fn clone_handler(&self) -> Option<Box<dyn ConsHandler>> {
        Some(Box::new(LinearConsHandler))
    }
}
