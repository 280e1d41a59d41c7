//! Dual fixing presolver: fixes roundable variables to their best bound.

use crate::cons::{PresolResult, PresolStats};
use crate::engine::Engine;
use crate::error::CipResult;

use super::presolver::Presolver;

/// The dual fixing presolver.
///
/// A variable that no constraint blocks from rounding down, with a
/// nonnegative objective, can be fixed to its lower bound without losing
/// any optimal solution (symmetrically for rounding up). An infinite
/// target bound with a nonzero objective proves the problem unbounded.
#[derive(Debug, Default)]
pub struct DualfixPresolver;

impl DualfixPresolver {
    /// Presolver name.
    pub const NAME: &'static str = "dualfix";
}

impl Presolver for DualfixPresolver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "roundable variables dual fixing"
    }

    fn priority(&self) -> i32 {
        1_000_000
    }

    fn execute(
        &mut self,
        engine: &mut Engine,
        stats: &mut PresolStats,
    ) -> CipResult<PresolResult> {
        let mut result = PresolResult::DidNotFind;

        for v in engine.prob.active_vars() {
            let var = engine.prob.var(v);
            let obj = var.obj;

            let bound = if var.may_round_down() && obj >= 0.0 {
                var.lb()
            } else if var.may_round_up() && obj <= 0.0 {
                var.ub()
            } else {
                continue;
            };

            if !bound.is_finite() {
                if obj == 0.0 {
                    // Free of objective and locks on that side: any value
                    // works, prefer something finite.
                    let var = engine.prob.var(v);
                    let target = if var.lb().is_finite() {
                        var.lb()
                    } else if var.ub().is_finite() {
                        var.ub()
                    } else {
                        0.0
                    };
                    let (infeasible, fixed) = engine.prob.fix_var(v, target)?;
                    if infeasible {
                        return Ok(PresolResult::Cutoff);
                    }
                    if fixed {
                        log::debug!("dualfix: fixed objective-free variable to {target}");
                        stats.nfixedvars += 1;
                        result = PresolResult::Success;
                    }
                    continue;
                }
                log::debug!(
                    "dualfix: variable with objective {obj} is unbounded toward its best bound"
                );
                return Ok(PresolResult::Unbounded);
            }

            let (infeasible, fixed) = engine.prob.fix_var(v, bound)?;
            if infeasible {
                return Ok(PresolResult::Cutoff);
            }
            if fixed {
                log::debug!("dualfix: fixed variable with objective {obj} to bound {bound}");
                stats.nfixedvars += 1;
                result = PresolResult::Success;
            }
        }

        Ok(result)
    }

    fn clone_plugin(&self) -> Option<Box<dyn Presolver>> {
        Some(Box::new(DualfixPresolver))
    }
}
