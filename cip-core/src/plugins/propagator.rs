//! Domain propagator plugins.

use crate::cons::PropResult;
use crate::engine::{Engine, Tighten};
use crate::error::CipResult;
use crate::var::VarId;

/// A dedicated propagator (independent of constraint handlers).
pub trait Propagator {
    /// Unique propagator name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Propagators run in decreasing priority within a round.
    fn priority(&self) -> i32 {
        0
    }

    /// Calling frequency in tree depths; `-1` disables, `0` restricts to
    /// the root.
    fn freq(&self) -> i32 {
        1
    }

    /// Execute one propagation pass.
    fn execute(&mut self, engine: &mut Engine) -> CipResult<PropResult>;

    /// Explain a bound deduction for conflict analysis.
    fn resolve_propagation(&mut self, _engine: &mut Engine, _var: VarId) -> CipResult<()> {
        Ok(())
    }

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Propagator>> {
        None
    }
}

/// Pseudo-objective propagator.
///
/// The pseudo objective value (every variable at its objective-preferred
/// bound) is a lower bound on any solution in the subtree. Against a
/// finite cutoff bound it prunes the node and tightens the bounds of
/// objective-carrying variables.
#[derive(Debug, Default)]
pub struct PseudoObjProp;

impl PseudoObjProp {
    /// Propagator name.
    pub const NAME: &'static str = "pseudoobj";
}

impl Propagator for PseudoObjProp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "pseudo objective value propagator"
    }

    fn priority(&self) -> i32 {
        100_000
    }

    fn execute(&mut self, engine: &mut Engine) -> CipResult<PropResult> {
        let cutoff = engine.cutoff_bound();
        if !cutoff.is_finite() {
            return Ok(PropResult::DidNotRun);
        }
        let pseudo = engine.prob.pseudo_obj();
        if pseudo >= cutoff - 1e-9 {
            return Ok(PropResult::Cutoff);
        }
        if !pseudo.is_finite() {
            return Ok(PropResult::DidNotFind);
        }

        // Moving a variable away from its preferred bound costs |obj|
        // per unit; the slack to the cutoff caps that distance.
        let slack = cutoff - pseudo;
        let mut reduced = false;
        for v in engine.prob.active_vars() {
            let var = engine.prob.var(v);
            let obj = var.obj;
            if obj > 0.0 && var.lb().is_finite() {
                let limit = var.lb() + slack / obj;
                match engine.tighten_local_ub(v, limit)? {
                    Tighten::Infeasible => return Ok(PropResult::Cutoff),
                    Tighten::Tightened => reduced = true,
                    Tighten::Unchanged => {}
                }
            } else if obj < 0.0 && var.ub().is_finite() {
                let limit = var.ub() + slack / obj;
                match engine.tighten_local_lb(v, limit)? {
                    Tighten::Infeasible => return Ok(PropResult::Cutoff),
                    Tighten::Tightened => reduced = true,
                    Tighten::Unchanged => {}
                }
            }
        }

        Ok(if reduced {
            PropResult::ReducedDom
        } else {
            PropResult::DidNotFind
        })
    }

    fn clone_plugin(&self) -> Option<Box<dyn Propagator>> {
        Some(Box::new(PseudoObjProp))
    }
}
