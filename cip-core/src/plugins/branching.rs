//! Branching rule plugins.

use crate::engine::Engine;
use crate::error::CipResult;
use crate::var::{VarId, Variable};

/// Result of a branching execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchResult {
    /// Child nodes were created.
    Branched,

    /// The node was detected infeasible.
    Cutoff,

    /// A domain was reduced instead of branching.
    ReducedDom,

    /// The rule did not apply.
    DidNotRun,
}

/// A branching rule: resolves a fractional LP solution into children.
pub trait BranchRule {
    /// Unique rule name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Rules are tried in decreasing priority.
    fn priority(&self) -> i32 {
        0
    }

    /// Branch on the current LP solution.
    fn execute_lp(&mut self, _engine: &mut Engine) -> CipResult<BranchResult> {
        Ok(BranchResult::DidNotRun)
    }

    /// Branch on the pseudo solution (no usable LP).
    fn execute_pseudo(&mut self, _engine: &mut Engine) -> CipResult<BranchResult> {
        Ok(BranchResult::DidNotRun)
    }

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn BranchRule>> {
        None
    }
}

/// Most-fractional branching, the universal fallback.
///
/// Picks the candidate whose LP value is closest to one half, breaking
/// ties by branching priority and then by variable index, and creates
/// the canonical two children `x <= floor(x*)`, `x >= ceil(x*)`.
#[derive(Debug, Default)]
pub struct MostInfeasBranching;

impl MostInfeasBranching {
    /// Rule name.
    pub const NAME: &'static str = "mostinfeas";

    /// Pick the most fractional candidate from `(var, value)` pairs.
    pub fn pick(engine: &Engine, candidates: &[(VarId, f64)]) -> Option<(VarId, f64)> {
        candidates
            .iter()
            .copied()
            .max_by(|&(v1, x1), &(v2, x2)| {
                let f1 = Variable::fractionality(x1);
                let f2 = Variable::fractionality(x2);
                f1.partial_cmp(&f2)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        let p1 = engine.prob.var(v1).branch_priority;
                        let p2 = engine.prob.var(v2).branch_priority;
                        p1.cmp(&p2)
                    })
                    // max_by keeps the later element on ties; prefer the
                    // smaller index deterministically.
                    .then_with(|| v2.0.cmp(&v1.0))
            })
    }
}

impl BranchRule for MostInfeasBranching {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "most fractional variable branching"
    }

    fn priority(&self) -> i32 {
        -1_000_000
    }

    fn execute_lp(&mut self, engine: &mut Engine) -> CipResult<BranchResult> {
        let candidates = engine.lp_branch_candidates();
        let (var, value) = match Self::pick(engine, &candidates) {
            Some(pick) => pick,
            None => return Ok(BranchResult::DidNotRun),
        };
        engine.branch_on(var, value)?;
        Ok(BranchResult::Branched)
    }

    fn execute_pseudo(&mut self, engine: &mut Engine) -> CipResult<BranchResult> {
        // The pseudo solution sits on bounds, so integer variables are
        // never fractional; branch on the middle of an unfixed domain.
        let candidate = engine.prob.active_vars().into_iter().find(|&v| {
            let var = engine.prob.var(v);
            var.kind.is_integral() && var.ub() - var.lb() > 0.5
        });
        let var = match candidate {
            Some(v) => v,
            None => return Ok(BranchResult::DidNotRun),
        };
        let v = engine.prob.var(var);
        let mid = if v.lb().is_finite() && v.ub().is_finite() {
            (v.lb() + v.ub()) / 2.0
        } else if v.lb().is_finite() {
            v.lb() + 0.5
        } else if v.ub().is_finite() {
            v.ub() - 0.5
        } else {
            0.0
        };
        engine.branch_on(var, mid.floor() + 0.5)?;
        Ok(BranchResult::Branched)
    }

    fn clone_plugin(&self) -> Option<Box<dyn BranchRule>> {
        Some(Box::new(MostInfeasBranching))
    }
}
