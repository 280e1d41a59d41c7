//! Rounding-dive heuristic.
//!
//! Dives on the LP: repeatedly takes the least-fractional integer
//! variable, bounds it to its nearest integer inside the dive, and
//! resolves, until the LP solution is integral or the dive dead-ends.

use crate::engine::Engine;
use crate::error::CipResult;
use crate::lp::LpStatus;
use crate::sol::{SolOrigin, Solution};
use crate::var::{VarId, Variable};

use super::heuristic::{Heuristic, HeurResult, HeurTiming};

/// Maximal number of rounding steps per dive.
const MAX_DIVE_DEPTH: usize = 100;

/// The rounding-dive heuristic.
#[derive(Debug, Default)]
pub struct RoundDiveHeur;

impl RoundDiveHeur {
    /// Heuristic name.
    pub const NAME: &'static str = "rounddive";

    /// The least-fractional fractional variable of the LP solution.
    fn least_fractional(engine: &Engine) -> Option<(VarId, f64)> {
        let mut best: Option<(VarId, f64, f64)> = None;
        for v in engine.prob.active_vars() {
            if !engine.prob.var(v).kind.is_integral() {
                continue;
            }
            let value = engine.lp_sol_value(v);
            let frac = Variable::fractionality(value);
            if frac <= 1e-6 {
                continue;
            }
            let replace = match best {
                Some((_, _, bf)) => frac < bf,
                None => true,
            };
            if replace {
                best = Some((v, value, frac));
            }
        }
        best.map(|(v, value, _)| (v, value))
    }
}

impl Heuristic for RoundDiveHeur {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "LP diving by rounding the least fractional variable"
    }

    fn display_char(&self) -> char {
        'r'
    }

    fn freq(&self) -> i32 {
        1
    }

    fn priority(&self) -> i32 {
        -1000
    }

    fn timing(&self) -> HeurTiming {
        HeurTiming::Lp
    }

    fn uses_dive(&self) -> bool {
        true
    }

    fn execute(&mut self, engine: &mut Engine) -> CipResult<HeurResult> {
        if engine.lp.status() != LpStatus::Optimal || engine.lp.is_diving() {
            return Ok(HeurResult::DidNotRun);
        }
        if Self::least_fractional(engine).is_none() {
            // Nothing to round; the engine harvests integral LPs itself.
            return Ok(HeurResult::DidNotRun);
        }

        engine.start_dive()?;
        let mut found = HeurResult::DidNotFind;

        for _ in 0..MAX_DIVE_DEPTH {
            let (var, value) = match Self::least_fractional(engine) {
                Some(pick) => pick,
                None => {
                    // Integral dive LP: build a candidate solution.
                    let mut sol = Solution::new(SolOrigin::Heuristic(Self::NAME.into()));
                    for v in engine.prob.active_vars() {
                        sol.set(v, engine.lp_sol_value(v));
                    }
                    sol.recompute_obj(&engine.prob);
                    if engine.try_solution(sol, true, true)? {
                        found = HeurResult::FoundSol;
                    }
                    break;
                }
            };

            let rounded = value.round();
            let var_ref = engine.prob.var(var);
            let target = rounded.clamp(var_ref.lb(), var_ref.ub());
            engine.dive_set_bounds(var, target, target)?;

            match engine.dive_solve_lp()? {
                LpStatus::Optimal => {}
                // A dead-ended dive is abandoned, not repaired.
                _ => break,
            }
        }

        engine.end_dive()?;
        Ok(found)
    }

    fn clone_plugin(&self) -> Option<Box<dyn Heuristic>> {
        Some(Box::new(RoundDiveHeur))
    }
}
