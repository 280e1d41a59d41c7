//! Integrality constraint handler.
//!
//! Enforces integrality of integer-kind variables on LP solutions. The
//! handler has no constraints of its own; it acts on the variable set.

use crate::engine::Engine;
use crate::error::CipResult;
use crate::sol::Solution;
use crate::var::Variable;

use super::constraint::ConsId;
use super::handler::{CheckResult, ConsHandler, EnforceResult};

/// Integrality tolerance.
const INT_TOL: f64 = 1e-6;

/// The integrality handler.
#[derive(Debug, Default)]
pub struct IntegralConsHandler;

impl IntegralConsHandler {
    /// Handler name used at registration.
    pub const NAME: &'static str = "integral";
}

impl ConsHandler for IntegralConsHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "integrality of integer variables"
    }

    // Runs last in enforcement: all semantic handlers come first, so a
    // branching decision is only taken on otherwise feasible solutions.
    fn enfo_priority(&self) -> i32 {
        0
    }

    fn check_priority(&self) -> i32 {
        0
    }

    fn needs_cons(&self) -> bool {
        false
    }

    fn enforce_lp(&mut self, engine: &mut Engine, _conss: &[ConsId]) -> CipResult<EnforceResult> {
        for v in engine.prob.active_vars() {
            if !engine.prob.var(v).kind.is_integral() {
                continue;
            }
            let value = engine.lp_sol_value(v);
            if Variable::fractionality(value) > INT_TOL {
                return Ok(EnforceResult::Infeasible);
            }
        }
        Ok(EnforceResult::Feasible)
    }

    fn check(
        &self,
        engine: &Engine,
        _conss: &[ConsId],
        sol: &Solution,
        check_integrality: bool,
        _check_lp_rows: bool,
    ) -> CipResult<CheckResult> {
        if !check_integrality {
            return Ok(CheckResult::Feasible);
        }
        for v in engine.prob.active_vars() {
            if !engine.prob.var(v).kind.is_integral() {
                continue;
            }
            if Variable::fractionality(sol.value(&engine.prob, v)) > INT_TOL {
                return Ok(CheckResult::Infeasible);
            }
        }
        Ok(CheckResult::Feasible)
    }

    fn lock(&self, _engine: &mut Engine, _cons: ConsId, _amount: i32) -> CipResult<()> {
        Ok(())
    }

    fn clone_handler(&self) -> Option<Box<dyn ConsHandler>> {
        Some(Box::new(IntegralConsHandler))
    }
}
