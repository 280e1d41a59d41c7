//! Variable pricer plugins.

use crate::engine::Engine;
use crate::error::CipResult;

/// Result of a pricing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceResult {
    /// New variables were added; the LP must be resolved.
    FoundVars,

    /// No improving variables exist.
    DidNotFind,
}

/// A variable pricer: generates problem variables on demand from the
/// dual solution of the relaxation.
pub trait Pricer {
    /// Unique pricer name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Pricers run in decreasing priority.
    fn priority(&self) -> i32 {
        0
    }

    /// Price on reduced costs after an optimal LP solve. New variables
    /// enter through [`Engine::add_priced_var`].
    fn price_redcost(&mut self, engine: &mut Engine) -> CipResult<PriceResult>;

    /// Price on the Farkas proof after an infeasible LP solve.
    fn price_farkas(&mut self, _engine: &mut Engine) -> CipResult<PriceResult> {
        Ok(PriceResult::DidNotFind)
    }

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Pricer>> {
        None
    }
}
