//! Presolver plugins.

use crate::cons::{PresolResult, PresolStats};
use crate::engine::Engine;
use crate::error::CipResult;

/// A presolver: applies problem reductions before the search starts.
pub trait Presolver {
    /// Unique presolver name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Presolvers run in decreasing priority within a round.
    fn priority(&self) -> i32 {
        0
    }

    /// Execute one presolving pass, reporting reductions in `stats`.
    fn execute(&mut self, engine: &mut Engine, stats: &mut PresolStats)
        -> CipResult<PresolResult>;

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Presolver>> {
        None
    }
}
