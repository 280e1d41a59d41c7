//! Conflict analyzer hooks.

use crate::engine::Engine;
use crate::error::CipResult;
use crate::var::VarId;

/// What triggered the conflict analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictSource {
    /// The node LP turned infeasible; the Farkas proof is available on
    /// the engine's LP.
    LpInfeasible,

    /// A propagator or handler proved the node infeasible; the last
    /// deduced bound change is reported when known.
    PropagationCutoff {
        /// The variable whose deduction closed the node, if recorded.
        var: Option<VarId>,
    },
}

/// A conflict analyzer: turns infeasibility proofs into learned
/// information (typically conflict constraints).
pub trait ConflictAnalyzer {
    /// Unique analyzer name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Analyze the current infeasibility.
    fn analyze(&mut self, engine: &mut Engine, source: ConflictSource) -> CipResult<()>;

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn ConflictAnalyzer>> {
        None
    }
}
