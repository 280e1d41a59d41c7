//! The constraint handler trait: callback slots and result codes.

use crate::engine::Engine;
use crate::error::{CipError, CipResult};
use crate::sol::Solution;

use super::constraint::{ConsData, ConsId};

/// Result of a feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// All checked constraints are satisfied.
    Feasible,

    /// Some constraint is violated.
    Infeasible,
}

/// Result of an enforcement call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforceResult {
    /// The node is infeasible and can be cut off.
    Cutoff,

    /// The handler created child nodes.
    Branched,

    /// The handler tightened a variable domain.
    ReducedDom,

    /// The handler added a cutting plane.
    Separated,

    /// The handler added a constraint resolving the violation.
    ConsAdded,

    /// A constraint is violated but the handler did not resolve it.
    Infeasible,

    /// All constraints of the handler are satisfied.
    Feasible,
}

impl EnforceResult {
    /// True for the codes that resolve the current LP solution, ending
    /// the enforcement loop.
    pub fn resolves(&self) -> bool {
        matches!(
            self,
            EnforceResult::Cutoff
                | EnforceResult::Branched
                | EnforceResult::ReducedDom
                | EnforceResult::Separated
                | EnforceResult::ConsAdded
        )
    }
}

/// Result of a propagation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropResult {
    /// The node is infeasible.
    Cutoff,

    /// At least one domain was tightened.
    ReducedDom,

    /// Propagation ran but found nothing.
    DidNotFind,

    /// The handler skipped this call.
    DidNotRun,
}

/// Result of a separation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SepaResult {
    /// The node is infeasible.
    Cutoff,

    /// At least one cut was added.
    Separated,

    /// A constraint resolving the violation was added.
    ConsAdded,

    /// Separation ran but produced nothing.
    DidNotFind,

    /// The plugin skipped this call.
    DidNotRun,
}

/// Result of a presolving call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresolResult {
    /// The problem is infeasible.
    Cutoff,

    /// The problem is unbounded.
    Unbounded,

    /// The presolver found reductions this round.
    Success,

    /// The presolver ran but reduced nothing.
    DidNotFind,

    /// The presolver skipped this call.
    DidNotRun,
}

/// Reduction counters reported by presolvers and handler presolve slots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PresolStats {
    /// Variables fixed.
    pub nfixedvars: usize,

    /// Variables aggregated.
    pub naggrvars: usize,

    /// Bounds tightened.
    pub nchgbds: usize,

    /// Constraints deleted.
    pub ndelconss: usize,

    /// Coefficients changed.
    pub nchgcoefs: usize,

    /// Left or right hand sides changed.
    pub nchgsides: usize,
}

impl PresolStats {
    /// Total number of reductions.
    pub fn total(&self) -> usize {
        self.nfixedvars
            + self.naggrvars
            + self.nchgbds
            + self.ndelconss
            + self.nchgcoefs
            + self.nchgsides
    }
}

/// A constraint handler: interprets one class of constraints.
///
/// Optional slots default to "skip"; a handler only overrides what it
/// supports. `check` and `lock` are mandatory for every handler, and
/// `enforce_lp` for handlers that can meet a violated LP solution.
pub trait ConsHandler {
    /// Unique handler name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Priority in the separation loop (higher first).
    fn sepa_priority(&self) -> i32 {
        0
    }

    /// Priority in the enforcement loop (higher first).
    fn enfo_priority(&self) -> i32 {
        0
    }

    /// Priority in the feasibility check loop (higher first).
    fn check_priority(&self) -> i32 {
        0
    }

    /// Propagation frequency in tree depths; `-1` disables propagation,
    /// `0` restricts it to the root and presolving.
    fn prop_freq(&self) -> i32 {
        -1
    }

    /// False for handlers that act without having constraints of their
    /// own (integrality is the canonical example).
    fn needs_cons(&self) -> bool {
        true
    }

    /// Called when the solving process starts.
    fn init(&mut self, _engine: &mut Engine) -> CipResult<()> {
        Ok(())
    }

    /// Called when the solving process ends.
    fn exit(&mut self, _engine: &mut Engine) -> CipResult<()> {
        Ok(())
    }

    /// Produce the transformed payload for an original-space constraint,
    /// mapping original variables to their transformed counterparts.
    fn transform(&self, _engine: &Engine, _data: &dyn ConsData) -> CipResult<Box<dyn ConsData>> {
        Err(CipError::NotImplemented(format!(
            "{}: transform",
            self.name()
        )))
    }

    /// Contribute initial relaxation rows for the given constraints.
    fn init_lp(&mut self, _engine: &mut Engine, _conss: &[ConsId]) -> CipResult<()> {
        Ok(())
    }

    /// Separate the current LP solution.
    fn separate_lp(&mut self, _engine: &mut Engine, _conss: &[ConsId]) -> CipResult<SepaResult> {
        Ok(SepaResult::DidNotRun)
    }

    /// Enforce the current LP solution.
    fn enforce_lp(&mut self, _engine: &mut Engine, _conss: &[ConsId]) -> CipResult<EnforceResult> {
        Ok(EnforceResult::Feasible)
    }

    /// Enforce the pseudo solution (no LP available).
    fn enforce_pseudo(
        &mut self,
        _engine: &mut Engine,
        _conss: &[ConsId],
    ) -> CipResult<EnforceResult> {
        Ok(EnforceResult::Feasible)
    }

    /// Check a candidate solution for feasibility. Mandatory.
    ///
    /// `check_integrality` and `check_lp_rows` tell the handler which
    /// parts the caller already verified.
    fn check(
        &self,
        engine: &Engine,
        conss: &[ConsId],
        sol: &Solution,
        check_integrality: bool,
        check_lp_rows: bool,
    ) -> CipResult<CheckResult>;

    /// Propagate domains for the given constraints.
    fn propagate(&mut self, _engine: &mut Engine, _conss: &[ConsId]) -> CipResult<PropResult> {
        Ok(PropResult::DidNotRun)
    }

    /// Explain a bound deduction for conflict analysis.
    fn resolve_propagation(
        &mut self,
        _engine: &mut Engine,
        _cons: ConsId,
        _var: crate::var::VarId,
    ) -> CipResult<()> {
        Ok(())
    }

    /// Presolve the given constraints, reporting reductions.
    fn presolve(
        &mut self,
        _engine: &mut Engine,
        _conss: &[ConsId],
        _stats: &mut PresolStats,
    ) -> CipResult<PresolResult> {
        Ok(PresolResult::DidNotRun)
    }

    /// Add rounding locks for a constraint. Mandatory. `amount` is `+1`
    /// when locking, `-1` when unlocking.
    fn lock(&self, engine: &mut Engine, cons: ConsId, amount: i32) -> CipResult<()>;

    /// Notification: a constraint of this handler became active.
    fn cons_active(&mut self, _engine: &mut Engine, _cons: ConsId) -> CipResult<()> {
        Ok(())
    }

    /// Notification: a constraint of this handler was deactivated.
    fn cons_deactive(&mut self, _engine: &mut Engine, _cons: ConsId) -> CipResult<()> {
        Ok(())
    }

    /// Notification: a constraint was re-enabled after a temporary
    /// disabling.
    fn cons_enable(&mut self, _engine: &mut Engine, _cons: ConsId) -> CipResult<()> {
        Ok(())
    }

    /// Notification: a constraint was temporarily disabled.
    fn cons_disable(&mut self, _engine: &mut Engine, _cons: ConsId) -> CipResult<()> {
        Ok(())
    }

    /// Release handler-held structures of a constraint about to be
    /// deleted. The payload itself is dropped by the pool.
    fn delete_cons(&mut self, _engine: &mut Engine, _cons: ConsId) -> CipResult<()> {
        Ok(())
    }

    /// Render a constraint for display.
    fn print(&self, _engine: &Engine, _cons: ConsId) -> String {
        String::new()
    }

    /// Clone the handler for a subordinate engine; `None` marks the
    /// handler as non-cloneable.
    fn clone_handler(&self) -> Option<Box<dyn ConsHandler>> {
        None
    }
}
