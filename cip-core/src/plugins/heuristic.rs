//! Primal heuristic plugins.

use crate::engine::Engine;
use crate::error::CipResult;

/// Result of a heuristic call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeurResult {
    /// A feasible solution was found and offered to the store.
    FoundSol,

    /// The heuristic ran without finding a solution.
    DidNotFind,

    /// The heuristic skipped this call.
    DidNotRun,
}

/// In which node contexts a heuristic may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeurTiming {
    /// Only after an LP solve.
    Lp,

    /// Only on nodes processed without an LP.
    Pseudo,

    /// In both contexts.
    Both,
}

impl HeurTiming {
    /// True if the timing admits a call in the given context.
    pub fn admits(&self, has_lp: bool) -> bool {
        match self {
            HeurTiming::Lp => has_lp,
            HeurTiming::Pseudo => !has_lp,
            HeurTiming::Both => true,
        }
    }
}

/// A primal heuristic.
pub trait Heuristic {
    /// Unique heuristic name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Display character for progress lines.
    fn display_char(&self) -> char {
        '?'
    }

    /// Default calling frequency in nodes; `-1` disables. The effective
    /// value comes from `heuristics/<name>/freq`.
    fn freq(&self) -> i32 {
        1
    }

    /// Default priority; the effective value comes from
    /// `heuristics/<name>/priority`.
    fn priority(&self) -> i32 {
        0
    }

    /// Allowed contexts.
    fn timing(&self) -> HeurTiming {
        HeurTiming::Lp
    }

    /// True if the heuristic opens an LP dive.
    fn uses_dive(&self) -> bool {
        false
    }

    /// Run the heuristic; found solutions go through
    /// [`Engine::try_solution`].
    fn execute(&mut self, engine: &mut Engine) -> CipResult<HeurResult>;

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Heuristic>> {
        None
    }
}
