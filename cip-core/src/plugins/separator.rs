//! Separator plugins: cutting-plane generators.

use crate::cons::SepaResult;
use crate::engine::Engine;
use crate::error::CipResult;
use crate::var::VarId;

/// A candidate cutting plane over transformed variables.
#[derive(Debug, Clone)]
pub struct Cut {
    /// Cut name (made unique by the separation store).
    pub name: String,

    /// Sparse coefficients.
    pub entries: Vec<(VarId, f64)>,

    /// Left hand side.
    pub lhs: f64,

    /// Right hand side.
    pub rhs: f64,

    /// Valid only in the current subtree.
    pub local: bool,
}

impl Cut {
    /// A one-sided `a^T x <= rhs` cut.
    pub fn le(name: impl Into<String>, entries: Vec<(VarId, f64)>, rhs: f64) -> Self {
        Cut {
            name: name.into(),
            entries,
            lhs: f64::NEG_INFINITY,
            rhs,
            local: false,
        }
    }

    /// A one-sided `a^T x >= lhs` cut.
    pub fn ge(name: impl Into<String>, entries: Vec<(VarId, f64)>, lhs: f64) -> Self {
        Cut {
            name: name.into(),
            entries,
            lhs,
            rhs: f64::INFINITY,
            local: false,
        }
    }

    /// Mark the cut as locally valid.
    pub fn into_local(mut self) -> Self {
        self.local = true;
        self
    }

    /// Euclidean norm of the coefficients.
    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, a)| a * a)
            .sum::<f64>()
            .sqrt()
    }
}

/// A separator: generates cuts from the current LP relaxation.
pub trait Separator {
    /// Unique separator name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Separators run in decreasing priority.
    fn priority(&self) -> i32 {
        0
    }

    /// Generate cuts for the current LP solution, submitting them via
    /// [`Engine::add_cut`].
    fn execute_lp(&mut self, engine: &mut Engine, depth: usize) -> CipResult<SepaResult>;

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Separator>> {
        None
    }
}
