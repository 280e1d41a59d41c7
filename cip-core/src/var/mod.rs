//! Variable and domain model: bounds, holes, integrality, aggregation,
//! variable-bound relations.

mod domain;
mod variable;

pub use domain::{Domain, Hole, FEASTOL};
pub use variable::{VarBoundRel, VarId, VarKind, VarStatus, Variable};
