//! cip-core: a branch-and-bound engine for constraint integer programs.
//!
//! The engine combines LP relaxation, constraint propagation,
//! cutting-plane separation, primal heuristics and a pluggable plugin
//! architecture behind one owning aggregate, [`Engine`]. It supports:
//!
//! - **Plugins**: constraint handlers, node selectors, branching rules,
//!   separators, propagators, primal heuristics, presolvers, file
//!   readers, variable pricers, conflict analyzer hooks
//! - **Typed parameters**: hierarchical names, validation, change hooks,
//!   text-file persistence
//! - **LP diving**: a reversible LP substate for heuristics
//! - **Transformed problems**: fixings, aggregations, negations with
//!   transparent value resolution
//!
//! # Example
//!
//! ```
//! use cip_core::{Engine, SolveStatus, VarKind};
//!
//! // min x + y  s.t.  x + y >= 1,  x, y binary
//! let mut engine = Engine::new()?;
//! engine.create_prob("cover")?;
//! let x = engine.add_var("x", VarKind::Binary, 1.0, 0.0, 1.0)?;
//! let y = engine.add_var("y", VarKind::Binary, 1.0, 0.0, 1.0)?;
//! engine.add_linear_cons("c", &[(x, 1.0), (y, 1.0)], 1.0, f64::INFINITY)?;
//!
//! let status = engine.solve()?;
//! assert_eq!(status, SolveStatus::Optimal);
//! assert!((engine.primal_bound() - 1.0).abs() < 1e-6);
//! # Ok::<(), cip_core::CipError>(())
//! ```
//!
//! The numerical LP solver is a collaborator behind the
//! [`lp::LpSolver`] trait; the bundled dense simplex backend serves as
//! the reference implementation.

#![warn(missing_docs)]

mod clock;
pub mod cons;
mod engine;
mod error;
mod heur;
pub mod lp;
pub mod params;
pub mod plugins;
mod presol;
mod prob;
mod prop;
mod sepa;
mod sol;
pub mod tree;
pub mod var;

pub use engine::{Engine, SolveStatus, Stage, Stats, Tighten};
pub use error::{CipError, CipResult};
pub use prob::{ObjSense, Prob};
pub use sol::{SolOrigin, SolStore, Solution};
pub use var::{VarId, VarKind};
