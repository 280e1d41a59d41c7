//! Plugin kinds and the registry.
//!
//! One trait per plugin kind; optional callback slots are default trait
//! methods that return "skip". Built-in defaults live next to their
//! traits (`dfs`/`bestbound` selectors, `mostinfeas` branching,
//! `pseudoobj` propagator, `dualfix` presolver, `rounddive` heuristic).

mod branching;
mod conflict;
mod dualfix;
mod heuristic;
mod nodesel;
mod presolver;
mod pricer;
mod propagator;
mod reader;
mod registry;
mod rounddive;
mod separator;

pub use branching::{BranchResult, BranchRule, MostInfeasBranching};
pub use conflict::{ConflictAnalyzer, ConflictSource};
pub use dualfix::DualfixPresolver;
pub use heuristic::{HeurResult, HeurTiming, Heuristic};
pub use nodesel::{BestBoundNodesel, DfsNodesel, NodeSelector};
pub use presolver::Presolver;
pub use pricer::{PriceResult, Pricer};
pub use propagator::{Propagator, PseudoObjProp};
pub use reader::Reader;
pub use registry::PluginRegistry;
pub use rounddive::RoundDiveHeur;
pub use separator::{Cut, Separator};
