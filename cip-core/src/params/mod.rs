//! Global parameter store: typed named parameters with domains,
//! defaults, change hooks and text-file persistence.

mod file;
mod param;
mod store;

pub use param::{Param, ParamHook, ParamRange, ParamValue};
pub use store::ParamStore;
