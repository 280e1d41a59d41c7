//! Constraint objects, the handler trait, and built-in handlers.

mod constraint;
mod handler;
mod integral;
mod linear;

pub use constraint::{ConsData, ConsFlags, ConsId, ConsPool, Constraint};
pub use handler::{
    CheckResult, ConsHandler, EnforceResult, PresolResult, PresolStats, PropResult, SepaResult,
};
pub use integral::IntegralConsHandler;
pub use linear::{LinearConsData, LinearConsHandler};
