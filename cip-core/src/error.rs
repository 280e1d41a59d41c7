//! Error types for the CIP core.

use thiserror::Error;

/// Errors that can occur inside the engine or its plugins.
///
/// Every callback returns this taxonomy. Recoverable kinds (an
/// [`CipError::Lp`] raised inside a dive, for instance) are handled at
/// the call site; invariant violations such as
/// [`CipError::BranchingFailed`] unwind the solve.
#[derive(Error, Debug)]
pub enum CipError {
    /// Memory allocation failed; the engine enters the aborted state.
    #[error("out of memory: {0}")]
    NoMemory(String),

    /// Reading from a file or stream failed.
    #[error("read error: {0}")]
    Read(String),

    /// Writing to a file or stream failed.
    #[error("write error: {0}")]
    Write(String),

    /// The named file does not exist.
    #[error("no such file: {0}")]
    NoFile(String),

    /// A file could not be created.
    #[error("cannot create file: {0}")]
    FileCreate(String),

    /// Malformed textual input.
    #[error("parse error at line {line}: {msg}")]
    Parse {
        /// 1-based line number of the offending input line.
        line: usize,
        /// What was wrong with it.
        msg: String,
    },

    /// Structural inconsistency detected at runtime.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A plugin returned a result code that is impossible for the call.
    #[error("invalid result from {0}")]
    InvalidResult(String),

    /// Callback dispatch failed: no plugin with the given name.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// Lookup of an unregistered parameter name.
    #[error("unknown parameter: {0}")]
    ParameterUnknown(String),

    /// Parameter accessed with the wrong type.
    #[error("parameter {0} has the wrong type")]
    ParameterWrongType(String),

    /// Rejected parameter value (outside min/max or allowed set).
    #[error("invalid value for parameter {0}")]
    ParameterWrongValue(String),

    /// The LP solver failed unrecoverably.
    #[error("LP error: {0}")]
    Lp(String),

    /// A plugin slot required for this call was not provided.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// No branching rule produced children on a fractional LP solution.
    #[error("branching failed in {0}")]
    BranchingFailed(String),
}

/// Result type used throughout the engine.
pub type CipResult<T> = Result<T, CipError>;

impl CipError {
    /// True if the error may be handled locally (by abandoning the
    /// operation) instead of unwinding the solve.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CipError::Lp(_)
                | CipError::Read(_)
                | CipError::Write(_)
                | CipError::NoFile(_)
                | CipError::FileCreate(_)
                | CipError::Parse { .. }
                | CipError::ParameterUnknown(_)
                | CipError::ParameterWrongType(_)
                | CipError::ParameterWrongValue(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_operation() {
        let err = CipError::BranchingFailed("node 17".into());
        assert_eq!(err.to_string(), "branching failed in node 17");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CipError::Lp("singular basis".into()).is_recoverable());
        assert!(!CipError::BranchingFailed("root".into()).is_recoverable());
        assert!(!CipError::InvalidData("corrupt change list".into()).is_recoverable());
    }
}
