//! File reader plugins.

use std::path::Path;

use crate::engine::Engine;
use crate::error::CipResult;

/// A problem file reader/writer for one file extension.
pub trait Reader {
    /// Unique reader name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// File extension served by this reader (without the dot).
    fn extension(&self) -> &'static str;

    /// Load a problem from `path` into the engine.
    fn read(&mut self, engine: &mut Engine, path: &Path) -> CipResult<()>;

    /// Write the current problem to `path`.
    fn write(&mut self, _engine: &Engine, _path: &Path) -> CipResult<()> {
        Err(crate::error::CipError::NotImplemented(format!(
            "{}: write",
            self.name()
        )))
    }

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn Reader>> {
        None
    }
}
