//! Global parameter store with typed accessors.

use std::collections::HashMap;

use crate::error::{CipError, CipResult};

use super::param::{Param, ParamHook, ParamRange, ParamValue};

/// Store of named parameters with a hash index for O(1) lookup.
///
/// Names follow the hierarchical `section/name` convention; uniqueness is
/// enforced at registration. While the engine is solving, writes are
/// rejected unless the parameter was registered as solve-time changeable.
#[derive(Default)]
pub struct ParamStore {
    params: Vec<Param>,
    index: HashMap<String, usize>,
    solving: bool,
}

impl ParamStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the store as belonging to a solving engine (or not). Toggled
    /// by the engine around the solving stage.
    pub fn set_solving(&mut self, solving: bool) {
        self.solving = solving;
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if no parameter is registered.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over parameters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    fn insert(&mut self, param: Param) -> CipResult<()> {
        if self.index.contains_key(param.name()) {
            return Err(CipError::InvalidData(format!(
                "parameter {} registered twice",
                param.name()
            )));
        }
        self.index.insert(param.name().to_owned(), self.params.len());
        self.params.push(param);
        Ok(())
    }

    fn lookup(&self, name: &str) -> CipResult<&Param> {
        self.index
            .get(name)
            .map(|&i| &self.params[i])
            .ok_or_else(|| CipError::ParameterUnknown(name.to_owned()))
    }

    fn lookup_mut(&mut self, name: &str) -> CipResult<&mut Param> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| CipError::ParameterUnknown(name.to_owned()))?;
        Ok(&mut self.params[i])
    }

    // === Registration ===

    /// Register a boolean parameter.
    pub fn add_bool(&mut self, name: &str, desc: &str, default: bool) -> CipResult<()> {
        self.insert(Param::new(name, desc, ParamValue::Bool(default), ParamRange::Free)?)
    }

    /// Register an integer parameter with inclusive range.
    pub fn add_int(
        &mut self,
        name: &str,
        desc: &str,
        default: i32,
        min: i32,
        max: i32,
    ) -> CipResult<()> {
        self.insert(Param::new(
            name,
            desc,
            ParamValue::Int(default),
            ParamRange::Int { min, max },
        )?)
    }

    /// Register a 64-bit integer parameter with inclusive range.
    pub fn add_longint(
        &mut self,
        name: &str,
        desc: &str,
        default: i64,
        min: i64,
        max: i64,
    ) -> CipResult<()> {
        self.insert(Param::new(
            name,
            desc,
            ParamValue::LongInt(default),
            ParamRange::LongInt { min, max },
        )?)
    }

    /// Register a real parameter with inclusive range.
    pub fn add_real(
        &mut self,
        name: &str,
        desc: &str,
        default: f64,
        min: f64,
        max: f64,
    ) -> CipResult<()> {
        self.insert(Param::new(
            name,
            desc,
            ParamValue::Real(default),
            ParamRange::Real { min, max },
        )?)
    }

    /// Register a character parameter; `allowed` empty means any
    /// printable glyph.
    pub fn add_char(&mut self, name: &str, desc: &str, default: char, allowed: &str) -> CipResult<()> {
        self.insert(Param::new(
            name,
            desc,
            ParamValue::Char(default),
            ParamRange::Chars(allowed.to_owned()),
        )?)
    }

    /// Register a string parameter.
    pub fn add_string(&mut self, name: &str, desc: &str, default: &str) -> CipResult<()> {
        self.insert(Param::new(
            name,
            desc,
            ParamValue::String(default.to_owned()),
            ParamRange::Free,
        )?)
    }

    /// Attach a change hook to an already registered parameter.
    pub fn set_hook(&mut self, name: &str, hook: ParamHook) -> CipResult<()> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| CipError::ParameterUnknown(name.to_owned()))?;
        let param = std::mem::replace(
            &mut self.params[i],
            Param::new("", "", ParamValue::Bool(false), ParamRange::Free)?,
        );
        self.params[i] = param.with_hook(hook);
        Ok(())
    }

    /// Mark a parameter as changeable during the solving stage.
    pub fn set_solvetime(&mut self, name: &str, allowed: bool) -> CipResult<()> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| CipError::ParameterUnknown(name.to_owned()))?;
        let param = std::mem::replace(
            &mut self.params[i],
            Param::new("", "", ParamValue::Bool(false), ParamRange::Free)?,
        );
        self.params[i] = param.with_solvetime(allowed);
        Ok(())
    }

    // === Typed getters ===

    /// Get a boolean value.
    pub fn get_bool(&self, name: &str) -> CipResult<bool> {
        match self.lookup(name)?.current() {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    /// Get an integer value.
    pub fn get_int(&self, name: &str) -> CipResult<i32> {
        match self.lookup(name)?.current() {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    /// Get a 64-bit integer value.
    pub fn get_longint(&self, name: &str) -> CipResult<i64> {
        match self.lookup(name)?.current() {
            ParamValue::LongInt(v) => Ok(*v),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    /// Get a real value.
    pub fn get_real(&self, name: &str) -> CipResult<f64> {
        match self.lookup(name)?.current() {
            ParamValue::Real(v) => Ok(*v),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    /// Get a character value.
    pub fn get_char(&self, name: &str) -> CipResult<char> {
        match self.lookup(name)?.current() {
            ParamValue::Char(v) => Ok(*v),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    /// Get a string value.
    pub fn get_string(&self, name: &str) -> CipResult<String> {
        match self.lookup(name)?.current() {
            ParamValue::String(v) => Ok(v.clone()),
            _ => Err(CipError::ParameterWrongType(name.to_owned())),
        }
    }

    // === Typed setters ===

    /// Set a value of any kind. Checks the solving-stage write policy,
    /// then delegates to the parameter's own validation.
    pub fn set(&mut self, name: &str, value: ParamValue) -> CipResult<()> {
        let solving = self.solving;
        let param = self.lookup_mut(name)?;
        if solving && !param.solvetime() {
            return Err(CipError::InvalidData(format!(
                "parameter {name} is not changeable during solving"
            )));
        }
        param.set(value)
    }

    /// Set a boolean parameter.
    pub fn set_bool(&mut self, name: &str, value: bool) -> CipResult<()> {
        self.set(name, ParamValue::Bool(value))
    }

    /// Set an integer parameter.
    pub fn set_int(&mut self, name: &str, value: i32) -> CipResult<()> {
        self.set(name, ParamValue::Int(value))
    }

    /// Set a 64-bit integer parameter.
    pub fn set_longint(&mut self, name: &str, value: i64) -> CipResult<()> {
        self.set(name, ParamValue::LongInt(value))
    }

    /// Set a real parameter.
    pub fn set_real(&mut self, name: &str, value: f64) -> CipResult<()> {
        self.set(name, ParamValue::Real(value))
    }

    /// Set a character parameter.
    pub fn set_char(&mut self, name: &str, value: char) -> CipResult<()> {
        self.set(name, ParamValue::Char(value))
    }

    /// Set a string parameter.
    pub fn set_string(&mut self, name: &str, value: &str) -> CipResult<()> {
        self.set(name, ParamValue::String(value.to_owned()))
    }

    /// True if a parameter of this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Access a parameter record by name.
    pub fn get(&self, name: &str) -> CipResult<&Param> {
        self.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_roundtrip_types() {
        let mut store = ParamStore::new();
        store.add_bool("a/flag", "a flag", true).unwrap();
        store.add_int("a/count", "a count", 3, 0, 10).unwrap();
        store
            .add_longint("a/nodes", "node limit", -1, -1, i64::MAX)
            .unwrap();
        store.add_real("a/tol", "tolerance", 1e-6, 0.0, 1.0).unwrap();
        store.add_char("a/mode", "mode", 'd', "dbe").unwrap();
        store.add_string("a/name", "name", "root").unwrap();

        assert!(store.get_bool("a/flag").unwrap());
        assert_eq!(store.get_int("a/count").unwrap(), 3);
        assert_eq!(store.get_longint("a/nodes").unwrap(), -1);
        assert_eq!(store.get_real("a/tol").unwrap(), 1e-6);
        assert_eq!(store.get_char("a/mode").unwrap(), 'd');
        assert_eq!(store.get_string("a/name").unwrap(), "root");
    }

    #[test]
    fn test_unknown_and_wrong_type() {
        let mut store = ParamStore::new();
        store.add_int("x/y", "", 0, 0, 5).unwrap();

        assert!(matches!(
            store.get_int("x/z"),
            Err(CipError::ParameterUnknown(_))
        ));
        assert!(matches!(
            store.get_bool("x/y"),
            Err(CipError::ParameterWrongType(_))
        ));
        assert!(matches!(
            store.set_real("x/y", 0.5),
            Err(CipError::ParameterWrongType(_))
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = ParamStore::new();
        store.add_int("x/y", "", 0, 0, 5).unwrap();
        assert!(store.add_bool("x/y", "", false).is_err());
    }

    #[test]
    fn test_solving_write_policy() {
        let mut store = ParamStore::new();
        store.add_int("x/y", "", 0, 0, 5).unwrap();
        store.add_int("x/live", "", 0, 0, 5).unwrap();
        store.set_solvetime("x/live", true).unwrap();

        store.set_solving(true);
        assert!(store.set_int("x/y", 1).is_err());
        assert!(store.set_int("x/live", 1).is_ok());

        store.set_solving(false);
        assert!(store.set_int("x/y", 1).is_ok());
    }
}
