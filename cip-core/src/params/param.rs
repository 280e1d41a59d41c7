//! Typed parameter representation.

use crate::error::{CipError, CipResult};

/// Value of a parameter, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),

    /// 32-bit integer.
    Int(i32),

    /// 64-bit integer.
    LongInt(i64),

    /// Floating point value.
    Real(f64),

    /// Single printable character.
    Char(char),

    /// Free-form string.
    String(String),
}

impl ParamValue {
    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::LongInt(_) => "longint",
            ParamValue::Real(_) => "real",
            ParamValue::Char(_) => "char",
            ParamValue::String(_) => "string",
        }
    }

    /// True if `other` carries the same kind tag.
    pub fn same_kind(&self, other: &ParamValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Admissible range of a parameter, matching its kind.
#[derive(Debug, Clone)]
pub enum ParamRange {
    /// Any value of the kind is admissible.
    Free,

    /// Closed integer interval.
    Int {
        /// Smallest admissible value.
        min: i32,
        /// Largest admissible value.
        max: i32,
    },

    /// Closed 64-bit integer interval.
    LongInt {
        /// Smallest admissible value.
        min: i64,
        /// Largest admissible value.
        max: i64,
    },

    /// Closed real interval.
    Real {
        /// Smallest admissible value.
        min: f64,
        /// Largest admissible value.
        max: f64,
    },

    /// Set of allowed characters; empty means any printable glyph.
    Chars(String),
}

/// Change hook invoked after a successful set, before the call returns.
///
/// Hook failures abort the set call, but the new value is already stored
/// at that point; hooks should only derive caches.
pub type ParamHook = Box<dyn FnMut(&ParamValue) -> CipResult<()>>;

/// A single named parameter with default, current value, range and hook.
pub struct Param {
    name: String,
    desc: String,
    default: ParamValue,
    current: ParamValue,
    range: ParamRange,
    hook: Option<ParamHook>,
    /// Whether the parameter may be written while the engine is solving.
    solvetime: bool,
}

impl Param {
    /// Create a parameter. The default must lie inside the range.
    pub fn new(
        name: impl Into<String>,
        desc: impl Into<String>,
        default: ParamValue,
        range: ParamRange,
    ) -> CipResult<Self> {
        let name = name.into();
        let param = Param {
            current: default.clone(),
            name,
            desc: desc.into(),
            default,
            range,
            hook: None,
            solvetime: false,
        };
        if !param.admissible(&param.default) {
            return Err(CipError::ParameterWrongValue(param.name.clone()));
        }
        Ok(param)
    }

    /// Attach a change hook.
    pub fn with_hook(mut self, hook: ParamHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Allow writes during the solving stage.
    pub fn with_solvetime(mut self, allowed: bool) -> Self {
        self.solvetime = allowed;
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Current value.
    pub fn current(&self) -> &ParamValue {
        &self.current
    }

    /// Default value.
    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// Admissible range.
    pub fn range(&self) -> &ParamRange {
        &self.range
    }

    /// True if the parameter may be set while solving.
    pub fn solvetime(&self) -> bool {
        self.solvetime
    }

    /// Check a candidate value against kind and range.
    pub fn admissible(&self, value: &ParamValue) -> bool {
        if !self.default.same_kind(value) {
            return false;
        }
        match (&self.range, value) {
            (ParamRange::Free, _) => true,
            (ParamRange::Int { min, max }, ParamValue::Int(v)) => min <= v && v <= max,
            (ParamRange::LongInt { min, max }, ParamValue::LongInt(v)) => min <= v && v <= max,
            (ParamRange::Real { min, max }, ParamValue::Real(v)) => *min <= *v && *v <= *max,
            (ParamRange::Chars(allowed), ParamValue::Char(c)) => {
                if c.is_control() {
                    return false;
                }
                allowed.is_empty() || allowed.contains(*c)
            }
            // Range kind does not match the value kind.
            _ => false,
        }
    }

    /// Set the value.
    ///
    /// Kind mismatch fails with `parameter-wrong-type`, range violation
    /// with `parameter-wrong-value`; in both cases the current value is
    /// untouched. On success the change hook runs before returning; a
    /// hook error is propagated, but the value stays set.
    pub fn set(&mut self, value: ParamValue) -> CipResult<()> {
        if !self.default.same_kind(&value) {
            return Err(CipError::ParameterWrongType(self.name.clone()));
        }
        if !self.admissible(&value) {
            return Err(CipError::ParameterWrongValue(self.name.clone()));
        }
        self.current = value;
        if let Some(hook) = self.hook.as_mut() {
            hook(&self.current)?;
        }
        Ok(())
    }

    /// Reset to the default value (hook runs as for a normal set).
    pub fn reset(&mut self) -> CipResult<()> {
        self.set(self.default.clone())
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("current", &self.current)
            .field("default", &self.default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_range_validation() {
        let mut p = Param::new(
            "limits/rounds",
            "maximal rounds",
            ParamValue::Int(5),
            ParamRange::Int { min: -1, max: 100 },
        )
        .unwrap();

        assert!(p.set(ParamValue::Int(100)).is_ok());
        assert!(matches!(
            p.set(ParamValue::Int(101)),
            Err(CipError::ParameterWrongValue(_))
        ));
        // Rejected set leaves the value untouched.
        assert_eq!(p.current(), &ParamValue::Int(100));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut p = Param::new("a/b", "", ParamValue::Bool(true), ParamRange::Free).unwrap();
        assert!(matches!(
            p.set(ParamValue::Int(1)),
            Err(CipError::ParameterWrongType(_))
        ));
        assert_eq!(p.current(), &ParamValue::Bool(true));
    }

    #[test]
    fn test_hook_runs_after_store() {
        let seen = Rc::new(Cell::new(0i32));
        let seen2 = seen.clone();
        let mut p = Param::new("h/x", "", ParamValue::Int(0), ParamRange::Free)
            .unwrap()
            .with_hook(Box::new(move |v| {
                if let ParamValue::Int(i) = v {
                    seen2.set(*i);
                }
                Ok(())
            }));

        p.set(ParamValue::Int(7)).unwrap();
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_hook_error_keeps_value() {
        let mut p = Param::new("h/y", "", ParamValue::Int(0), ParamRange::Free)
            .unwrap()
            .with_hook(Box::new(|_| Err(CipError::InvalidData("derived cache".into()))));

        assert!(p.set(ParamValue::Int(3)).is_err());
        // The new value is already stored when the hook fails.
        assert_eq!(p.current(), &ParamValue::Int(3));
    }

    #[test]
    fn test_char_allowed_set() {
        let mut p = Param::new(
            "display/verblevel",
            "",
            ParamValue::Char('m'),
            ParamRange::Chars("lmh".into()),
        )
        .unwrap();
        assert!(p.set(ParamValue::Char('l')).is_ok());
        assert!(p.set(ParamValue::Char('z')).is_err());
    }
}
