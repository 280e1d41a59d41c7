//! Parameter file reading and writing.
//!
//! Line-oriented UTF-8 text: `name = value`, `#` starts a comment,
//! strings are double-quoted. Unknown parameter names produce a warning
//! and are skipped; malformed values abort the read with the offending
//! line number.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::error::{CipError, CipResult};

use super::param::ParamValue;
use super::store::ParamStore;

impl ParamStore {
    /// Read parameter assignments from a file.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> CipResult<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CipError::NoFile(path.display().to_string())
            } else {
                CipError::Read(format!("{}: {e}", path.display()))
            }
        })?;
        self.read_str(&text)
    }

    /// Read parameter assignments from a string (same grammar as files).
    pub fn read_str(&mut self, text: &str) -> CipResult<()> {
        for (lineno, raw) in text.lines().enumerate() {
            let line = lineno + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let eq = trimmed.find('=').ok_or_else(|| CipError::Parse {
                line,
                msg: "expected `name = value`".into(),
            })?;
            let name = trimmed[..eq].trim();
            let rest = trimmed[eq + 1..].trim();
            if name.is_empty() {
                return Err(CipError::Parse {
                    line,
                    msg: "empty parameter name".into(),
                });
            }

            if !self.contains(name) {
                log::warn!("ignoring unknown parameter <{name}> in line {line}");
                eprintln!("warning: unknown parameter <{name}> in line {line}");
                continue;
            }

            let value = parse_value(self.get(name)?.current(), rest, line)?;
            self.set(name, value)?;
        }
        Ok(())
    }

    /// Write all parameters as `name = value` lines, preceded by their
    /// description as a comment.
    pub fn write_file(&self, path: impl AsRef<Path>) -> CipResult<()> {
        let path = path.as_ref();
        let mut file = fs::File::create(path)
            .map_err(|e| CipError::FileCreate(format!("{}: {e}", path.display())))?;
        let text = self.write_str();
        file.write_all(text.as_bytes())
            .map_err(|e| CipError::Write(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// Render all parameters in file syntax.
    pub fn write_str(&self) -> String {
        let mut out = String::new();
        for param in self.iter() {
            if !param.desc().is_empty() {
                out.push_str(&format!("# {}\n", param.desc()));
            }
            out.push_str(&format!(
                "{} = {}\n",
                param.name(),
                format_value(param.current())
            ));
        }
        out
    }
}

/// Render a value in file syntax.
fn format_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Bool(true) => "TRUE".into(),
        ParamValue::Bool(false) => "FALSE".into(),
        ParamValue::Int(v) => v.to_string(),
        ParamValue::LongInt(v) => v.to_string(),
        ParamValue::Real(v) => v.to_string(),
        ParamValue::Char(c) => c.to_string(),
        ParamValue::String(s) => format!("\"{s}\""),
    }
}

/// Parse the value portion of a line according to the kind of `current`.
///
/// `rest` still carries any trailing comment, which is stripped here
/// (after the closing quote for strings).
fn parse_value(current: &ParamValue, rest: &str, line: usize) -> CipResult<ParamValue> {
    let bad = |msg: &str| CipError::Parse {
        line,
        msg: msg.into(),
    };

    if let ParamValue::String(_) = current {
        // Strings must be double-quoted; escapes are literal.
        let rest = rest.trim_start();
        if !rest.starts_with('"') {
            return Err(bad("string value must be double-quoted"));
        }
        let body = &rest[1..];
        let close = body.find('"').ok_or_else(|| bad("unterminated string"))?;
        let tail = body[close + 1..].trim();
        if !tail.is_empty() && !tail.starts_with('#') {
            return Err(bad("trailing characters after string value"));
        }
        return Ok(ParamValue::String(body[..close].to_owned()));
    }

    // For all other kinds a comment starts at the first `#`.
    let token = match rest.find('#') {
        Some(pos) => rest[..pos].trim(),
        None => rest.trim(),
    };
    if token.is_empty() {
        return Err(bad("missing value"));
    }

    match current {
        ParamValue::Bool(_) => match token.to_ascii_uppercase().as_str() {
            "TRUE" => Ok(ParamValue::Bool(true)),
            "FALSE" => Ok(ParamValue::Bool(false)),
            _ => Err(bad("boolean must be TRUE or FALSE")),
        },
        ParamValue::Int(_) => token
            .parse::<i32>()
            .map(ParamValue::Int)
            .map_err(|_| bad("invalid integer")),
        ParamValue::LongInt(_) => token
            .parse::<i64>()
            .map(ParamValue::LongInt)
            .map_err(|_| bad("invalid integer")),
        ParamValue::Real(_) => token
            .parse::<f64>()
            .map(ParamValue::Real)
            .map_err(|_| bad("invalid real")),
        ParamValue::Char(_) => {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_control() => Ok(ParamValue::Char(c)),
                _ => Err(bad("expected a single printable character")),
            }
        }
        ParamValue::String(_) => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> ParamStore {
        let mut store = ParamStore::new();
        store.add_bool("misc/catchctrlc", "catch interrupts", true).unwrap();
        store
            .add_int("separating/maxrounds", "maximal separation rounds", 5, -1, 1000)
            .unwrap();
        store
            .add_longint("limits/nodes", "node limit", -1, -1, i64::MAX)
            .unwrap();
        store
            .add_real("limits/time", "time limit in seconds", 1e20, 0.0, 1e20)
            .unwrap();
        store.add_char("branching/firstdir", "first direction", 'a', "adu").unwrap();
        store.add_string("vbc/filename", "output file", "-").unwrap();
        store
    }

    #[test]
    fn test_read_basic_lines() {
        let mut store = sample_store();
        store
            .read_str(
                "# a comment\n\
                 misc/catchctrlc = false\n\
                 separating/maxrounds = 12   # trailing comment\n\
                 limits/time = 3600.5\n\
                 vbc/filename = \"out # not a comment\"\n",
            )
            .unwrap();

        assert!(!store.get_bool("misc/catchctrlc").unwrap());
        assert_eq!(store.get_int("separating/maxrounds").unwrap(), 12);
        assert_eq!(store.get_real("limits/time").unwrap(), 3600.5);
        assert_eq!(
            store.get_string("vbc/filename").unwrap(),
            "out # not a comment"
        );
    }

    #[test]
    fn test_unknown_name_skipped() {
        let mut store = sample_store();
        store
            .read_str("does/not/exist = 3\nseparating/maxrounds = 7\n")
            .unwrap();
        assert_eq!(store.get_int("separating/maxrounds").unwrap(), 7);
    }

    #[test]
    fn test_malformed_value_reports_line() {
        let mut store = sample_store();
        let err = store
            .read_str("misc/catchctrlc = true\nseparating/maxrounds = many\n")
            .unwrap_err();
        match err {
            CipError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let mut store = sample_store();
        let err = store.read_str("separating/maxrounds = -5\n").unwrap_err();
        assert!(matches!(err, CipError::ParameterWrongValue(_)));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let mut store = sample_store();
        store.set_bool("misc/catchctrlc", false).unwrap();
        store.set_int("separating/maxrounds", 42).unwrap();
        store.set_real("limits/time", 0.125).unwrap();
        store.set_char("branching/firstdir", 'u').unwrap();
        store.set_string("vbc/filename", "tree.vbc").unwrap();

        let text = store.write_str();

        let mut other = sample_store();
        other.read_str(&text).unwrap();
        for param in store.iter() {
            assert_eq!(
                other.get(param.name()).unwrap().current(),
                param.current(),
                "mismatch for {}",
                param.name()
            );
        }
    }
}
