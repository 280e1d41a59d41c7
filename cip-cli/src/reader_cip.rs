//! Reader for the plain-text `cip` problem format.
//!
//! Line-oriented, `#` starts a comment:
//!
//! ```text
//! problem cover
//! minimize
//! var x binary 0 1 1
//! var y binary 0 1 1
//! cons c1 1 inf x 1 y 1
//! ```
//!
//! `var <name> <kind> <lb> <ub> <obj>` declares a variable, `cons
//! <name> <lhs> <rhs> (<var> <coef>)...` a linear constraint. Bounds and
//! sides accept `inf` and `-inf`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cip_core::plugins::Reader;
use cip_core::{CipError, CipResult, Engine, ObjSense, VarId, VarKind};

/// The `cip` format reader.
#[derive(Debug, Default)]
pub struct CipReader;

fn parse_num(token: &str, line: usize) -> CipResult<f64> {
    match token {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        _ => token.parse::<f64>().map_err(|_| CipError::Parse {
            line,
            msg: format!("invalid number <{token}>"),
        }),
    }
}

fn parse_kind(token: &str, line: usize) -> CipResult<VarKind> {
    match token {
        "binary" => Ok(VarKind::Binary),
        "integer" => Ok(VarKind::Integer),
        "implint" => Ok(VarKind::ImplInt),
        "continuous" => Ok(VarKind::Continuous),
        _ => Err(CipError::Parse {
            line,
            msg: format!("unknown variable kind <{token}>"),
        }),
    }
}

impl Reader for CipReader {
    fn name(&self) -> &'static str {
        "cipreader"
    }

    fn desc(&self) -> &'static str {
        "plain-text problem reader"
    }

    fn extension(&self) -> &'static str {
        "cip"
    }

    fn read(&mut self, engine: &mut Engine, path: &Path) -> CipResult<()> {
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CipError::NoFile(path.display().to_string())
            } else {
                CipError::Read(format!("{}: {e}", path.display()))
            }
        })?;

        engine.create_prob(
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed"),
        )?;
        let mut vars: HashMap<String, VarId> = HashMap::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = lineno + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            match tokens[0] {
                "problem" => {}
                "minimize" => engine.set_obj_sense(ObjSense::Minimize),
                "maximize" => engine.set_obj_sense(ObjSense::Maximize),
                "var" => {
                    if tokens.len() != 6 {
                        return Err(CipError::Parse {
                            line,
                            msg: "expected `var <name> <kind> <lb> <ub> <obj>`".into(),
                        });
                    }
                    let kind = parse_kind(tokens[2], line)?;
                    let lb = parse_num(tokens[3], line)?;
                    let ub = parse_num(tokens[4], line)?;
                    let obj = parse_num(tokens[5], line)?;
                    let id = engine.add_var(tokens[1], kind, obj, lb, ub)?;
                    vars.insert(tokens[1].to_owned(), id);
                }
                "cons" => {
                    if tokens.len() < 4 || tokens.len() % 2 != 0 {
                        return Err(CipError::Parse {
                            line,
                            msg: "expected `cons <name> <lhs> <rhs> (<var> <coef>)...`".into(),
                        });
                    }
                    let lhs = parse_num(tokens[2], line)?;
                    let rhs = parse_num(tokens[3], line)?;
                    let mut entries = Vec::new();
                    for pair in tokens[4..].chunks(2) {
                        let var = vars.get(pair[0]).ok_or_else(|| CipError::Parse {
                            line,
                            msg: format!("unknown variable <{}>", pair[0]),
                        })?;
                        entries.push((*var, parse_num(pair[1], line)?));
                    }
                    engine.add_linear_cons(tokens[1], &entries, lhs, rhs)?;
                }
                other => {
                    return Err(CipError::Parse {
                        line,
                        msg: format!("unknown keyword <{other}>"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip_core::SolveStatus;

    fn write_temp(tag: &str, content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("cip-reader-{tag}-{}.cip", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_and_solve_cover() {
        let path = write_temp(
            "cover",
            "# simple covering problem\n\
             problem cover\n\
             minimize\n\
             var x binary 0 1 1\n\
             var y binary 0 1 1\n\
             cons c1 1 inf x 1 y 1\n",
        );

        let mut engine = Engine::new().unwrap();
        engine.include_reader(Box::new(CipReader)).unwrap();
        engine.read_problem(&path).unwrap();
        let status = engine.solve().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(status, SolveStatus::Optimal);
        assert!((engine.primal_bound() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_line_reports_number() {
        let path = write_temp("malformed", "var x binary 0 1\n");
        let mut engine = Engine::new().unwrap();
        engine.include_reader(Box::new(CipReader)).unwrap();
        let err = engine.read_problem(&path).unwrap_err();
        fs::remove_file(&path).ok();
        match err {
            CipError::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
