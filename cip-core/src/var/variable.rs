//! Problem variables: kinds, bounds, aggregation, variable bounds.

use crate::error::{CipError, CipResult};

use super::domain::{Domain, FEASTOL};

/// Index of a variable inside its problem space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Binary variable with implicit `[0, 1]` bounds.
    Binary,

    /// General integer variable.
    Integer,

    /// Continuous variable that is integral in every optimal solution.
    ImplInt,

    /// Continuous variable.
    Continuous,
}

impl VarKind {
    /// True for the kinds whose solutions must be integral.
    pub fn is_integral(&self) -> bool {
        matches!(self, VarKind::Binary | VarKind::Integer | VarKind::ImplInt)
    }
}

/// Status of a variable in the transformed space.
#[derive(Debug, Clone, PartialEq)]
pub enum VarStatus {
    /// Lives in the original problem space.
    Original,

    /// Active column of the transformed problem.
    Active,

    /// Fixed to a value during presolve.
    Fixed(f64),

    /// Aggregated: `x = scalar * y + constant`.
    Aggregated {
        /// The active variable `y`.
        var: VarId,
        /// Multiplier `a`.
        scalar: f64,
        /// Offset `b`.
        constant: f64,
    },

    /// Multi-aggregated: `x = sum_i scalars[i] * vars[i] + constant`.
    MultiAggregated {
        /// The aggregation variables.
        vars: Vec<VarId>,
        /// Their multipliers.
        scalars: Vec<f64>,
        /// Constant offset.
        constant: f64,
    },

    /// Negation of another variable: `x = constant - y`.
    Negated {
        /// The negation counterpart `y`.
        var: VarId,
        /// Offset, `1` for binaries.
        constant: f64,
    },
}

impl VarStatus {
    /// True if the variable participates directly in the transformed
    /// problem.
    pub fn is_active(&self) -> bool {
        matches!(self, VarStatus::Active)
    }
}

/// A variable bound relation `x >= coef * z + constant` (lower side) or
/// `x <= coef * z + constant` (upper side), with `z` binary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarBoundRel {
    /// The binary bounding variable `z`.
    pub zvar: VarId,

    /// Coefficient of `z`.
    pub coef: f64,

    /// Constant offset.
    pub constant: f64,
}

/// A problem variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Stable index within its problem space.
    pub id: VarId,

    /// Variable name.
    pub name: String,

    /// Kind (binary, integer, implicit integer, continuous).
    pub kind: VarKind,

    /// Objective coefficient.
    pub obj: f64,

    /// Global domain (root bounds and holes).
    pub global: Domain,

    /// Local domain at the current focus node.
    pub local: Domain,

    /// Status in the transformed space.
    pub status: VarStatus,

    /// For a transformed variable: its original counterpart.
    pub original: Option<VarId>,

    /// For an original variable: its transformed counterpart.
    pub transformed: Option<VarId>,

    /// Variable lower bounds `x >= a * z + b`.
    pub vlbs: Vec<VarBoundRel>,

    /// Variable upper bounds `x <= a * z + b`.
    pub vubs: Vec<VarBoundRel>,

    /// Number of constraints blocking rounding down.
    pub nlocksdown: u32,

    /// Number of constraints blocking rounding up.
    pub nlocksup: u32,

    /// Branching priority: rules prefer higher values on ties.
    pub branch_priority: i32,
}

impl Variable {
    /// Create an original-space variable.
    pub fn new(id: VarId, name: impl Into<String>, kind: VarKind, obj: f64, lb: f64, ub: f64) -> CipResult<Self> {
        let (lb, ub) = match kind {
            VarKind::Binary => (lb.max(0.0), ub.min(1.0)),
            _ => (lb, ub),
        };
        let global = Domain::new(lb, ub)?;
        let var = Variable {
            id,
            name: name.into(),
            kind,
            obj,
            local: global.clone(),
            global,
            status: VarStatus::Original,
            original: None,
            transformed: None,
            vlbs: Vec::new(),
            vubs: Vec::new(),
            nlocksdown: 0,
            nlocksup: 0,
            branch_priority: 0,
        };
        var.check_integral_bounds()?;
        Ok(var)
    }

    /// Global bounds of integer kinds must be integral or infinite.
    fn check_integral_bounds(&self) -> CipResult<()> {
        if !self.kind.is_integral() {
            return Ok(());
        }
        for bound in [self.global.lb, self.global.ub] {
            if bound.is_finite() && (bound - bound.round()).abs() > FEASTOL {
                return Err(CipError::InvalidData(format!(
                    "fractional global bound {bound} on integer variable {}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// True if the variable is an active column of the transformed
    /// problem.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True if rounding the variable down can never violate a constraint.
    pub fn may_round_down(&self) -> bool {
        self.nlocksdown == 0
    }

    /// True if rounding the variable up can never violate a constraint.
    pub fn may_round_up(&self) -> bool {
        self.nlocksup == 0
    }

    /// Add rounding locks. Negative amounts remove locks.
    pub fn add_locks(&mut self, down: i32, up: i32) {
        self.nlocksdown = (self.nlocksdown as i32 + down).max(0) as u32;
        self.nlocksup = (self.nlocksup as i32 + up).max(0) as u32;
    }

    /// Local lower bound.
    pub fn lb(&self) -> f64 {
        self.local.lb
    }

    /// Local upper bound.
    pub fn ub(&self) -> f64 {
        self.local.ub
    }

    /// Distance of `value` to the nearest integer.
    pub fn fractionality(value: f64) -> f64 {
        let frac = value - value.floor();
        frac.min(1.0 - frac)
    }

    /// Add a variable lower bound `x >= coef * z + constant`.
    ///
    /// Only admitted when the implied bound is strictly tighter than the
    /// unconditional lower bound for at least one value of `z`; redundant
    /// relations are rejected so the lists stay meaningful for separators
    /// and propagators.
    pub fn add_vlb(&mut self, rel: VarBoundRel) -> CipResult<bool> {
        // Implied bound at z = 1 resp. z = 0; the better of the two must
        // beat the global lower bound.
        let implied = (rel.coef + rel.constant).max(rel.constant);
        if implied <= self.global.lb + FEASTOL {
            return Ok(false);
        }
        if self.vlbs.iter().any(|r| *r == rel) {
            return Ok(false);
        }
        self.vlbs.push(rel);
        Ok(true)
    }

    /// Add a variable upper bound `x <= coef * z + constant`.
    pub fn add_vub(&mut self, rel: VarBoundRel) -> CipResult<bool> {
        let implied = (rel.coef + rel.constant).min(rel.constant);
        if implied >= self.global.ub - FEASTOL {
            return Ok(false);
        }
        if self.vubs.iter().any(|r| *r == rel) {
            return Ok(false);
        }
        self.vubs.push(rel);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_bounds_clipped() {
        let v = Variable::new(VarId(0), "b", VarKind::Binary, 1.0, -3.0, 7.0).unwrap();
        assert_eq!(v.global.lb, 0.0);
        assert_eq!(v.global.ub, 1.0);
    }

    #[test]
    fn test_fractional_integer_bound_rejected() {
        assert!(Variable::new(VarId(0), "i", VarKind::Integer, 0.0, 0.5, 3.0).is_err());
        assert!(Variable::new(VarId(0), "i", VarKind::Integer, 0.0, 0.0, f64::INFINITY).is_ok());
    }

    #[test]
    fn test_locks_and_roundability() {
        let mut v = Variable::new(VarId(0), "x", VarKind::Integer, 1.0, 0.0, 5.0).unwrap();
        assert!(v.may_round_down() && v.may_round_up());

        v.add_locks(1, 0);
        assert!(!v.may_round_down());
        assert!(v.may_round_up());

        v.add_locks(-1, 0);
        assert!(v.may_round_down());
    }

    #[test]
    fn test_redundant_vlb_rejected() {
        let mut v = Variable::new(VarId(1), "x", VarKind::Continuous, 0.0, 0.0, 10.0).unwrap();

        // x >= -1 * z + 0 implies at best 0: redundant against lb = 0.
        let redundant = VarBoundRel { zvar: VarId(0), coef: -1.0, constant: 0.0 };
        assert!(!v.add_vlb(redundant).unwrap());

        // x >= 2 * z + 1 implies 3 at z = 1: tighter than lb = 0.
        let useful = VarBoundRel { zvar: VarId(0), coef: 2.0, constant: 1.0 };
        assert!(v.add_vlb(useful).unwrap());
        assert_eq!(v.vlbs.len(), 1);

        // Duplicates are dropped.
        assert!(!v.add_vlb(useful).unwrap());
    }

    #[test]
    fn test_fractionality() {
        assert!((Variable::fractionality(2.3) - 0.3).abs() < 1e-12);
        assert!((Variable::fractionality(2.7) - 0.3).abs() < 1e-12);
        assert!(Variable::fractionality(4.0) < 1e-12);
    }
}
