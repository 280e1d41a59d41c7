//! Problem data: variable spaces, objective, transformation.

use crate::error::{CipError, CipResult};
use crate::var::{Domain, VarId, VarKind, VarStatus, Variable, FEASTOL};

/// Objective sense of the original problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjSense {
    /// Minimize the objective (internal canonical form).
    #[default]
    Minimize,

    /// Maximize the objective; transformed internally to minimization.
    Maximize,
}

/// Problem data: original variables, their transformed counterparts, and
/// the objective.
///
/// The transformed space is created once when presolve starts; presolve
/// then mutates it through fixings and aggregations. Original variables
/// are never touched after transformation.
#[derive(Debug, Default)]
pub struct Prob {
    /// Problem name.
    pub name: String,

    /// Variable arena: original variables first, transformed appended by
    /// [`Prob::transform`].
    vars: Vec<Variable>,

    /// Ids of original-space variables.
    orig_vars: Vec<VarId>,

    /// Ids of transformed-space variables (any status).
    trans_vars: Vec<VarId>,

    /// Objective sense of the original problem.
    pub objsense: ObjSense,

    /// Constant objective contribution collected from fixings and
    /// aggregations, in the transformed (minimization) space.
    pub obj_offset: f64,

    /// Whether [`Prob::transform`] ran.
    transformed: bool,
}

impl Prob {
    /// Create an empty problem.
    pub fn new(name: impl Into<String>) -> Self {
        Prob {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of variables in the arena (both spaces).
    pub fn nvars_total(&self) -> usize {
        self.vars.len()
    }

    /// Original-space variable ids.
    pub fn orig_vars(&self) -> &[VarId] {
        &self.orig_vars
    }

    /// Transformed-space variable ids.
    pub fn trans_vars(&self) -> &[VarId] {
        &self.trans_vars
    }

    /// Ids of active transformed variables (the LP columns).
    pub fn active_vars(&self) -> Vec<VarId> {
        self.trans_vars
            .iter()
            .copied()
            .filter(|&v| self.vars[v.0].is_active())
            .collect()
    }

    /// True once the transformed space exists.
    pub fn is_transformed(&self) -> bool {
        self.transformed
    }

    /// Access a variable.
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    /// Access a variable mutably.
    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }

    /// Add an original-space variable. Only permitted before
    /// transformation.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        obj: f64,
        lb: f64,
        ub: f64,
    ) -> CipResult<VarId> {
        if self.transformed {
            return Err(CipError::InvalidData(
                "cannot add original variables after transformation".into(),
            ));
        }
        let id = VarId(self.vars.len());
        self.vars.push(Variable::new(id, name, kind, obj, lb, ub)?);
        self.orig_vars.push(id);
        Ok(id)
    }

    /// Add a variable directly to the transformed space (pricing).
    ///
    /// The objective is taken in the internal minimization sense.
    pub fn add_trans_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        obj: f64,
        lb: f64,
        ub: f64,
    ) -> CipResult<VarId> {
        if !self.transformed {
            return Err(CipError::InvalidData(
                "transformed variables require a transformed problem".into(),
            ));
        }
        let id = VarId(self.vars.len());
        let mut var = Variable::new(id, name, kind, obj, lb, ub)?;
        var.status = VarStatus::Active;
        self.vars.push(var);
        self.trans_vars.push(id);
        Ok(id)
    }

    /// Create the transformed space: one active counterpart per original
    /// variable, objective flipped to minimization if needed.
    pub fn transform(&mut self) -> CipResult<()> {
        if self.transformed {
            return Err(CipError::InvalidData("problem transformed twice".into()));
        }
        let sign = match self.objsense {
            ObjSense::Minimize => 1.0,
            ObjSense::Maximize => -1.0,
        };
        let originals = self.orig_vars.clone();
        for orig_id in originals {
            let id = VarId(self.vars.len());
            let orig = &self.vars[orig_id.0];
            let mut tvar = Variable::new(
                id,
                format!("t_{}", orig.name),
                orig.kind,
                sign * orig.obj,
                orig.global.lb,
                orig.global.ub,
            )?;
            tvar.status = VarStatus::Active;
            tvar.original = Some(orig_id);
            tvar.branch_priority = orig.branch_priority;
            self.vars.push(tvar);
            self.vars[orig_id.0].transformed = Some(id);
            self.trans_vars.push(id);
        }
        self.transformed = true;
        Ok(())
    }

    /// Map a transformed objective value back to the original sense.
    pub fn external_obj(&self, internal: f64) -> f64 {
        match self.objsense {
            ObjSense::Minimize => internal,
            ObjSense::Maximize => -internal,
        }
    }

    /// Change a global bound. Permitted only outside search (the engine
    /// gates the stage); rejected on non-active, non-original variables.
    pub fn set_global_lb(&mut self, id: VarId, lb: f64) -> CipResult<()> {
        self.set_global_bound(id, lb, true)
    }

    /// Change a global upper bound; see [`Prob::set_global_lb`].
    pub fn set_global_ub(&mut self, id: VarId, ub: f64) -> CipResult<()> {
        self.set_global_bound(id, ub, false)
    }

    fn set_global_bound(&mut self, id: VarId, bound: f64, lower: bool) -> CipResult<()> {
        let var = &mut self.vars[id.0];
        if !matches!(var.status, VarStatus::Active | VarStatus::Original) {
            return Err(CipError::InvalidData(format!(
                "bound change on aggregated variable {}",
                var.name
            )));
        }
        let bound = if var.kind.is_integral() && bound.is_finite() {
            if lower {
                bound.ceil()
            } else {
                bound.floor()
            }
        } else {
            bound
        };
        let (new_lb, new_ub) = if lower {
            (bound, var.global.ub)
        } else {
            (var.global.lb, bound)
        };
        if new_lb > new_ub + FEASTOL {
            return Err(CipError::InvalidData(format!(
                "global bounds of {} crossed: [{new_lb}, {new_ub}]",
                var.name
            )));
        }
        var.global.lb = new_lb;
        var.global.ub = new_ub;
        var.global.clip_holes();
        var.local.lb = var.local.lb.max(new_lb);
        var.local.ub = var.local.ub.min(new_ub);
        var.local.clip_holes();
        Ok(())
    }

    /// Fix a transformed variable to `value` (presolve only).
    ///
    /// Returns `(infeasible, fixed)`: `infeasible` when the value is
    /// outside the domain, `fixed = false` when the variable was already
    /// fixed to the same value.
    pub fn fix_var(&mut self, id: VarId, value: f64) -> CipResult<(bool, bool)> {
        let var = &self.vars[id.0];
        match &var.status {
            VarStatus::Fixed(v) => {
                let same = (v - value).abs() <= FEASTOL;
                return Ok((!same, false));
            }
            VarStatus::Active => {}
            _ => {
                return Err(CipError::InvalidData(format!(
                    "cannot fix aggregated variable {}",
                    var.name
                )))
            }
        }
        if !value.is_finite() || !var.global.contains(value) {
            return Ok((true, false));
        }
        if var.kind.is_integral() && (value - value.round()).abs() > FEASTOL {
            return Ok((true, false));
        }

        let obj = var.obj;
        let var = &mut self.vars[id.0];
        var.status = VarStatus::Fixed(value);
        var.global = Domain::new(value, value)?;
        var.local = var.global.clone();
        self.obj_offset += obj * value;
        var.obj = 0.0;
        Ok((false, true))
    }

    /// Aggregate `x := scalar * y + constant` (presolve only).
    ///
    /// The objective of `x` is folded into `y` and the offset; the
    /// aggregation chain is checked for cycles.
    pub fn aggregate_var(
        &mut self,
        x: VarId,
        y: VarId,
        scalar: f64,
        constant: f64,
    ) -> CipResult<()> {
        if x == y || scalar == 0.0 {
            return Err(CipError::InvalidData(format!(
                "degenerate aggregation of {}",
                self.vars[x.0].name
            )));
        }
        if !self.vars[x.0].is_active() {
            return Err(CipError::InvalidData(format!(
                "cannot aggregate non-active variable {}",
                self.vars[x.0].name
            )));
        }
        // Walking y's chain must not reach x.
        if self.chain_reaches(y, x)? {
            return Err(CipError::InvalidData(format!(
                "aggregation cycle through {}",
                self.vars[x.0].name
            )));
        }

        let obj_x = self.vars[x.0].obj;
        self.vars[y.0].obj += scalar * obj_x;
        self.obj_offset += constant * obj_x;

        let var = &mut self.vars[x.0];
        var.obj = 0.0;
        var.status = VarStatus::Aggregated {
            var: y,
            scalar,
            constant,
        };
        Ok(())
    }

    /// True if following aggregation links from `start` reaches `target`.
    fn chain_reaches(&self, start: VarId, target: VarId) -> CipResult<bool> {
        let mut current = start;
        let mut steps = 0usize;
        loop {
            if current == target {
                return Ok(true);
            }
            steps += 1;
            if steps > self.vars.len() {
                return Err(CipError::InvalidData(
                    "cycle in aggregation chain".into(),
                ));
            }
            current = match &self.vars[current.0].status {
                VarStatus::Aggregated { var, .. } | VarStatus::Negated { var, .. } => *var,
                _ => return Ok(false),
            };
        }
    }

    /// Resolve the value of any variable under an assignment of the
    /// active variables, expanding the aggregation chain.
    pub fn resolve_value(&self, id: VarId, assign: &dyn Fn(VarId) -> f64) -> CipResult<f64> {
        self.resolve_rec(id, assign, 0)
    }

    fn resolve_rec(&self, id: VarId, assign: &dyn Fn(VarId) -> f64, depth: usize) -> CipResult<f64> {
        if depth > self.vars.len() {
            return Err(CipError::InvalidData(
                "cycle in aggregation chain".into(),
            ));
        }
        let var = &self.vars[id.0];
        match &var.status {
            VarStatus::Active => Ok(assign(id)),
            VarStatus::Original => match var.transformed {
                Some(t) => self.resolve_rec(t, assign, depth + 1),
                None => Ok(assign(id)),
            },
            VarStatus::Fixed(v) => Ok(*v),
            VarStatus::Aggregated {
                var: y,
                scalar,
                constant,
            } => Ok(scalar * self.resolve_rec(*y, assign, depth + 1)? + constant),
            VarStatus::MultiAggregated {
                vars,
                scalars,
                constant,
            } => {
                let mut value = *constant;
                for (v, a) in vars.iter().zip(scalars.iter()) {
                    value += a * self.resolve_rec(*v, assign, depth + 1)?;
                }
                Ok(value)
            }
            VarStatus::Negated { var: y, constant } => {
                Ok(constant - self.resolve_rec(*y, assign, depth + 1)?)
            }
        }
    }

    /// The pseudo solution value of a transformed variable: the bound
    /// implied by its objective direction.
    pub fn pseudo_value(&self, id: VarId) -> f64 {
        let var = &self.vars[id.0];
        if var.obj >= 0.0 {
            var.local.lb
        } else {
            var.local.ub
        }
    }

    /// Objective value of the pseudo solution; `-inf` when a nonzero
    /// objective variable has the relevant bound at infinity.
    pub fn pseudo_obj(&self) -> f64 {
        let mut value = self.obj_offset;
        for &id in &self.trans_vars {
            let var = &self.vars[id.0];
            if !var.is_active() || var.obj == 0.0 {
                continue;
            }
            let bound = self.pseudo_value(id);
            if !bound.is_finite() {
                return f64::NEG_INFINITY;
            }
            value += var.obj * bound;
        }
        value
    }

    /// Transformed-space objective of an assignment of active variables.
    pub fn obj_value(&self, assign: &dyn Fn(VarId) -> f64) -> f64 {
        let mut value = self.obj_offset;
        for &id in &self.trans_vars {
            let var = &self.vars[id.0];
            if var.is_active() && var.obj != 0.0 {
                value += var.obj * assign(id);
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_var_prob() -> Prob {
        let mut prob = Prob::new("test");
        prob.add_var("x", VarKind::Binary, 1.0, 0.0, 1.0).unwrap();
        prob.add_var("y", VarKind::Integer, 2.0, 0.0, 10.0).unwrap();
        prob.transform().unwrap();
        prob
    }

    #[test]
    fn test_transform_links() {
        let prob = two_var_prob();
        assert_eq!(prob.orig_vars().len(), 2);
        assert_eq!(prob.trans_vars().len(), 2);

        let orig = prob.var(prob.orig_vars()[0]);
        let trans = prob.var(orig.transformed.unwrap());
        assert_eq!(trans.original, Some(orig.id));
        assert!(trans.is_active());
        assert_eq!(trans.obj, orig.obj);
    }

    #[test]
    fn test_maximize_flips_objective() {
        let mut prob = Prob::new("max");
        prob.objsense = ObjSense::Maximize;
        prob.add_var("x", VarKind::Continuous, 3.0, 0.0, 1.0).unwrap();
        prob.transform().unwrap();

        let t = prob.trans_vars()[0];
        assert_eq!(prob.var(t).obj, -3.0);
        assert_eq!(prob.external_obj(-3.0), 3.0);
    }

    #[test]
    fn test_fixing_moves_objective_to_offset() {
        let mut prob = two_var_prob();
        let y = prob.trans_vars()[1];
        let (infeas, fixed) = prob.fix_var(y, 4.0).unwrap();
        assert!(!infeas && fixed);
        assert_eq!(prob.obj_offset, 8.0);
        assert_eq!(prob.var(y).obj, 0.0);
        assert_eq!(prob.active_vars().len(), 1);

        // Fixing again to the same value is a no-op.
        assert_eq!(prob.fix_var(y, 4.0).unwrap(), (false, false));
        // Conflicting value reports infeasibility.
        assert_eq!(prob.fix_var(y, 5.0).unwrap(), (true, false));
    }

    #[test]
    fn test_fix_outside_domain_infeasible() {
        let mut prob = two_var_prob();
        let x = prob.trans_vars()[0];
        assert_eq!(prob.fix_var(x, 2.0).unwrap(), (true, false));
    }

    #[test]
    fn test_aggregation_resolution_and_cycle() {
        let mut prob = two_var_prob();
        let x = prob.trans_vars()[0];
        let y = prob.trans_vars()[1];

        // x := 2 y + 1
        prob.aggregate_var(x, y, 2.0, 1.0).unwrap();
        let value = prob.resolve_value(x, &|v| if v == y { 3.0 } else { 0.0 }).unwrap();
        assert_eq!(value, 7.0);

        // Objective folded: obj_x was 1, so obj_y grows by 2.
        assert_eq!(prob.var(y).obj, 4.0);
        assert_eq!(prob.obj_offset, 1.0);

        // y := a x + b would close a cycle.
        assert!(prob.aggregate_var(y, x, 1.0, 0.0).is_err());
        // Bound changes on the aggregated variable are rejected.
        assert!(prob.set_global_lb(x, 0.5).is_err());
    }

    #[test]
    fn test_pseudo_objective() {
        let mut prob = Prob::new("pseudo");
        prob.add_var("a", VarKind::Continuous, 1.0, 2.0, 9.0).unwrap();
        prob.add_var("b", VarKind::Continuous, -1.0, 0.0, 4.0).unwrap();
        prob.transform().unwrap();

        // a sits at its lower bound 2, b at its upper bound 4.
        assert_eq!(prob.pseudo_obj(), 2.0 - 4.0);

        let mut unbounded = Prob::new("ray");
        unbounded
            .add_var("c", VarKind::Continuous, -1.0, 0.0, f64::INFINITY)
            .unwrap();
        unbounded.transform().unwrap();
        assert_eq!(unbounded.pseudo_obj(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_integral_global_bound_rounding() {
        let mut prob = two_var_prob();
        let y = prob.trans_vars()[1];
        prob.set_global_lb(y, 1.2).unwrap();
        assert_eq!(prob.var(y).global.lb, 2.0);
        prob.set_global_ub(y, 7.8).unwrap();
        assert_eq!(prob.var(y).global.ub, 7.0);
    }
}
