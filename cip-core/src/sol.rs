//! Feasible solutions and the solution store.

use std::collections::HashMap;

use crate::prob::Prob;
use crate::var::VarId;

/// Where a solution came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolOrigin {
    /// Found by a primal heuristic (carries the heuristic name).
    Heuristic(String),

    /// Integral LP relaxation solution.
    Lp,

    /// Integer-feasible pseudo solution.
    Pseudo,

    /// Unbounded primal ray (not a feasible point).
    Ray,

    /// Supplied from outside the engine.
    External,
}

/// A sparse assignment of transformed variables. Missing entries are
/// zero.
#[derive(Debug, Clone)]
pub struct Solution {
    values: HashMap<VarId, f64>,

    /// Origin tag.
    pub origin: SolOrigin,

    /// Objective value in the transformed (minimization) space.
    pub obj: f64,
}

impl Solution {
    /// Create an empty solution.
    pub fn new(origin: SolOrigin) -> Self {
        Solution {
            values: HashMap::new(),
            origin,
            obj: 0.0,
        }
    }

    /// Set the value of an active variable. Zeros are stored sparsely.
    pub fn set(&mut self, var: VarId, value: f64) {
        if value == 0.0 {
            self.values.remove(&var);
        } else {
            self.values.insert(var, value);
        }
    }

    /// Raw stored value of an active variable (zero if absent).
    pub fn raw(&self, var: VarId) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Value of any variable, expanding fixings and aggregations.
    pub fn value(&self, prob: &Prob, var: VarId) -> f64 {
        prob.resolve_value(var, &|v| self.raw(v))
            .unwrap_or(f64::NAN)
    }

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Recompute the transformed objective from the problem.
    pub fn recompute_obj(&mut self, prob: &Prob) {
        let values = &self.values;
        self.obj = prob.obj_value(&|v| values.get(&v).copied().unwrap_or(0.0));
    }

    /// Objective value in the original problem space.
    pub fn obj_external(&self, prob: &Prob) -> f64 {
        prob.external_obj(self.obj)
    }
}

/// Pool of feasible solutions ordered by objective, best first.
#[derive(Debug)]
pub struct SolStore {
    sols: Vec<Solution>,
    max_sols: usize,

    /// Solutions offered to the store.
    pub n_offered: u64,

    /// Solutions accepted into the pool.
    pub n_accepted: u64,

    /// Incumbent improvements.
    pub n_improvements: u64,
}

impl SolStore {
    /// Create a store keeping at most `max_sols` solutions.
    pub fn new(max_sols: usize) -> Self {
        SolStore {
            sols: Vec::new(),
            max_sols: max_sols.max(1),
            n_offered: 0,
            n_accepted: 0,
            n_improvements: 0,
        }
    }

    /// Best known solution.
    pub fn best(&self) -> Option<&Solution> {
        self.sols.first()
    }

    /// Objective of the incumbent, `+inf` without one.
    pub fn upper_bound(&self) -> f64 {
        self.sols.first().map_or(f64::INFINITY, |s| s.obj)
    }

    /// Number of stored solutions.
    pub fn len(&self) -> usize {
        self.sols.len()
    }

    /// True if no solution is stored.
    pub fn is_empty(&self) -> bool {
        self.sols.is_empty()
    }

    /// All stored solutions, best first.
    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.sols.iter()
    }

    /// Insert a checked-feasible solution.
    ///
    /// Returns true if it became the new incumbent. The pool keeps the
    /// best `max_sols` by transformed objective.
    pub fn add(&mut self, sol: Solution) -> bool {
        self.n_offered += 1;
        let improved = sol.obj < self.upper_bound() - 1e-9;

        let pos = self
            .sols
            .partition_point(|s| s.obj <= sol.obj);
        if pos >= self.max_sols {
            return false;
        }
        self.sols.insert(pos, sol);
        self.sols.truncate(self.max_sols);
        self.n_accepted += 1;
        if improved {
            self.n_improvements += 1;
        }
        improved
    }

    /// Drop solutions worse than `bound` (after an objective tightening).
    pub fn prune(&mut self, bound: f64) {
        self.sols.retain(|s| s.obj <= bound + 1e-9);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarKind;

    #[test]
    fn test_sparse_values() {
        let mut sol = Solution::new(SolOrigin::External);
        sol.set(VarId(3), 2.5);
        sol.set(VarId(5), 0.0);

        assert_eq!(sol.raw(VarId(3)), 2.5);
        assert_eq!(sol.raw(VarId(5)), 0.0);
        assert_eq!(sol.raw(VarId(9)), 0.0);
        assert_eq!(sol.nnz(), 1);
    }

    #[test]
    fn test_value_resolves_aggregation() {
        let mut prob = Prob::new("p");
        prob.add_var("x", VarKind::Continuous, 0.0, 0.0, 10.0).unwrap();
        prob.add_var("y", VarKind::Continuous, 0.0, 0.0, 10.0).unwrap();
        prob.transform().unwrap();
        let tx = prob.trans_vars()[0];
        let ty = prob.trans_vars()[1];
        prob.aggregate_var(tx, ty, 3.0, 1.0).unwrap();

        let mut sol = Solution::new(SolOrigin::Lp);
        sol.set(ty, 2.0);
        assert_eq!(sol.value(&prob, tx), 7.0);
    }

    #[test]
    fn test_store_ordering_and_capacity() {
        let mut store = SolStore::new(2);

        let mut s1 = Solution::new(SolOrigin::External);
        s1.obj = 5.0;
        let mut s2 = Solution::new(SolOrigin::External);
        s2.obj = 3.0;
        let mut s3 = Solution::new(SolOrigin::External);
        s3.obj = 4.0;

        assert!(store.add(s1));
        assert!(store.add(s2));
        assert_eq!(store.upper_bound(), 3.0);

        // Not improving, but better than the worst stored: replaces it.
        assert!(!store.add(s3));
        assert_eq!(store.len(), 2);
        let objs: Vec<f64> = store.iter().map(|s| s.obj).collect();
        assert_eq!(objs, vec![3.0, 4.0]);
    }

    #[test]
    fn test_worse_than_pool_rejected() {
        let mut store = SolStore::new(1);
        let mut s1 = Solution::new(SolOrigin::External);
        s1.obj = 1.0;
        let mut s2 = Solution::new(SolOrigin::External);
        s2.obj = 2.0;

        assert!(store.add(s1));
        assert!(!store.add(s2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.upper_bound(), 1.0);
    }
}
