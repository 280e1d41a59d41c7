//! Branch-and-bound nodes and their set-changes.

use crate::cons::{ConsId, ConsPool};
use crate::error::{CipError, CipResult};
use crate::prob::Prob;
use crate::var::{Hole, VarId, FEASTOL};

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Allocated, not yet queued.
    Created,

    /// Waiting in the leaf priority queue.
    Queued,

    /// Currently being processed.
    Focus,

    /// Processed: produced a feasible solution.
    Feasible,

    /// Processed: proven infeasible or bound-dominated.
    Infeasible,

    /// Processed: children were created.
    Branched,

    /// Removed by bounding before being processed.
    DeadEnd,
}

/// Which side of a variable's domain a change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    /// Lower bound.
    Lower,

    /// Upper bound.
    Upper,
}

/// A recorded local bound change with its old value for O(1) undo.
#[derive(Debug, Clone, Copy)]
pub struct BoundChg {
    /// Changed variable.
    pub var: VarId,

    /// Changed side.
    pub side: BoundSide,

    /// Value before the change.
    pub old: f64,

    /// Value after the change.
    pub new: f64,
}

/// A recorded hole addition with the previous hole list.
#[derive(Debug, Clone)]
pub struct HoleChg {
    /// Changed variable.
    pub var: VarId,

    /// Left end of the added hole.
    pub left: f64,

    /// Right end of the added hole.
    pub right: f64,

    /// Hole list before the addition.
    pub old_holes: Vec<Hole>,
}

/// The bundle of modifications defining a node relative to its parent.
///
/// Applied on focus entry, undone on focus exit; apply-then-undo must
/// restore bounds, holes and constraint activation exactly.
#[derive(Debug, Default)]
pub struct NodeSetChange {
    /// Local bound changes in application order.
    pub bound_chgs: Vec<BoundChg>,

    /// Local hole additions in application order.
    pub hole_chgs: Vec<HoleChg>,

    /// Constraints activated at this node.
    pub added_conss: Vec<ConsId>,

    /// Constraints disabled at this node.
    pub disabled_conss: Vec<ConsId>,
}

impl NodeSetChange {
    /// True if the change carries no records.
    pub fn is_empty(&self) -> bool {
        self.bound_chgs.is_empty()
            && self.hole_chgs.is_empty()
            && self.added_conss.is_empty()
            && self.disabled_conss.is_empty()
    }

    /// Apply all records to the problem and constraint pool.
    pub fn apply(&self, prob: &mut Prob, conss: &mut ConsPool) -> CipResult<()> {
        for chg in &self.bound_chgs {
            let var = prob.var_mut(chg.var);
            let current = match chg.side {
                BoundSide::Lower => var.local.lb,
                BoundSide::Upper => var.local.ub,
            };
            let matches = if current.is_finite() && chg.old.is_finite() {
                (current - chg.old).abs() <= FEASTOL
            } else {
                current == chg.old
            };
            if !matches {
                return Err(CipError::InvalidData(format!(
                    "corrupted change list for variable {}",
                    var.name
                )));
            }
            match chg.side {
                BoundSide::Lower => var.local.lb = chg.new,
                BoundSide::Upper => var.local.ub = chg.new,
            }
        }
        for chg in &self.hole_chgs {
            prob.var_mut(chg.var).local.add_hole(chg.left, chg.right)?;
        }
        for &cons in &self.added_conss {
            conss.activate(cons)?;
        }
        for &cons in &self.disabled_conss {
            conss.disable(cons);
        }
        Ok(())
    }

    /// Undo all records in reverse order.
    pub fn undo(&self, prob: &mut Prob, conss: &mut ConsPool) -> CipResult<()> {
        for &cons in self.disabled_conss.iter().rev() {
            conss.enable(cons);
        }
        for &cons in self.added_conss.iter().rev() {
            conss.deactivate(cons)?;
        }
        for chg in self.hole_chgs.iter().rev() {
            prob.var_mut(chg.var).local.holes = chg.old_holes.clone();
        }
        for chg in self.bound_chgs.iter().rev() {
            let var = prob.var_mut(chg.var);
            match chg.side {
                BoundSide::Lower => var.local.lb = chg.old,
                BoundSide::Upper => var.local.ub = chg.old,
            }
        }
        Ok(())
    }
}

/// A branch-and-bound node.
#[derive(Debug)]
pub struct Node {
    /// Arena index.
    pub id: NodeId,

    /// Parent node; `None` for the root.
    pub parent: Option<NodeId>,

    /// Depth in the tree, 0 for the root.
    pub depth: usize,

    /// Local lower (dual) bound; at least the parent's bound.
    pub lower_bound: f64,

    /// Lifecycle state.
    pub state: NodeState,

    /// The set-change defining this node relative to its parent.
    pub change: NodeSetChange,

    /// Insertion sequence number for deterministic tie breaking.
    pub seq: u64,
}

impl Node {
    /// Raise the local lower bound (never lowers it).
    pub fn update_lower_bound(&mut self, bound: f64) {
        if bound > self.lower_bound {
            self.lower_bound = bound;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cons::ConsFlags;
    use crate::var::VarKind;

    #[derive(Debug)]
    struct Dummy;

    fn setup() -> (Prob, ConsPool, VarId, ConsId) {
        let mut prob = Prob::new("t");
        prob.add_var("x", VarKind::Integer, 1.0, 0.0, 10.0).unwrap();
        prob.transform().unwrap();
        let tx = prob.trans_vars()[0];

        let mut pool = ConsPool::new();
        let c = pool
            .add("c", "linear", Box::new(Dummy), ConsFlags::default(), None)
            .unwrap();
        pool.activate(c).unwrap();
        (prob, pool, tx, c)
    }

    #[test]
    fn test_apply_undo_symmetry() {
        let (mut prob, mut pool, x, c) = setup();

        let added = pool
            .add("added", "linear", Box::new(Dummy), ConsFlags::default(), None)
            .unwrap();

        let change = NodeSetChange {
            bound_chgs: vec![
                BoundChg {
                    var: x,
                    side: BoundSide::Lower,
                    old: 0.0,
                    new: 2.0,
                },
                BoundChg {
                    var: x,
                    side: BoundSide::Upper,
                    old: 10.0,
                    new: 6.0,
                },
            ],
            hole_chgs: vec![HoleChg {
                var: x,
                left: 3.0,
                right: 4.0,
                old_holes: Vec::new(),
            }],
            added_conss: vec![added],
            disabled_conss: vec![c],
        };

        let bounds_before = prob.var(x).local.clone();

        change.apply(&mut prob, &mut pool).unwrap();
        assert_eq!(prob.var(x).local.lb, 2.0);
        assert_eq!(prob.var(x).local.ub, 6.0);
        assert_eq!(prob.var(x).local.holes.len(), 1);
        assert!(pool.get(added).is_active());
        assert!(!pool.get(c).is_enabled());

        change.undo(&mut prob, &mut pool).unwrap();
        assert_eq!(prob.var(x).local, bounds_before);
        assert!(!pool.get(added).is_active());
        assert!(pool.get(c).is_enabled());
    }

    #[test]
    fn test_lower_bound_monotone() {
        let mut node = Node {
            id: NodeId(0),
            parent: None,
            depth: 0,
            lower_bound: 5.0,
            state: NodeState::Created,
            change: NodeSetChange::default(),
            seq: 0,
        };
        node.update_lower_bound(3.0);
        assert_eq!(node.lower_bound, 5.0);
        node.update_lower_bound(7.0);
        assert_eq!(node.lower_bound, 7.0);
    }
}
