//! Search tree: node arena, focus path maintenance, leaf queue.

mod node;
mod queue;

pub use node::{BoundChg, BoundSide, HoleChg, Node, NodeId, NodeSetChange, NodeState};
pub use queue::{NodeCmp, NodeQueue};

use crate::cons::ConsPool;
use crate::error::{CipError, CipResult};
use crate::prob::Prob;

/// The branch-and-bound tree.
///
/// Nodes live in an arena and refer to each other by id; the focus path
/// is maintained by undoing and applying node-set-changes over the
/// lowest common ancestor when the focus moves.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,

    /// Leaf priority queue.
    pub queue: NodeQueue,

    focus: Option<NodeId>,
    root: Option<NodeId>,
    next_seq: u64,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Tree::default()
    }

    /// Total nodes ever created.
    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }

    /// The node arena.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access to the arena (queue operations need it).
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// The root node, once created.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The focus node.
    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    /// Depth of the focus node, 0 without focus.
    pub fn focus_depth(&self) -> usize {
        self.focus.map_or(0, |id| self.nodes[id.0].depth)
    }

    /// Access a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Access a node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Create the root node.
    pub fn create_root(&mut self) -> CipResult<NodeId> {
        if self.root.is_some() {
            return Err(CipError::InvalidData("root created twice".into()));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent: None,
            depth: 0,
            lower_bound: f64::NEG_INFINITY,
            state: NodeState::Created,
            change: NodeSetChange::default(),
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.root = Some(id);
        Ok(id)
    }

    /// Create a child of `parent` carrying the given bound changes.
    ///
    /// The child inherits the parent's lower bound (monotonicity).
    pub fn create_child(&mut self, parent: NodeId, bound_chgs: Vec<BoundChg>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let p = &self.nodes[parent.0];
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            depth: p.depth + 1,
            lower_bound: p.lower_bound,
            state: NodeState::Created,
            change: NodeSetChange {
                bound_chgs,
                ..NodeSetChange::default()
            },
            seq: self.next_seq,
        });
        self.next_seq += 1;
        id
    }

    /// Insert a node into the leaf queue.
    pub fn queue_insert(&mut self, id: NodeId, cmp: NodeCmp<'_>) {
        self.nodes[id.0].state = NodeState::Queued;
        self.queue.insert(&self.nodes, id, cmp);
    }

    /// Pop the best leaf per the comparator.
    pub fn queue_pop(&mut self, cmp: NodeCmp<'_>) -> Option<NodeId> {
        self.queue.pop_best(&self.nodes, cmp)
    }

    /// Remove one specific leaf from the queue.
    pub fn queue_remove(&mut self, id: NodeId, cmp: NodeCmp<'_>) -> bool {
        self.queue.remove(&self.nodes, id, cmp)
    }

    /// Prune all queued leaves with lower bound at or above `upper`.
    pub fn queue_bound(&mut self, upper: f64, cmp: NodeCmp<'_>) -> Vec<NodeId> {
        self.queue.bound(&mut self.nodes, upper, cmp)
    }

    /// Path from the root to `id`, inclusive.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            path.push(n);
            current = self.nodes[n.0].parent;
        }
        path.reverse();
        path
    }

    /// Move the focus to `new` (or to no node at all).
    ///
    /// Undoes set-changes upward from the old focus to the lowest common
    /// ancestor, then applies downward to the new focus. Returns the
    /// depth of the common prefix, which callers use to drop local LP
    /// rows of the abandoned subtree.
    pub fn switch_focus(
        &mut self,
        new: Option<NodeId>,
        prob: &mut Prob,
        conss: &mut ConsPool,
    ) -> CipResult<usize> {
        let old_path = self.focus.map_or_else(Vec::new, |f| self.path_from_root(f));
        let new_path = new.map_or_else(Vec::new, |n| self.path_from_root(n));

        let mut common = 0;
        while common < old_path.len().min(new_path.len()) && old_path[common] == new_path[common] {
            common += 1;
        }

        for &n in old_path[common..].iter().rev() {
            self.nodes[n.0].change.undo(prob, conss)?;
        }
        for &n in &new_path[common..] {
            self.nodes[n.0].change.apply(prob, conss)?;
        }

        if let Some(old) = self.focus {
            if self.nodes[old.0].state == NodeState::Focus {
                self.nodes[old.0].state = NodeState::Infeasible;
            }
        }
        if let Some(n) = new {
            self.nodes[n.0].state = NodeState::Focus;
        }
        self.focus = new;
        Ok(common.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::{VarId, VarKind};

    fn prob_one_var() -> (Prob, VarId) {
        let mut prob = Prob::new("t");
        prob.add_var("x", VarKind::Integer, 1.0, 0.0, 10.0).unwrap();
        prob.transform().unwrap();
        let x = prob.trans_vars()[0];
        (prob, x)
    }

    fn chg(var: VarId, side: BoundSide, old: f64, new: f64) -> BoundChg {
        BoundChg { var, side, old, new }
    }

    #[test]
    fn test_focus_switch_applies_path_changes() {
        let (mut prob, x) = prob_one_var();
        let mut conss = ConsPool::new();
        let mut tree = Tree::new();

        let root = tree.create_root().unwrap();
        // Children: left fixes x <= 4, right forces x >= 5.
        let left = tree.create_child(root, vec![chg(x, BoundSide::Upper, 10.0, 4.0)]);
        let right = tree.create_child(root, vec![chg(x, BoundSide::Lower, 0.0, 5.0)]);
        // Grandchild of left: x >= 2.
        let left2 = tree.create_child(left, vec![chg(x, BoundSide::Lower, 0.0, 2.0)]);

        tree.switch_focus(Some(root), &mut prob, &mut conss).unwrap();
        tree.switch_focus(Some(left2), &mut prob, &mut conss).unwrap();
        assert_eq!(prob.var(x).local.lb, 2.0);
        assert_eq!(prob.var(x).local.ub, 4.0);

        // Switching to the sibling undoes the left path over the root.
        tree.switch_focus(Some(right), &mut prob, &mut conss).unwrap();
        assert_eq!(prob.var(x).local.lb, 5.0);
        assert_eq!(prob.var(x).local.ub, 10.0);

        // Leaving the tree restores the root state entirely.
        tree.switch_focus(None, &mut prob, &mut conss).unwrap();
        assert_eq!(prob.var(x).local.lb, 0.0);
        assert_eq!(prob.var(x).local.ub, 10.0);
    }

    #[test]
    fn test_child_inherits_bound_and_depth() {
        let (mut prob, _x) = prob_one_var();
        let mut conss = ConsPool::new();
        let mut tree = Tree::new();
        let root = tree.create_root().unwrap();
        tree.switch_focus(Some(root), &mut prob, &mut conss).unwrap();
        tree.node_mut(root).update_lower_bound(3.5);

        let child = tree.create_child(root, Vec::new());
        assert_eq!(tree.node(child).depth, 1);
        assert_eq!(tree.node(child).lower_bound, 3.5);
        assert_eq!(tree.node(child).parent, Some(root));
    }
}
