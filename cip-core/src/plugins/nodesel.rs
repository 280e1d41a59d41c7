//! Node selector plugins.

use std::cmp::Ordering;

use crate::engine::Engine;
use crate::error::CipResult;
use crate::tree::{Node, NodeId};

/// A node selection policy: picks the next focus node and defines the
/// leaf queue ordering.
pub trait NodeSelector {
    /// Unique selector name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn desc(&self) -> &'static str {
        ""
    }

    /// Priority in standard mode (higher wins).
    fn std_priority(&self) -> i32 {
        0
    }

    /// Priority in memory-saving mode.
    fn memsave_priority(&self) -> i32 {
        0
    }

    /// Declared at registration: the primary comparison key is the lower
    /// bound, enabling the queue's root-slot fast path.
    fn lowest_bound_first(&self) -> bool {
        false
    }

    /// Pick the next node; `None` delegates to the best queue entry
    /// under [`NodeSelector::compare`].
    fn select(&mut self, _engine: &mut Engine) -> CipResult<Option<NodeId>> {
        Ok(None)
    }

    /// Ordering of two leaves; `Less` selects the first one earlier.
    fn compare(&self, a: &Node, b: &Node) -> Ordering;

    /// Clone for a subordinate engine; `None` = non-cloneable.
    fn clone_plugin(&self) -> Option<Box<dyn NodeSelector>> {
        None
    }
}

/// Depth-first search: deeper nodes first, ties by lower bound.
#[derive(Debug, Default)]
pub struct DfsNodesel;

impl DfsNodesel {
    /// Selector name.
    pub const NAME: &'static str = "dfs";
}

impl NodeSelector for DfsNodesel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "depth first search"
    }

    fn std_priority(&self) -> i32 {
        0
    }

    fn memsave_priority(&self) -> i32 {
        100_000
    }

    fn compare(&self, a: &Node, b: &Node) -> Ordering {
        b.depth.cmp(&a.depth).then_with(|| {
            a.lower_bound
                .partial_cmp(&b.lower_bound)
                .unwrap_or(Ordering::Equal)
        })
    }

    fn clone_plugin(&self) -> Option<Box<dyn NodeSelector>> {
        Some(Box::new(DfsNodesel))
    }
}

/// Best-bound search: lowest lower bound first, ties by depth.
#[derive(Debug, Default)]
pub struct BestBoundNodesel;

impl BestBoundNodesel {
    /// Selector name.
    pub const NAME: &'static str = "bestbound";
}

impl NodeSelector for BestBoundNodesel {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn desc(&self) -> &'static str {
        "best bound search"
    }

    fn std_priority(&self) -> i32 {
        100_000
    }

    fn lowest_bound_first(&self) -> bool {
        true
    }

    fn compare(&self, a: &Node, b: &Node) -> Ordering {
        a.lower_bound
            .partial_cmp(&b.lower_bound)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.depth.cmp(&a.depth))
    }

    fn clone_plugin(&self) -> Option<Box<dyn NodeSelector>> {
        Some(Box::new(BestBoundNodesel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeSetChange, NodeState};

    fn node(id: usize, depth: usize, bound: f64) -> Node {
        Node {
            id: NodeId(id),
            parent: None,
            depth,
            lower_bound: bound,
            state: NodeState::Queued,
            change: NodeSetChange::default(),
            seq: id as u64,
        }
    }

    #[test]
    fn test_dfs_prefers_depth_then_bound() {
        let sel = DfsNodesel;
        let shallow = node(0, 1, 0.0);
        let deep = node(1, 3, 10.0);
        assert_eq!(sel.compare(&deep, &shallow), Ordering::Less);

        let a = node(2, 2, 1.0);
        let b = node(3, 2, 2.0);
        assert_eq!(sel.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_bestbound_prefers_bound() {
        let sel = BestBoundNodesel;
        assert!(sel.lowest_bound_first());
        let good = node(0, 1, 1.0);
        let bad = node(1, 5, 2.0);
        assert_eq!(sel.compare(&good, &bad), Ordering::Less);
    }
}
