//! Generic constraint objects and the constraint pool.

use std::any::Any;
use std::collections::HashMap;

use crate::error::{CipError, CipResult};
use crate::tree::NodeId;

/// Index of a constraint in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsId(pub usize);

/// Handler-private constraint payload, downcast by the owning handler.
pub trait ConsData: Any + std::fmt::Debug {
    /// Upcast for downcasting by the handler.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + std::fmt::Debug> ConsData for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behavior flags of a constraint.
#[derive(Debug, Clone, Copy)]
pub struct ConsFlags {
    /// The constraint should be separated during LP solving.
    pub separate: bool,

    /// The constraint must be enforced on LP and pseudo solutions.
    pub enforce: bool,

    /// The constraint must hold in every feasible solution.
    pub check: bool,

    /// The constraint participates in domain propagation.
    pub propagate: bool,

    /// Valid only in the subtree of its owning node.
    pub local: bool,

    /// Belongs to the original problem space.
    pub original: bool,
}

impl Default for ConsFlags {
    fn default() -> Self {
        ConsFlags {
            separate: true,
            enforce: true,
            check: true,
            propagate: true,
            local: false,
            original: false,
        }
    }
}

/// A generic constraint: name, handler, payload, flags, scope.
#[derive(Debug)]
pub struct Constraint {
    /// Pool index.
    pub id: ConsId,

    /// Constraint name.
    pub name: String,

    /// Name of the owning constraint handler.
    pub hdlr: String,

    /// Handler-private payload.
    pub data: Box<dyn ConsData>,

    /// Behavior flags.
    pub flags: ConsFlags,

    /// Node that created the constraint; `None` means global. Used only
    /// for scope checks, never for ownership.
    pub owner_node: Option<NodeId>,

    /// Reference count.
    uses: u32,

    /// Belongs to the current node's ancestor chain and is not deleted.
    active: bool,

    /// Active and not temporarily disabled.
    enabled: bool,

    /// Released with no referrers.
    deleted: bool,

    /// Position in the handler's active-constraint array, for O(1)
    /// removal.
    hdlr_pos: Option<usize>,
}

impl Constraint {
    /// True if the constraint is active at the current node.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True if the constraint is active and enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True once the constraint was released by all referrers.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Pool of all constraints, with per-handler active lists.
#[derive(Debug, Default)]
pub struct ConsPool {
    conss: Vec<Constraint>,
    by_name: HashMap<String, ConsId>,

    /// Active constraints per handler name, order irrelevant.
    active: HashMap<String, Vec<ConsId>>,
}

impl ConsPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of constraints ever created (tombstones included).
    pub fn len(&self) -> usize {
        self.conss.len()
    }

    /// True if the pool has no constraints.
    pub fn is_empty(&self) -> bool {
        self.conss.is_empty()
    }

    /// Create a constraint with one initial reference.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        hdlr: impl Into<String>,
        data: Box<dyn ConsData>,
        flags: ConsFlags,
        owner_node: Option<NodeId>,
    ) -> CipResult<ConsId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(CipError::InvalidData(format!(
                "constraint <{name}> created twice"
            )));
        }
        let id = ConsId(self.conss.len());
        self.by_name.insert(name.clone(), id);
        self.conss.push(Constraint {
            id,
            name,
            hdlr: hdlr.into(),
            data,
            flags,
            owner_node,
            uses: 1,
            active: false,
            enabled: false,
            deleted: false,
            hdlr_pos: None,
        });
        Ok(id)
    }

    /// Access a constraint.
    pub fn get(&self, id: ConsId) -> &Constraint {
        &self.conss[id.0]
    }

    /// Access a constraint mutably.
    pub fn get_mut(&mut self, id: ConsId) -> &mut Constraint {
        &mut self.conss[id.0]
    }

    /// Find a constraint by name.
    pub fn find(&self, name: &str) -> Option<ConsId> {
        self.by_name.get(name).copied()
    }

    /// Increase the reference count.
    pub fn capture(&mut self, id: ConsId) {
        self.conss[id.0].uses += 1;
    }

    /// Decrease the reference count; the constraint is deleted when no
    /// referrer remains and it is not active anywhere.
    pub fn release(&mut self, id: ConsId) -> CipResult<()> {
        let cons = &mut self.conss[id.0];
        if cons.uses == 0 {
            return Err(CipError::InvalidData(format!(
                "constraint <{}> released more often than captured",
                cons.name
            )));
        }
        cons.uses -= 1;
        if cons.uses == 0 && !cons.active {
            cons.deleted = true;
            self.by_name.remove(&self.conss[id.0].name.clone());
        }
        Ok(())
    }

    /// Activate a constraint at node entry. Idempotent.
    pub fn activate(&mut self, id: ConsId) -> CipResult<()> {
        if self.conss[id.0].deleted {
            return Err(CipError::InvalidData(format!(
                "activation of deleted constraint <{}>",
                self.conss[id.0].name
            )));
        }
        if self.conss[id.0].active {
            return Ok(());
        }
        let hdlr = self.conss[id.0].hdlr.clone();
        let list = self.active.entry(hdlr).or_default();
        self.conss[id.0].hdlr_pos = Some(list.len());
        list.push(id);
        self.conss[id.0].active = true;
        self.conss[id.0].enabled = true;
        Ok(())
    }

    /// Deactivate a constraint at node exit. Idempotent.
    pub fn deactivate(&mut self, id: ConsId) -> CipResult<()> {
        if !self.conss[id.0].active {
            return Ok(());
        }
        let hdlr = self.conss[id.0].hdlr.clone();
        let pos = self.conss[id.0]
            .hdlr_pos
            .ok_or_else(|| CipError::InvalidData("active constraint without position".into()))?;
        let list = self
            .active
            .get_mut(&hdlr)
            .ok_or_else(|| CipError::InvalidData("missing handler list".into()))?;
        list.swap_remove(pos);
        if let Some(&moved) = list.get(pos) {
            self.conss[moved.0].hdlr_pos = Some(pos);
        }
        let cons = &mut self.conss[id.0];
        cons.hdlr_pos = None;
        cons.active = false;
        cons.enabled = false;
        if cons.uses == 0 {
            cons.deleted = true;
        }
        Ok(())
    }

    /// Temporarily disable an active constraint.
    pub fn disable(&mut self, id: ConsId) {
        let cons = &mut self.conss[id.0];
        if cons.active {
            cons.enabled = false;
        }
    }

    /// Re-enable a temporarily disabled constraint.
    pub fn enable(&mut self, id: ConsId) {
        let cons = &mut self.conss[id.0];
        if cons.active {
            cons.enabled = true;
        }
    }

    /// Active constraints of a handler (enabled or not).
    pub fn active_of(&self, hdlr: &str) -> Vec<ConsId> {
        self.active.get(hdlr).cloned().unwrap_or_default()
    }

    /// Enabled constraints of a handler.
    pub fn enabled_of(&self, hdlr: &str) -> Vec<ConsId> {
        self.active
            .get(hdlr)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|&c| self.conss[c.0].enabled)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of all non-deleted constraints.
    pub fn all(&self) -> Vec<ConsId> {
        self.conss
            .iter()
            .filter(|c| !c.deleted)
            .map(|c| c.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy;

    fn pool_with_two() -> (ConsPool, ConsId, ConsId) {
        let mut pool = ConsPool::new();
        let a = pool
            .add("a", "linear", Box::new(Dummy), ConsFlags::default(), None)
            .unwrap();
        let b = pool
            .add("b", "linear", Box::new(Dummy), ConsFlags::default(), None)
            .unwrap();
        (pool, a, b)
    }

    #[test]
    fn test_activation_idempotent_and_symmetric() {
        let (mut pool, a, b) = pool_with_two();

        pool.activate(a).unwrap();
        pool.activate(a).unwrap();
        pool.activate(b).unwrap();
        assert_eq!(pool.active_of("linear").len(), 2);
        assert!(pool.get(a).is_enabled());

        pool.deactivate(a).unwrap();
        pool.deactivate(a).unwrap();
        assert_eq!(pool.active_of("linear"), vec![b]);
        assert!(!pool.get(a).is_active());

        // The moved constraint keeps a consistent position.
        pool.deactivate(b).unwrap();
        assert!(pool.active_of("linear").is_empty());
    }

    #[test]
    fn test_disable_enable_window() {
        let (mut pool, a, _b) = pool_with_two();
        pool.activate(a).unwrap();

        pool.disable(a);
        assert!(pool.get(a).is_active());
        assert!(!pool.get(a).is_enabled());
        assert!(pool.enabled_of("linear").is_empty());

        pool.enable(a);
        assert_eq!(pool.enabled_of("linear"), vec![a]);
    }

    #[test]
    fn test_release_deletes_inactive_only() {
        let (mut pool, a, _b) = pool_with_two();
        pool.activate(a).unwrap();
        pool.capture(a);

        pool.release(a).unwrap();
        pool.release(a).unwrap();
        // Still active: deletion deferred until deactivation.
        assert!(!pool.get(a).is_deleted());

        pool.deactivate(a).unwrap();
        assert!(pool.get(a).is_deleted());
        assert!(pool.release(a).is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut pool, _a, _b) = pool_with_two();
        assert!(pool
            .add("a", "linear", Box::new(Dummy), ConsFlags::default(), None)
            .is_err());
    }
}
