//! The plugin registry: typed named lists sorted by priority.

use std::collections::HashMap;

use crate::cons::ConsHandler;
use crate::error::{CipError, CipResult};

use super::branching::BranchRule;
use super::conflict::ConflictAnalyzer;
use super::heuristic::Heuristic;
use super::nodesel::NodeSelector;
use super::presolver::Presolver;
use super::pricer::Pricer;
use super::propagator::Propagator;
use super::reader::Reader;
use super::separator::Separator;

macro_rules! plugin_list {
    ($add:ident, $find:ident, $field:ident, $trait_:ident) => {
        /// Register a plugin of this kind. Rejected after the registry
        /// was frozen for solving, and on duplicate names.
        pub fn $add(&mut self, plugin: Box<dyn $trait_>) -> CipResult<()> {
            if self.frozen {
                return Err(CipError::InvalidData(format!(
                    "registration of <{}> during solving",
                    plugin.name()
                )));
            }
            let key = (stringify!($field), plugin.name().to_owned());
            if self.names.contains_key(&key) {
                return Err(CipError::InvalidData(format!(
                    "plugin <{}> registered twice",
                    plugin.name()
                )));
            }
            self.names.insert(key, self.$field.len());
            self.$field.push(plugin);
            Ok(())
        }

        /// Find a plugin of this kind by name.
        pub fn $find(&self, name: &str) -> Option<usize> {
            self.names
                .get(&(stringify!($field), name.to_owned()))
                .copied()
        }
    };
}

/// Holds every registered plugin, with O(1) name lookup and cached
/// priority-sorted iteration orders.
#[derive(Default)]
pub struct PluginRegistry {
    /// Constraint handlers.
    pub cons_handlers: Vec<Box<dyn ConsHandler>>,

    /// Node selectors.
    pub nodesels: Vec<Box<dyn NodeSelector>>,

    /// Branching rules.
    pub branchrules: Vec<Box<dyn BranchRule>>,

    /// Separators.
    pub separators: Vec<Box<dyn Separator>>,

    /// Propagators.
    pub propagators: Vec<Box<dyn Propagator>>,

    /// Primal heuristics.
    pub heuristics: Vec<Box<dyn Heuristic>>,

    /// Presolvers.
    pub presolvers: Vec<Box<dyn Presolver>>,

    /// File readers.
    pub readers: Vec<Box<dyn Reader>>,

    /// Variable pricers.
    pub pricers: Vec<Box<dyn Pricer>>,

    /// Conflict analyzers.
    pub conflict_analyzers: Vec<Box<dyn ConflictAnalyzer>>,

    names: HashMap<(&'static str, String), usize>,
    frozen: bool,

    /// Handler indices by enforcement priority, built at freeze.
    pub hdlrs_by_enfo: Vec<usize>,

    /// Handler indices by check priority, built at freeze.
    pub hdlrs_by_check: Vec<usize>,

    /// Handler indices by separation priority, built at freeze.
    pub hdlrs_by_sepa: Vec<usize>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    plugin_list!(add_cons_handler, find_cons_handler, cons_handlers, ConsHandler);
    plugin_list!(add_nodesel, find_nodesel, nodesels, NodeSelector);
    plugin_list!(add_branchrule, find_branchrule, branchrules, BranchRule);
    plugin_list!(add_separator, find_separator, separators, Separator);
    plugin_list!(add_propagator, find_propagator, propagators, Propagator);
    plugin_list!(add_heuristic, find_heuristic, heuristics, Heuristic);
    plugin_list!(add_presolver, find_presolver, presolvers, Presolver);
    plugin_list!(add_reader, find_reader, readers, Reader);
    plugin_list!(add_pricer, find_pricer, pricers, Pricer);
    plugin_list!(
        add_conflict_analyzer,
        find_conflict_analyzer,
        conflict_analyzers,
        ConflictAnalyzer
    );

    /// True after [`PluginRegistry::freeze`].
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze registration and build the priority-sorted views.
    pub fn freeze(&mut self) {
        let mut by_enfo: Vec<usize> = (0..self.cons_handlers.len()).collect();
        by_enfo.sort_by_key(|&i| -self.cons_handlers[i].enfo_priority());
        self.hdlrs_by_enfo = by_enfo;

        let mut by_check: Vec<usize> = (0..self.cons_handlers.len()).collect();
        by_check.sort_by_key(|&i| -self.cons_handlers[i].check_priority());
        self.hdlrs_by_check = by_check;

        let mut by_sepa: Vec<usize> = (0..self.cons_handlers.len()).collect();
        by_sepa.sort_by_key(|&i| -self.cons_handlers[i].sepa_priority());
        self.hdlrs_by_sepa = by_sepa;

        self.frozen = true;
    }

    /// Reopen registration (after the solving process ended).
    pub fn thaw(&mut self) {
        self.frozen = false;
    }

    /// Indices of separators in decreasing priority.
    pub fn separators_by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.separators.len()).collect();
        order.sort_by_key(|&i| -self.separators[i].priority());
        order
    }

    /// Indices of propagators in decreasing priority.
    pub fn propagators_by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.propagators.len()).collect();
        order.sort_by_key(|&i| -self.propagators[i].priority());
        order
    }

    /// Indices of heuristics in decreasing priority.
    pub fn heuristics_by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.heuristics.len()).collect();
        order.sort_by_key(|&i| -self.heuristics[i].priority());
        order
    }

    /// Indices of presolvers in decreasing priority.
    pub fn presolvers_by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.presolvers.len()).collect();
        order.sort_by_key(|&i| -self.presolvers[i].priority());
        order
    }

    /// Indices of branching rules in decreasing priority.
    pub fn branchrules_by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.branchrules.len()).collect();
        order.sort_by_key(|&i| -self.branchrules[i].priority());
        order
    }

    /// The node selector with the highest standard priority.
    pub fn best_nodesel(&self) -> Option<usize> {
        (0..self.nodesels.len()).max_by_key(|&i| self.nodesels[i].std_priority())
    }

    /// The reader registered for a file extension.
    pub fn reader_for_extension(&self, ext: &str) -> Option<usize> {
        (0..self.readers.len()).find(|&i| self.readers[i].extension().eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::nodesel::{BestBoundNodesel, DfsNodesel};
    use crate::plugins::propagator::PseudoObjProp;

    #[test]
    fn test_name_lookup_and_duplicates() {
        let mut reg = PluginRegistry::new();
        reg.add_nodesel(Box::new(DfsNodesel)).unwrap();
        reg.add_nodesel(Box::new(BestBoundNodesel)).unwrap();

        assert_eq!(reg.find_nodesel("dfs"), Some(0));
        assert_eq!(reg.find_nodesel("bestbound"), Some(1));
        assert_eq!(reg.find_nodesel("unknown"), None);
        assert!(reg.add_nodesel(Box::new(DfsNodesel)).is_err());
    }

    #[test]
    fn test_frozen_registry_rejects_registration() {
        let mut reg = PluginRegistry::new();
        reg.freeze();
        assert!(reg.add_propagator(Box::new(PseudoObjProp)).is_err());
        reg.thaw();
        assert!(reg.add_propagator(Box::new(PseudoObjProp)).is_ok());
    }

    #[test]
    fn test_best_nodesel_by_priority() {
        let mut reg = PluginRegistry::new();
        reg.add_nodesel(Box::new(DfsNodesel)).unwrap();
        reg.add_nodesel(Box::new(BestBoundNodesel)).unwrap();
        // bestbound has the higher standard priority.
        assert_eq!(reg.best_nodesel(), Some(1));
    }
}
