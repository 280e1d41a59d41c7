//! Separation driver: invokes cut-generating plugins, scores cuts,
//! applies them to the LP and maintains the global cut pool.

use std::collections::HashMap;

use crate::cons::{ConsHandler, SepaResult};
use crate::engine::Engine;
use crate::error::CipResult;
use crate::plugins::{Cut, Separator};

/// A submitted cut with its efficacy score.
#[derive(Debug, Clone)]
struct ScoredCut {
    cut: Cut,
    score: f64,
    sepa: String,
}

/// Round-local candidate store plus the persistent global cut pool.
#[derive(Debug, Default)]
pub(crate) struct SepaStore {
    candidates: Vec<ScoredCut>,

    /// Persistent pool of globally valid cuts.
    pool: Vec<Cut>,

    /// Cuts applied per separator name.
    by_sepa: HashMap<String, u64>,

    /// Separator currently executing (cut attribution).
    current: Option<String>,

    /// Cuts submitted by the current separator in this call.
    current_submitted: i32,

    /// Separator rounds used at the current focus node.
    rounds_used: HashMap<String, i32>,
}

impl SepaStore {
    pub(crate) fn new() -> Self {
        SepaStore::default()
    }

    /// Forget per-node round bookkeeping (focus changed).
    pub(crate) fn reset_node(&mut self) {
        self.rounds_used.clear();
    }

    /// Cuts applied on behalf of a separator.
    pub(crate) fn cuts_of(&self, name: &str) -> u64 {
        self.by_sepa.get(name).copied().unwrap_or(0)
    }

    /// Size of the global cut pool.
    pub(crate) fn pool_len(&self) -> usize {
        self.pool.len()
    }
}

impl Engine {
    /// Submit a cut from a separator callback.
    ///
    /// The cut is scored by `violation / norm` against the current LP
    /// solution; cuts below `separating/minefficacy` and cuts beyond the
    /// separator's per-call budget are rejected. Returns whether the cut
    /// was kept.
    pub fn add_cut(&mut self, cut: Cut) -> CipResult<bool> {
        let sepa = self
            .sepa_store
            .current
            .clone()
            .unwrap_or_else(|| "unknown".into());

        let depth = self.tree.focus_depth();
        let budget_key = if depth == 0 {
            format!("separating/{sepa}/maxsepacutsroot")
        } else {
            format!("separating/{sepa}/maxsepacuts")
        };
        let budget = self.params.get_int(&budget_key).unwrap_or(i32::MAX);
        if self.sepa_store.current_submitted >= budget {
            return Ok(false);
        }

        let activity: f64 = cut
            .entries
            .iter()
            .map(|&(v, a)| a * self.lp_sol_value(v))
            .sum();
        let violation = (cut.lhs - activity).max(activity - cut.rhs).max(0.0);
        let efficacy = violation / cut.norm().max(1e-6);
        let min_efficacy = self.params.get_real("separating/minefficacy").unwrap_or(1e-4);
        if efficacy < min_efficacy {
            log::debug!(
                "rejected cut <{}> with efficacy {efficacy:.2e}",
                cut.name
            );
            return Ok(false);
        }

        self.sepa_store.current_submitted += 1;
        self.sepa_store.candidates.push(ScoredCut {
            cut,
            score: efficacy,
            sepa,
        });
        Ok(true)
    }

    /// One separation round: separators by priority, then the handlers'
    /// separation slots, then cut application. Returns the number of
    /// rows that entered the LP.
    pub(crate) fn separation_round(&mut self, depth: usize) -> CipResult<usize> {
        self.stats.nsepa_rounds += 1;
        self.sepa_store.candidates.clear();
        let mut applied = 0usize;

        // Dedicated separators.
        let mut sepas = std::mem::take(&mut self.plugins.separators);
        let mut order: Vec<usize> = (0..sepas.len()).collect();
        order.sort_by_key(|&i| -sepas[i].priority());
        let mut failure = None;
        for i in order {
            if self.is_stopped() {
                break;
            }
            let name = sepas[i].name().to_owned();
            let rounds_key = if depth == 0 {
                format!("separating/{name}/maxroundsroot")
            } else {
                format!("separating/{name}/maxrounds")
            };
            let max_rounds = self.params.get_int(&rounds_key).unwrap_or(-1);
            let used = self.sepa_store.rounds_used.get(&name).copied().unwrap_or(0);
            if max_rounds >= 0 && used >= max_rounds {
                continue;
            }
            *self.sepa_store.rounds_used.entry(name.clone()).or_insert(0) += 1;

            self.sepa_store.current = Some(name);
            self.sepa_store.current_submitted = 0;
            let result = sepas[i].execute_lp(self, depth);
            self.sepa_store.current = None;
            match result {
                Ok(SepaResult::Cutoff) => {
                    // A cutoff from separation is expressed as an
                    // always-violated candidate set; the node closes on
                    // the resolved LP. Nothing extra to do here.
                }
                Ok(_) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.plugins.separators = sepas;
        if let Some(e) = failure {
            return Err(e);
        }

        // Constraint handler separation, by separation priority.
        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let order = if self.plugins.hdlrs_by_sepa.is_empty() {
            (0..hdlrs.len()).collect()
        } else {
            self.plugins.hdlrs_by_sepa.clone()
        };
        let mut failure = None;
        for i in order {
            if self.is_stopped() {
                break;
            }
            let hdlr = &mut hdlrs[i];
            if !hdlr.needs_cons() {
                continue;
            }
            let conss = self.conss.enabled_of(hdlr.name());
            let separable: Vec<_> = conss
                .into_iter()
                .filter(|&c| self.conss.get(c).flags.separate)
                .collect();
            if separable.is_empty() {
                continue;
            }
            match hdlr.separate_lp(self, &separable) {
                Ok(SepaResult::Separated) | Ok(SepaResult::ConsAdded) => applied += 1,
                Ok(_) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.plugins.cons_handlers = hdlrs;
        if let Some(e) = failure {
            return Err(e);
        }

        applied += self.apply_cuts(depth)?;
        Ok(applied)
    }

    /// Move the best round candidates into the LP and the global pool.
    fn apply_cuts(&mut self, depth: usize) -> CipResult<usize> {
        let mut candidates = std::mem::take(&mut self.sepa_store.candidates);
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut applied = 0usize;
        for scored in candidates {
            let cut = scored.cut;
            let (cols, offset) = self.expand_row_entries(&cut.entries)?;
            let lhs = if cut.lhs.is_finite() { cut.lhs - offset } else { cut.lhs };
            let rhs = if cut.rhs.is_finite() { cut.rhs - offset } else { cut.rhs };
            self.lp
                .add_row(&cut.name, &cols, lhs, rhs, cut.local, depth, true)?;
            applied += 1;
            self.stats.ncuts += 1;
            *self
                .sepa_store
                .by_sepa
                .entry(scored.sepa.clone())
                .or_insert(0) += 1;
            if !cut.local {
                self.sepa_store.pool.push(cut);
            }
        }
        if applied > 0 {
            log::debug!("applied {applied} cuts at depth {depth}");
        }
        Ok(applied)
    }

    /// Number of cuts in the persistent global pool.
    pub fn cut_pool_size(&self) -> usize {
        self.sepa_store.pool_len()
    }
}
