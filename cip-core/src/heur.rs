//! Primal heuristic driver: schedules heuristics by frequency, priority
//! and node context.

use crate::engine::Engine;
use crate::error::CipResult;
use crate::lp::LpStatus;
use crate::plugins::Heuristic;

impl Engine {
    /// Run the heuristics due at the current node count.
    ///
    /// A heuristic is due when its `heuristics/<name>/freq` divides the
    /// processed-node count, its timing admits the current context, and
    /// (for diving heuristics) an optimal LP is available.
    pub(crate) fn run_heuristics(&mut self, has_lp: bool) -> CipResult<()> {
        let mut heurs = std::mem::take(&mut self.plugins.heuristics);
        let mut order: Vec<usize> = (0..heurs.len()).collect();
        order.sort_by_key(|&i| {
            let name = heurs[i].name();
            -self
                .params
                .get_int(&format!("heuristics/{name}/priority"))
                .unwrap_or_else(|_| heurs[i].priority())
        });

        let mut failure = None;
        for i in order {
            if self.is_stopped() {
                break;
            }
            let name = heurs[i].name();
            let freq = self
                .params
                .get_int(&format!("heuristics/{name}/freq"))
                .unwrap_or_else(|_| heurs[i].freq());
            if freq < 0 {
                continue;
            }
            let due = if freq == 0 {
                self.stats.nnodes <= 1
            } else {
                self.stats.nnodes % freq as u64 == 0
            };
            if !due || !heurs[i].timing().admits(has_lp) {
                continue;
            }
            if heurs[i].uses_dive() && (!has_lp || self.lp.status() != LpStatus::Optimal) {
                continue;
            }

            match heurs[i].execute(self) {
                Ok(result) => {
                    log::debug!("heuristic <{name}> returned {result:?}");
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.plugins.heuristics = heurs;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
