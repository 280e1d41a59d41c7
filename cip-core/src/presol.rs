//! Presolve driver: rounds of presolvers and handler presolve slots
//! until the reductions stall.

use crate::cons::{ConsHandler, PresolResult, PresolStats};
use crate::engine::{Engine, SolveStatus};
use crate::error::CipResult;
use crate::plugins::Presolver;

impl Engine {
    /// Run presolving to a fixpoint (or the round limit).
    ///
    /// Returns the final verdict when presolving alone decides the
    /// problem (infeasible or unbounded), `None` to continue with the
    /// search.
    pub(crate) fn presolve_loop(&mut self) -> CipResult<Option<SolveStatus>> {
        let maxrounds = self.params.get_int("presolving/maxrounds").unwrap_or(-1);
        let mut total = PresolStats::default();

        loop {
            if maxrounds >= 0 && self.stats.npresol_rounds >= maxrounds as u64 {
                break;
            }
            if self.is_stopped() {
                break;
            }
            self.stats.npresol_rounds += 1;

            let mut round = PresolStats::default();
            if let Some(verdict) = self.presolve_round(&mut round)? {
                return Ok(Some(verdict));
            }
            total.nfixedvars += round.nfixedvars;
            total.naggrvars += round.naggrvars;
            total.nchgbds += round.nchgbds;
            total.ndelconss += round.ndelconss;
            total.nchgcoefs += round.nchgcoefs;
            total.nchgsides += round.nchgsides;

            if round.total() == 0 {
                break;
            }
        }

        log::info!(
            "presolving done after {} rounds: {} fixings, {} aggregations, {} bound changes, {} deleted constraints",
            self.stats.npresol_rounds,
            total.nfixedvars,
            total.naggrvars,
            total.nchgbds,
            total.ndelconss
        );
        Ok(None)
    }

    /// One presolve round: presolvers by priority, then the handlers.
    fn presolve_round(&mut self, stats: &mut PresolStats) -> CipResult<Option<SolveStatus>> {
        let mut presolvers = std::mem::take(&mut self.plugins.presolvers);
        let mut order: Vec<usize> = (0..presolvers.len()).collect();
        order.sort_by_key(|&i| {
            let name = presolvers[i].name();
            -self
                .params
                .get_int(&format!("presolving/{name}/priority"))
                .unwrap_or_else(|_| presolvers[i].priority())
        });
        let mut verdict = None;
        let mut failure = None;
        for i in order {
            match presolvers[i].execute(self, stats) {
                Ok(PresolResult::Cutoff) => {
                    verdict = Some(SolveStatus::Infeasible);
                    break;
                }
                Ok(PresolResult::Unbounded) => {
                    self.capture_pseudo_ray();
                    verdict = Some(SolveStatus::Unbounded);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.plugins.presolvers = presolvers;
        if let Some(e) = failure {
            return Err(e);
        }
        if verdict.is_some() {
            return Ok(verdict);
        }

        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let mut verdict = None;
        let mut failure = None;
        for hdlr in hdlrs.iter_mut() {
            if !hdlr.needs_cons() {
                continue;
            }
            let conss = self.conss.enabled_of(hdlr.name());
            if conss.is_empty() {
                continue;
            }
            match hdlr.presolve(self, &conss, stats) {
                Ok(PresolResult::Cutoff) => {
                    verdict = Some(SolveStatus::Infeasible);
                    break;
                }
                Ok(PresolResult::Unbounded) => {
                    self.capture_pseudo_ray();
                    verdict = Some(SolveStatus::Unbounded);
                    break;
                }
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
        Ok(verdict)
    }
}
