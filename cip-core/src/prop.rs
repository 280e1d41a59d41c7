//! Propagation driver: rounds over propagators and constraint handlers
//! until a fixpoint or a cutoff.

use crate::cons::{ConsHandler, PropResult};
use crate::engine::Engine;
use crate::error::CipResult;
use crate::plugins::Propagator;

/// True if a plugin with depth frequency `freq` runs at `depth`.
fn freq_matches(freq: i32, depth: usize) -> bool {
    match freq {
        f if f < 0 => false,
        0 => depth == 0,
        f => depth % f as usize == 0,
    }
}

impl Engine {
    /// Run propagation rounds at the focus node until no round produces
    /// a reduction, a cutoff is found, or the round limit is hit.
    ///
    /// A round is productive if any plugin reported a domain reduction;
    /// termination is guaranteed by the round limit even under cyclic
    /// numerical tightenings.
    pub(crate) fn propagate_loop(&mut self, depth: usize) -> CipResult<PropResult> {
        let maxrounds = self.params.get_int("propagating/maxrounds").unwrap_or(100);
        let mut overall = PropResult::DidNotFind;

        for _ in 0..maxrounds.max(1) {
            if self.is_stopped() {
                break;
            }
            self.stats.nprop_rounds += 1;
            let round = self.propagate_round(depth)?;
            match round {
                PropResult::Cutoff => return Ok(PropResult::Cutoff),
                PropResult::ReducedDom => overall = PropResult::ReducedDom,
                _ => break,
            }
        }
        Ok(overall)
    }

    /// One round: dedicated propagators by priority, then the handlers'
    /// propagation slots.
    fn propagate_round(&mut self, depth: usize) -> CipResult<PropResult> {
        let mut productive = false;

        let mut props = std::mem::take(&mut self.plugins.propagators);
        let mut order: Vec<usize> = (0..props.len()).collect();
        order.sort_by_key(|&i| {
            let name = props[i].name();
            -self
                .params
                .get_int(&format!("propagating/{name}/priority"))
                .unwrap_or_else(|_| props[i].priority())
        });
        let mut failure = None;
        for i in order {
            let name = props[i].name();
            let freq = self
                .params
                .get_int(&format!("propagating/{name}/freq"))
                .unwrap_or_else(|_| props[i].freq());
            if !freq_matches(freq, depth) {
                continue;
            }
            match props[i].execute(self) {
                Ok(PropResult::Cutoff) => {
                    self.plugins.propagators = props;
                    return Ok(PropResult::Cutoff);
                }
                Ok(PropResult::ReducedDom) => productive = true,
                Ok(_) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.plugins.propagators = props;
        if let Some(e) = failure {
            return Err(e);
        }

        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let mut failure = None;
        for hdlr in hdlrs.iter_mut() {
            if !hdlr.needs_cons() {
                continue;
            }
            let freq = self
                .params
                .get_int(&format!("constraints/{}/propfreq", hdlr.name()))
                .unwrap_or_else(|_| hdlr.prop_freq());
            if !freq_matches(freq, depth) {
                continue;
            }
            let conss: Vec<_> = self
                .conss
                .enabled_of(hdlr.name())
                .into_iter()
                .filter(|&c| self.conss.get(c).flags.propagate)
                .collect();
            if conss.is_empty() {
                continue;
            }
            match hdlr.propagate(self, &conss) {
                Ok(PropResult::Cutoff) => {
                    self.plugins.cons_handlers = hdlrs;
                    return Ok(PropResult::Cutoff);
                }
                Ok(PropResult::ReducedDom) => productive = true,
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

        Ok(if productive {
            PropResult::ReducedDom
        } else {
            PropResult::DidNotFind
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freq_matching() {
        assert!(!freq_matches(-1, 0));
        assert!(freq_matches(0, 0));
        assert!(!freq_matches(0, 3));
        assert!(freq_matches(1, 7));
        assert!(freq_matches(2, 4));
        assert!(!freq_matches(2, 5));
    }
}
