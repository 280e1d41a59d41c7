//! The search engine: the owning aggregate of all solver state.
//!
//! The engine orchestrates presolve, the branch-and-bound loop and the
//! plugin drivers. It is handed explicitly to every plugin callback; the
//! registry list a plugin lives in is taken out for the duration of its
//! callback, so callbacks get full `&mut Engine` access without
//! aliasing.

use std::cmp::Ordering;

use crate::clock::Clock;
use crate::cons::{
    ConsData, ConsFlags, ConsHandler, ConsId, ConsPool, EnforceResult, LinearConsData,
    LinearConsHandler, IntegralConsHandler, PropResult,
};
use crate::error::{CipError, CipResult};
use crate::lp::{Lp, LpSolver, LpStatus, RowId, SimplexSolver};
use crate::params::ParamStore;
use crate::plugins::{
    BestBoundNodesel, BranchResult, BranchRule, ConflictAnalyzer, ConflictSource, DfsNodesel,
    DualfixPresolver, Heuristic, MostInfeasBranching, NodeSelector, PluginRegistry, Presolver,
    PriceResult, Pricer, Propagator, PseudoObjProp, Reader, RoundDiveHeur, Separator,
};
use crate::prob::{ObjSense, Prob};
use crate::sepa::SepaStore;
use crate::sol::{SolOrigin, SolStore, Solution};
use crate::tree::{BoundChg, BoundSide, NodeId, NodeState, Tree};
use crate::var::{VarId, VarKind, VarStatus, FEASTOL};

/// Numerical tolerance for bound and objective comparisons.
const EPS: f64 = 1e-9;

/// Stage of the engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// No problem yet.
    #[default]
    Init,

    /// A problem is being built.
    Problem,

    /// Presolving runs.
    Presolving,

    /// The branch-and-bound search runs.
    Solving,

    /// The solving process finished.
    Solved,
}

/// Final (or current) verdict of the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveStatus {
    /// Not solved yet.
    #[default]
    Unknown,

    /// Proven optimal incumbent.
    Optimal,

    /// Proven infeasible.
    Infeasible,

    /// Proven unbounded.
    Unbounded,

    /// Node limit reached.
    NodeLimit,

    /// Time limit reached.
    TimeLimit,

    /// Memory limit reached.
    MemLimit,

    /// Gap limit reached.
    GapLimit,

    /// Stopped by the user.
    Interrupted,

    /// Unrecoverable internal failure.
    Aborted,
}

impl SolveStatus {
    /// True if the status proves optimality of the incumbent.
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }

    /// True if the solve finished for a limit rather than a proof.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            SolveStatus::NodeLimit
                | SolveStatus::TimeLimit
                | SolveStatus::MemLimit
                | SolveStatus::GapLimit
                | SolveStatus::Interrupted
        )
    }
}

/// Outcome of a local bound tightening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tighten {
    /// The bound did not improve.
    Unchanged,

    /// The bound was tightened and recorded.
    Tightened,

    /// The tightening empties the domain.
    Infeasible,
}

/// Aggregated solve statistics.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Processed (focused) nodes.
    pub nnodes: u64,

    /// LP solves, diving included.
    pub nlps: u64,

    /// Executed separation rounds.
    pub nsepa_rounds: u64,

    /// Cuts applied to the LP.
    pub ncuts: u64,

    /// Executed propagation rounds.
    pub nprop_rounds: u64,

    /// Presolving rounds.
    pub npresol_rounds: u64,

    /// Local bound changes recorded during search.
    pub nboundchgs: u64,
}

/// Outcome of processing one focus node.
enum NodeOutcome {
    /// The node was closed; whether an LP was solved at it.
    Closed { had_lp: bool },

    /// The relaxation is unbounded; the whole solve stops.
    Unbounded,
}

/// Result of the enforcement stage.
enum Enforce {
    /// Some handler proved the node infeasible.
    Cutoff,

    /// A handler created children.
    Branched,

    /// The LP must be resolved (domain reduced, cut or constraint added).
    Resolve,

    /// All handlers accepted the LP solution.
    Feasible,

    /// Violations remain; branch.
    Branch,
}

/// The constraint integer programming engine.
pub struct Engine {
    /// Global parameter store.
    pub params: ParamStore,

    /// Plugin registry.
    pub plugins: PluginRegistry,

    /// Problem data (variables, objective).
    pub prob: Prob,

    /// Constraint pool.
    pub conss: ConsPool,

    /// LP relaxation.
    pub lp: Lp,

    /// Branch-and-bound tree.
    pub tree: Tree,

    /// Solution store.
    pub sols: SolStore,

    /// Solve statistics.
    pub stats: Stats,

    pub(crate) sepa_store: SepaStore,

    stage: Stage,
    status: SolveStatus,
    stopped: bool,
    clock: Clock,

    /// Objective cutoff in the transformed space: minimum of the
    /// external objective limit and the incumbent objective.
    cutoff: f64,

    active_nodesel: usize,
    primal_ray: Option<Solution>,
    last_deduced_var: Option<VarId>,
}

impl Engine {
    /// Create an engine with the default plugin set and the bundled
    /// simplex backend.
    pub fn new() -> CipResult<Self> {
        Self::with_solver(Box::new(SimplexSolver::default()))
    }

    /// Create an engine over a custom LP solver.
    pub fn with_solver(solver: Box<dyn LpSolver>) -> CipResult<Self> {
        let mut engine = Engine {
            params: ParamStore::new(),
            plugins: PluginRegistry::new(),
            prob: Prob::new(""),
            conss: ConsPool::new(),
            lp: Lp::new(solver),
            tree: Tree::new(),
            sols: SolStore::new(10),
            stats: Stats::default(),
            sepa_store: SepaStore::new(),
            stage: Stage::Init,
            status: SolveStatus::Unknown,
            stopped: false,
            clock: Clock::new(),
            cutoff: f64::INFINITY,
            active_nodesel: 0,
            primal_ray: None,
            last_deduced_var: None,
        };
        engine.register_core_params()?;
        engine.include_defaults()?;
        Ok(engine)
    }

    fn register_core_params(&mut self) -> CipResult<()> {
        let p = &mut self.params;
        p.add_real("limits/time", "maximal time in seconds to run", 1e20, 0.0, 1e20)?;
        p.add_longint("limits/nodes", "maximal number of nodes to process (-1: no limit)", -1, -1, i64::MAX)?;
        p.add_real("limits/memory", "maximal memory usage in MB", 1e20, 0.0, 1e20)?;
        p.add_real("limits/gap", "solving stops if the relative gap drops below this value", 0.0, 0.0, 1e20)?;
        p.add_int("separating/maxrounds", "maximal separation rounds per node (-1: unlimited)", 5, -1, i32::MAX)?;
        p.add_int("separating/maxroundsroot", "maximal separation rounds in the root node (-1: unlimited)", -1, -1, i32::MAX)?;
        p.add_real("separating/minefficacy", "minimal efficacy for a cut to enter the LP", 1e-4, 0.0, 1e20)?;
        p.add_int("limits/maxsol", "maximal number of stored feasible solutions", 10, 1, i32::MAX)?;
        p.add_int("presolving/maxrounds", "maximal presolving rounds (-1: unlimited)", -1, -1, i32::MAX)?;
        p.add_int("propagating/maxrounds", "maximal propagation rounds per node", 100, 1, i32::MAX)?;
        p.add_int("display/freq", "frequency of progress lines in processed nodes", 100, 1, i32::MAX)?;
        Ok(())
    }

    fn include_defaults(&mut self) -> CipResult<()> {
        self.include_cons_handler(Box::new(LinearConsHandler))?;
        self.include_cons_handler(Box::new(IntegralConsHandler))?;
        self.include_nodesel(Box::new(DfsNodesel))?;
        self.include_nodesel(Box::new(BestBoundNodesel))?;
        self.include_branchrule(Box::new(MostInfeasBranching))?;
        self.include_propagator(Box::new(PseudoObjProp))?;
        self.include_presolver(Box::new(DualfixPresolver))?;
        self.include_heuristic(Box::new(RoundDiveHeur))?;
        Ok(())
    }

    // === Plugin inclusion (registers the plugin's parameters) ===

    /// Register a constraint handler.
    pub fn include_cons_handler(&mut self, hdlr: Box<dyn ConsHandler>) -> CipResult<()> {
        self.params.add_int(
            &format!("constraints/{}/propfreq", hdlr.name()),
            "propagation frequency in depth levels (-1: never, 0: root only)",
            hdlr.prop_freq(),
            -1,
            i32::MAX,
        )?;
        self.plugins.add_cons_handler(hdlr)
    }

    /// Register a node selector.
    pub fn include_nodesel(&mut self, sel: Box<dyn NodeSelector>) -> CipResult<()> {
        self.params.add_int(
            &format!("nodeselection/{}/stdpriority", sel.name()),
            "priority of the selector in standard mode",
            sel.std_priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.params.add_int(
            &format!("nodeselection/{}/memsavepriority", sel.name()),
            "priority of the selector in memory-saving mode",
            sel.memsave_priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.plugins.add_nodesel(sel)
    }

    /// Register a branching rule.
    pub fn include_branchrule(&mut self, rule: Box<dyn BranchRule>) -> CipResult<()> {
        self.params.add_int(
            &format!("branching/{}/priority", rule.name()),
            "priority of the branching rule",
            rule.priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.plugins.add_branchrule(rule)
    }

    /// Register a separator.
    pub fn include_separator(&mut self, sepa: Box<dyn Separator>) -> CipResult<()> {
        let name = sepa.name();
        self.params.add_int(
            &format!("separating/{name}/maxrounds"),
            "maximal rounds of this separator per node (-1: unlimited)",
            -1,
            -1,
            i32::MAX,
        )?;
        self.params.add_int(
            &format!("separating/{name}/maxroundsroot"),
            "maximal rounds of this separator in the root (-1: unlimited)",
            -1,
            -1,
            i32::MAX,
        )?;
        self.params.add_int(
            &format!("separating/{name}/maxsepacuts"),
            "maximal cuts emitted per call",
            100,
            0,
            i32::MAX,
        )?;
        self.params.add_int(
            &format!("separating/{name}/maxsepacutsroot"),
            "maximal cuts emitted per call in the root",
            500,
            0,
            i32::MAX,
        )?;
        self.plugins.add_separator(sepa)
    }

    /// Register a propagator.
    pub fn include_propagator(&mut self, prop: Box<dyn Propagator>) -> CipResult<()> {
        self.params.add_int(
            &format!("propagating/{}/freq", prop.name()),
            "propagation frequency in depth levels (-1: never, 0: root only)",
            prop.freq(),
            -1,
            i32::MAX,
        )?;
        self.params.add_int(
            &format!("propagating/{}/priority", prop.name()),
            "priority of the propagator",
            prop.priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.plugins.add_propagator(prop)
    }

    /// Register a primal heuristic.
    pub fn include_heuristic(&mut self, heur: Box<dyn Heuristic>) -> CipResult<()> {
        self.params.add_int(
            &format!("heuristics/{}/freq", heur.name()),
            "calling frequency in nodes (-1: never)",
            heur.freq(),
            -1,
            i32::MAX,
        )?;
        self.params.add_int(
            &format!("heuristics/{}/priority", heur.name()),
            "priority of the heuristic",
            heur.priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.plugins.add_heuristic(heur)
    }

    /// Register a presolver.
    pub fn include_presolver(&mut self, presol: Box<dyn Presolver>) -> CipResult<()> {
        self.params.add_int(
            &format!("presolving/{}/priority", presol.name()),
            "priority of the presolver",
            presol.priority(),
            i32::MIN / 2,
            i32::MAX / 2,
        )?;
        self.plugins.add_presolver(presol)
    }

    /// Register a file reader.
    pub fn include_reader(&mut self, reader: Box<dyn Reader>) -> CipResult<()> {
        self.plugins.add_reader(reader)
    }

    /// Register a variable pricer.
    pub fn include_pricer(&mut self, pricer: Box<dyn Pricer>) -> CipResult<()> {
        self.plugins.add_pricer(pricer)
    }

    /// Register a conflict analyzer.
    pub fn include_conflict_analyzer(
        &mut self,
        analyzer: Box<dyn ConflictAnalyzer>,
    ) -> CipResult<()> {
        self.plugins.add_conflict_analyzer(analyzer)
    }

    // === Problem construction ===

    /// Start a fresh problem.
    pub fn create_prob(&mut self, name: impl Into<String>) -> CipResult<()> {
        if matches!(self.stage, Stage::Presolving | Stage::Solving) {
            return Err(CipError::InvalidData(
                "cannot create a problem while solving".into(),
            ));
        }
        self.prob = Prob::new(name);
        self.conss = ConsPool::new();
        self.tree = Tree::new();
        let max_sols = self.params.get_int("limits/maxsol").unwrap_or(10);
        self.sols = SolStore::new(max_sols.max(1) as usize);
        self.stats = Stats::default();
        self.status = SolveStatus::Unknown;
        self.cutoff = f64::INFINITY;
        self.primal_ray = None;
        self.stage = Stage::Problem;
        Ok(())
    }

    /// Set the objective sense.
    pub fn set_obj_sense(&mut self, sense: ObjSense) {
        self.prob.objsense = sense;
    }

    /// Add an original-space variable.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        obj: f64,
        lb: f64,
        ub: f64,
    ) -> CipResult<VarId> {
        self.prob.add_var(name, kind, obj, lb, ub)
    }

    /// Add an original-space linear constraint `lhs <= a^T x <= rhs`.
    pub fn add_linear_cons(
        &mut self,
        name: impl Into<String>,
        entries: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
    ) -> CipResult<ConsId> {
        let data = LinearConsData::new(
            entries.iter().map(|e| e.0).collect(),
            entries.iter().map(|e| e.1).collect(),
            lhs,
            rhs,
        )?;
        self.conss.add(
            name,
            LinearConsHandler::NAME,
            Box::new(data),
            ConsFlags {
                original: true,
                ..ConsFlags::default()
            },
            None,
        )
    }

    /// Set an external objective limit (original space). Nodes whose
    /// bound reaches it are pruned as if an incumbent of this value
    /// existed.
    pub fn set_objective_limit(&mut self, limit: f64) {
        let internal = match self.prob.objsense {
            ObjSense::Minimize => limit,
            ObjSense::Maximize => -limit,
        };
        self.cutoff = self.cutoff.min(internal);
    }

    /// Load a problem file through the reader registered for its
    /// extension.
    pub fn read_problem(&mut self, path: &std::path::Path) -> CipResult<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_owned();
        let idx = self
            .plugins
            .reader_for_extension(&ext)
            .ok_or_else(|| CipError::PluginNotFound(format!("reader for extension <{ext}>")))?;
        let mut readers = std::mem::take(&mut self.plugins.readers);
        let result = readers[idx].read(self, path);
        self.plugins.readers = readers;
        result
    }

    // === Result surface (observationally pure) ===

    /// Engine lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Solve verdict.
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Best known solution.
    pub fn best_solution(&self) -> Option<&Solution> {
        self.sols.best()
    }

    /// The primal ray for unbounded problems.
    pub fn primal_ray(&self) -> Option<&Solution> {
        self.primal_ray.as_ref()
    }

    /// Best primal bound in the original objective sense.
    pub fn primal_bound(&self) -> f64 {
        self.prob.external_obj(self.sols.upper_bound())
    }

    /// Best dual bound in the original objective sense.
    pub fn dual_bound(&self) -> f64 {
        let internal = match self.status {
            SolveStatus::Optimal => self.sols.upper_bound(),
            SolveStatus::Infeasible => f64::INFINITY,
            SolveStatus::Unbounded => f64::NEG_INFINITY,
            _ => self.global_lower_bound(),
        };
        self.prob.external_obj(internal)
    }

    /// Number of processed nodes.
    pub fn node_count(&self) -> u64 {
        self.stats.nnodes
    }

    /// Number of LP solves.
    pub fn lp_solve_count(&self) -> u64 {
        self.lp.nsolves
    }

    /// Number of separation rounds.
    pub fn separation_rounds(&self) -> u64 {
        self.stats.nsepa_rounds
    }

    /// Number of cuts applied to the LP.
    pub fn cuts_generated(&self) -> u64 {
        self.stats.ncuts
    }

    /// Cuts applied per separator name.
    pub fn cuts_of_separator(&self, name: &str) -> u64 {
        self.sepa_store.cuts_of(name)
    }

    /// Elapsed solve time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Raise the stopped flag; the engine unwinds cleanly at the next
    /// suspension point.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// True once the stopped flag was raised.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // === State helpers used by plugins ===

    /// Current objective cutoff (transformed space).
    pub fn cutoff_bound(&self) -> f64 {
        self.cutoff.min(self.sols.upper_bound())
    }

    /// Global lower bound: minimum over the focus node and all queued
    /// leaves (transformed space).
    pub fn global_lower_bound(&self) -> f64 {
        let mut bound = f64::INFINITY;
        for &id in self.tree.queue.slots() {
            bound = bound.min(self.tree.node(id).lower_bound);
        }
        if let Some(focus) = self.tree.focus() {
            bound = bound.min(self.tree.node(focus).lower_bound);
        }
        bound
    }

    /// Typed access to a constraint payload.
    pub fn cons_data<T: 'static>(&self, cons: ConsId) -> CipResult<&T> {
        let c = self.conss.get(cons);
        eprintln!("DEBUG cons_data hdlr={} name={} requested={} actual_debug={:?} requested_tid={:?} actual_tid={:?} literal_tid={:?}", c.hdlr, c.name, std::any::type_name::<T>(), c.data, std::any::TypeId::of::<T>(), c.data.as_any().type_id(), std::any::TypeId::of::<LinearConsData>());
        self.conss
            .get(cons)
            .data
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| CipError::InvalidData(format!("payload type mismatch on {cons:?}")))
    }

    /// Typed mutable access to a constraint payload.
    pub fn cons_data_mut<T: 'static>(&mut self, cons: ConsId) -> CipResult<&mut T> {
        self.conss
            .get_mut(cons)
            .data
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| CipError::InvalidData(format!("payload type mismatch on {cons:?}")))
    }

    /// Deactivate and release a constraint (presolve deletions).
    pub fn delete_cons(&mut self, cons: ConsId) -> CipResult<()> {
        self.conss.deactivate(cons)?;
        self.conss.release(cons)
    }

    /// Value of a variable in the current LP solution, expanding
    /// fixings and aggregations.
    pub fn lp_sol_value(&self, var: VarId) -> f64 {
        self.prob
            .resolve_value(var, &|v| self.lp.var_primal(v))
            .unwrap_or(f64::NAN)
    }

    /// Fractional integer variables of the current LP solution.
    pub fn lp_branch_candidates(&self) -> Vec<(VarId, f64)> {
        self.prob
            .active_vars()
            .into_iter()
            .filter(|&v| self.prob.var(v).kind.is_integral())
            .map(|v| (v, self.lp.var_primal(v)))
            .filter(|&(_, x)| crate::var::Variable::fractionality(x) > 1e-6)
            .collect()
    }

    /// Expand row entries over arbitrary variables into active LP
    /// columns and a constant offset absorbed by the row sides.
    pub(crate) fn expand_row_entries(
        &self,
        entries: &[(VarId, f64)],
    ) -> CipResult<(Vec<(usize, f64)>, f64)> {
        let mut cols: Vec<(usize, f64)> = Vec::with_capacity(entries.len());
        let mut offset = 0.0;
        let mut stack: Vec<(VarId, f64)> = entries.to_vec();
        let mut steps = 0usize;
        while let Some((v, a)) = stack.pop() {
            steps += 1;
            if steps > entries.len() + 8 * self.prob.nvars_total() {
                return Err(CipError::InvalidData(
                    "cycle in aggregation chain".into(),
                ));
            }
            match self.prob.var(v).status.clone() {
                VarStatus::Active => {
                    let col = self.lp.col_index(v).ok_or_else(|| {
                        CipError::InvalidData(format!("variable {v} has no LP column"))
                    })?;
                    cols.push((col, a));
                }
                VarStatus::Original => {
                    let t = self.prob.var(v).transformed.ok_or_else(|| {
                        CipError::InvalidData(format!("untransformed variable {v} in row"))
                    })?;
                    stack.push((t, a));
                }
                VarStatus::Fixed(value) => offset += a * value,
                VarStatus::Aggregated {
                    var: y,
                    scalar,
                    constant,
                } => {
                    offset += a * constant;
                    stack.push((y, a * scalar));
                }
                VarStatus::MultiAggregated {
                    vars,
                    scalars,
                    constant,
                } => {
                    offset += a * constant;
                    for (y, s) in vars.iter().zip(scalars.iter()) {
                        stack.push((*y, a * s));
                    }
                }
                VarStatus::Negated { var: y, constant } => {
                    offset += a * constant;
                    stack.push((y, -a));
                }
            }
        }
        Ok((cols, offset))
    }

    /// Add an LP row over variables, expanding fixed and aggregated
    /// entries into active columns and side adjustments.
    pub fn add_lp_row(
        &mut self,
        name: &str,
        entries: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
        local: bool,
    ) -> CipResult<RowId> {
        let (cols, offset) = self.expand_row_entries(entries)?;
        let depth = self.tree.focus_depth();
        self.lp.add_row(
            name,
            &cols,
            if lhs.is_finite() { lhs - offset } else { lhs },
            if rhs.is_finite() { rhs - offset } else { rhs },
            local,
            depth,
            false,
        )
    }

    /// Tighten the local lower bound of an active variable.
    ///
    /// Records the change on the focus node for undo; outside search the
    /// change is applied globally. Rejected while diving.
    pub fn tighten_local_lb(&mut self, var: VarId, bound: f64) -> CipResult<Tighten> {
        self.tighten_local(var, bound, BoundSide::Lower)
    }

    /// Tighten the local upper bound of an active variable.
    pub fn tighten_local_ub(&mut self, var: VarId, bound: f64) -> CipResult<Tighten> {
        self.tighten_local(var, bound, BoundSide::Upper)
    }

    fn tighten_local(&mut self, var: VarId, bound: f64, side: BoundSide) -> CipResult<Tighten> {
        if self.lp.is_diving() {
            return Err(CipError::InvalidData(
                "domain change while diving".into(),
            ));
        }
        let v = self.prob.var(var);
        if !v.is_active() {
            return Err(CipError::InvalidData(format!(
                "bound change on non-active variable {}",
                v.name
            )));
        }
        let integral = v.kind.is_integral();
        let bound = if integral && bound.is_finite() {
            match side {
                BoundSide::Lower => (bound - FEASTOL).ceil(),
                BoundSide::Upper => (bound + FEASTOL).floor(),
            }
        } else {
            bound
        };

        let (old, other) = match side {
            BoundSide::Lower => (v.local.lb, v.local.ub),
            BoundSide::Upper => (v.local.ub, v.local.lb),
        };
        let improves = match side {
            BoundSide::Lower => bound > old + EPS,
            BoundSide::Upper => bound < old - EPS,
        };
        if !improves {
            return Ok(Tighten::Unchanged);
        }
        let crosses = match side {
            BoundSide::Lower => bound > other + EPS,
            BoundSide::Upper => bound < other - EPS,
        };
        if crosses {
            self.last_deduced_var = Some(var);
            return Ok(Tighten::Infeasible);
        }

        if matches!(self.stage, Stage::Solving) {
            if let Some(focus) = self.tree.focus() {
                self.tree.node_mut(focus).change.bound_chgs.push(BoundChg {
                    var,
                    side,
                    old,
                    new: bound,
                });
                self.stats.nboundchgs += 1;
                let v = self.prob.var_mut(var);
                match side {
                    BoundSide::Lower => v.local.lb = bound,
                    BoundSide::Upper => v.local.ub = bound,
                }
                return Ok(Tighten::Tightened);
            }
        }

        // Outside the search the change is a global reduction.
        match side {
            BoundSide::Lower => self.prob.set_global_lb(var, bound)?,
            BoundSide::Upper => self.prob.set_global_ub(var, bound)?,
        }
        Ok(Tighten::Tightened)
    }

    /// Add a hole to the local domain of an active variable, recorded on
    /// the focus node.
    pub fn add_local_hole(&mut self, var: VarId, left: f64, right: f64) -> CipResult<()> {
        if self.lp.is_diving() {
            return Err(CipError::InvalidData("domain change while diving".into()));
        }
        let old_holes = self.prob.var(var).local.holes.clone();
        self.prob.var_mut(var).local.add_hole(left, right)?;
        if let Some(focus) = self.tree.focus() {
            self.tree
                .node_mut(focus)
                .change
                .hole_chgs
                .push(crate::tree::HoleChg {
                    var,
                    left,
                    right,
                    old_holes,
                });
        }
        Ok(())
    }

    /// Add a constraint locally at the focus node (undone on backtrack).
    pub fn add_cons_local(&mut self, cons: ConsId) -> CipResult<()> {
        let focus = self
            .tree
            .focus()
            .ok_or_else(|| CipError::InvalidData("local constraint without focus".into()))?;
        self.conss.activate(cons)?;
        self.conss.get_mut(cons).owner_node = Some(focus);
        self.conss.get_mut(cons).flags.local = true;
        self.tree.node_mut(focus).change.added_conss.push(cons);
        Ok(())
    }

    /// Disable a constraint locally at the focus node.
    pub fn disable_cons_local(&mut self, cons: ConsId) -> CipResult<()> {
        let focus = self
            .tree
            .focus()
            .ok_or_else(|| CipError::InvalidData("local disabling without focus".into()))?;
        self.conss.disable(cons);
        self.tree.node_mut(focus).change.disabled_conss.push(cons);
        Ok(())
    }

    /// Add a transformed variable during pricing, with its LP column.
    pub fn add_priced_var(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        obj: f64,
        lb: f64,
        ub: f64,
    ) -> CipResult<VarId> {
        let id = self.prob.add_trans_var(name, kind, obj, lb, ub)?;
        self.lp.add_col(id, obj, lb, ub)?;
        Ok(id)
    }

    // === Diving ===

    /// Open an LP dive (heuristic context).
    pub fn start_dive(&mut self) -> CipResult<()> {
        if !matches!(self.stage, Stage::Solving) {
            return Err(CipError::InvalidData("dive outside solving".into()));
        }
        self.lp.start_dive()
    }

    /// Close the LP dive, restoring the pre-dive state verbatim.
    pub fn end_dive(&mut self) -> CipResult<()> {
        self.lp.end_dive()
    }

    /// Change column bounds inside a dive.
    pub fn dive_set_bounds(&mut self, var: VarId, lb: f64, ub: f64) -> CipResult<()> {
        if !self.lp.is_diving() {
            return Err(CipError::InvalidData("dive bound change outside dive".into()));
        }
        let col = self
            .lp
            .col_index(var)
            .ok_or_else(|| CipError::InvalidData(format!("variable {var} has no LP column")))?;
        self.lp.set_col_bounds(col, lb, ub);
        Ok(())
    }

    /// Solve the dive LP. LP failures are recoverable here: the dive is
    /// reported spoiled via [`LpStatus::Error`] instead of an error.
    pub fn dive_solve_lp(&mut self) -> CipResult<LpStatus> {
        if !self.lp.is_diving() {
            return Err(CipError::InvalidData("dive solve outside dive".into()));
        }
        match self.lp.solve(true) {
            Ok(status) => Ok(status),
            Err(CipError::Lp(msg)) => {
                log::warn!("LP error inside dive, abandoning: {msg}");
                Ok(LpStatus::Error)
            }
            Err(e) => Err(e),
        }
    }

    // === Solutions ===

    /// Check a candidate solution against every handler's check slot.
    pub fn check_solution(
        &mut self,
        sol: &Solution,
        check_integrality: bool,
        check_lp_rows: bool,
    ) -> CipResult<bool> {
        let hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let order = self.plugins.hdlrs_by_check.clone();
        let mut feasible = true;
        let iter: Box<dyn Iterator<Item = usize>> = if order.is_empty() {
            Box::new(0..hdlrs.len())
        } else {
            Box::new(order.into_iter())
        };
        for i in iter {
            let hdlr = &hdlrs[i];
            let conss = if hdlr.needs_cons() {
                self.conss.enabled_of(hdlr.name())
            } else {
                Vec::new()
            };
            match hdlr.check(self, &conss, sol, check_integrality, check_lp_rows) {
                Ok(crate::cons::CheckResult::Feasible) => {}
                Ok(crate::cons::CheckResult::Infeasible) => {
                    feasible = false;
                    break;
                }
                Err(e) => {
                    self.plugins.cons_handlers = hdlrs;
                    return Err(e);
                }
            }
        }
        self.plugins.cons_handlers = hdlrs;
        Ok(feasible)
    }

    /// Offer a solution to the store: run the check pass, insert if
    /// feasible, tighten the cutoff if improving. Returns true when the
    /// solution became the new incumbent.
    pub fn try_solution(
        &mut self,
        mut sol: Solution,
        check_integrality: bool,
        check_lp_rows: bool,
    ) -> CipResult<bool> {
        sol.recompute_obj(&self.prob);
        if !self.check_solution(&sol, check_integrality, check_lp_rows)? {
            return Ok(false);
        }
        Ok(self.install_solution(sol))
    }

    /// Insert a checked-feasible solution and propagate the new bound.
    fn install_solution(&mut self, sol: Solution) -> bool {
        let obj = sol.obj;
        let improved = self.sols.add(sol);
        if improved {
            log::info!(
                "new incumbent with objective {:.6} after {} nodes",
                self.prob.external_obj(obj),
                self.stats.nnodes
            );
            let cutoff = self.cutoff_bound();
            self.queue_bound(cutoff);
            self.sols.prune(cutoff);
        }
        improved
    }

    /// Prune all queued leaves dominated by `upper`.
    pub fn queue_bound(&mut self, upper: f64) {
        if !upper.is_finite() {
            return;
        }
        let idx = self.active_nodesel;
        let sels = std::mem::take(&mut self.plugins.nodesels);
        if let Some(sel) = sels.get(idx) {
            self.tree.queue_bound(upper, &|a, b| sel.compare(a, b));
        }
        self.plugins.nodesels = sels;
    }

    // === Branching ===

    /// Create the canonical two children `var <= floor(value)` and
    /// `var >= ceil(value)` on the focus node and queue them.
    pub fn branch_on(&mut self, var: VarId, value: f64) -> CipResult<(NodeId, NodeId)> {
        let focus = self
            .tree
            .focus()
            .ok_or_else(|| CipError::InvalidData("branching without focus".into()))?;
        let v = self.prob.var(var);
        let (lb, ub) = (v.local.lb, v.local.ub);
        let down_ub = value.floor();
        let up_lb = value.ceil();
        if down_ub < lb - EPS || up_lb > ub + EPS || (up_lb - down_ub).abs() < 0.5 {
            return Err(CipError::BranchingFailed(format!(
                "value {value} of {} gives no disjoint children",
                self.prob.var(var).name
            )));
        }

        let down = self.tree.create_child(
            focus,
            vec![BoundChg {
                var,
                side: BoundSide::Upper,
                old: ub,
                new: down_ub,
            }],
        );
        let up = self.tree.create_child(
            focus,
            vec![BoundChg {
                var,
                side: BoundSide::Lower,
                old: lb,
                new: up_lb,
            }],
        );
        self.enqueue_node(down);
        self.enqueue_node(up);
        log::debug!(
            "branched on {} = {value}: children x <= {down_ub}, x >= {up_lb}",
            self.prob.var(var).name
        );
        Ok((down, up))
    }

    /// Insert a created node into the leaf queue.
    pub fn enqueue_node(&mut self, node: NodeId) {
        self.tree.node_mut(node).state = NodeState::Queued;
        let idx = self.active_nodesel;
        let sels = std::mem::take(&mut self.plugins.nodesels);
        if let Some(sel) = sels.get(idx) {
            self.tree.queue_insert(node, &|a, b| sel.compare(a, b));
        }
        self.plugins.nodesels = sels;
    }

    // === Solve ===

    /// Run the full solving process: transform, presolve, search.
    pub fn solve(&mut self) -> CipResult<SolveStatus> {
        if !matches!(self.stage, Stage::Problem) {
            return Err(CipError::InvalidData(
                "solve requires a problem in the problem stage".into(),
            ));
        }
        self.clock.start();
        self.stopped = false;
        self.params.set_solving(true);
        self.plugins.freeze();
        self.stage = Stage::Presolving;
        log::info!(
            "presolving problem <{}>: {} variables, {} constraints",
            self.prob.name,
            self.prob.orig_vars().len(),
            self.conss.len()
        );

        let result = self.solve_inner();
        // Leave the tree cleanly even on error paths.
        let _ = self.tree.switch_focus(None, &mut self.prob, &mut self.conss);
        self.params.set_solving(false);
        self.plugins.thaw();
        match result {
            Ok(status) => {
                self.status = status;
                self.stage = Stage::Solved;
                log::info!(
                    "solving finished: status {:?}, {} nodes, {} LP solves, primal {:.6}, dual {:.6}",
                    self.status,
                    self.stats.nnodes,
                    self.lp.nsolves,
                    self.primal_bound(),
                    self.dual_bound()
                );
                Ok(self.status)
            }
            Err(e) => {
                self.status = SolveStatus::Aborted;
                self.stage = Stage::Solved;
                log::error!("solve aborted in {e}");
                Err(e)
            }
        }
    }

    fn solve_inner(&mut self) -> CipResult<SolveStatus> {
        self.transform_prob()?;

        if let Some(verdict) = self.presolve_loop()? {
            return Ok(verdict);
        }

        self.stage = Stage::Solving;
        self.select_active_nodesel()?;
        self.setup_root()?;
        self.search_loop()
    }

    /// Create the transformed problem and constraints.
    fn transform_prob(&mut self) -> CipResult<()> {
        self.prob.transform()?;

        let originals: Vec<ConsId> = self
            .conss
            .all()
            .into_iter()
            .filter(|&c| self.conss.get(c).flags.original)
            .collect();

        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let mut result = Ok(());
        'outer: for cons in originals {
            let hdlr_name = self.conss.get(cons).hdlr.clone();
            let idx = match hdlrs.iter().position(|h| h.name() == hdlr_name) {
                Some(i) => i,
                None => {
                    result = Err(CipError::PluginNotFound(hdlr_name));
                    break 'outer;
                }
            };
            let data = match hdlrs[idx].transform(self, self.conss.get(cons).data.as_ref()) {
                Ok(d) => d,
                Err(e) => {
                    result = Err(e);
                    break 'outer;
                }
            };
            eprintln!("DEBUG before add, data tid={:?}", data.as_any().type_id());
            let name = format!("t_{}", self.conss.get(cons).name);
            let flags = ConsFlags {
                original: false,
                ..self.conss.get(cons).flags
            };
            let tcons = match self.conss.add(name, &hdlr_name, data, flags, None) {
                Ok(c) => c,
                Err(e) => {
                    result = Err(e);
                    break 'outer;
                }
            };
            if let Err(e) = self
                .conss
                .activate(tcons)
                .and_then(|_| hdlrs[idx].lock(self, tcons, 1))
            {
                result = Err(e);
                break 'outer;
            }
        }
        self.plugins.cons_handlers = hdlrs;
        result
    }

    /// Pick the node selector with the highest standard priority and
    /// configure the queue fast path.
    fn select_active_nodesel(&mut self) -> CipResult<()> {
        let mut best: Option<(i32, usize)> = None;
        for i in 0..self.plugins.nodesels.len() {
            let name = self.plugins.nodesels[i].name();
            let prio = self
                .params
                .get_int(&format!("nodeselection/{name}/stdpriority"))
                .unwrap_or_else(|_| self.plugins.nodesels[i].std_priority());
            if best.map_or(true, |(bp, _)| prio > bp) {
                best = Some((prio, i));
            }
        }
        let idx = best
            .map(|(_, i)| i)
            .ok_or_else(|| CipError::PluginNotFound("node selector".into()))?;
        self.active_nodesel = idx;
        let flag = self.plugins.nodesels[idx].lowest_bound_first();
        self.tree.queue.set_lowest_bound_first(flag);
        log::debug!(
            "active node selector: {}",
            self.plugins.nodesels[idx].name()
        );
        Ok(())
    }

    /// Create LP columns, the root node, and the initial relaxation.
    fn setup_root(&mut self) -> CipResult<()> {
        for v in self.prob.active_vars() {
            let var = self.prob.var(v);
            self.lp.add_col(v, var.obj, var.local.lb, var.local.ub)?;
        }

        let root = self.tree.create_root()?;
        self.tree.node_mut(root).lower_bound = f64::NEG_INFINITY;
        self.enqueue_node(root);

        // Initial relaxation rows from the handlers.
        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let mut result = Ok(());
        for hdlr in hdlrs.iter_mut() {
            let conss = self.conss.enabled_of(hdlr.name());
            if let Err(e) = hdlr.init_lp(self, &conss) {
                result = Err(e);
                break;
            }
        }
        self.plugins.cons_handlers = hdlrs;
        result
    }

    fn search_loop(&mut self) -> CipResult<SolveStatus> {
        loop {
            if let Some(limit) = self.check_limits() {
                return Ok(limit);
            }

            let cutoff = self.cutoff_bound();
            self.queue_bound(cutoff);

            let next = self.select_next_node()?;
            let node = match next {
                Some(n) => n,
                None => {
                    return Ok(if self.sols.is_empty() {
                        SolveStatus::Infeasible
                    } else {
                        SolveStatus::Optimal
                    });
                }
            };
            if self.tree.node(node).lower_bound >= self.cutoff_bound() - EPS {
                self.tree.node_mut(node).state = NodeState::DeadEnd;
                continue;
            }

            let common_depth = self
                .tree
                .switch_focus(Some(node), &mut self.prob, &mut self.conss)?;
            self.lp.remove_local_rows_above(common_depth);
            self.sepa_store.reset_node();
            self.stats.nnodes += 1;

            let display_freq = self.params.get_int("display/freq").unwrap_or(100) as u64;
            if self.stats.nnodes % display_freq.max(1) == 0 {
                log::info!(
                    "{} nodes ({} open), primal {:.6}, dual {:.6}, {} LPs",
                    self.stats.nnodes,
                    self.tree.queue.len(),
                    self.primal_bound(),
                    self.dual_bound(),
                    self.lp.nsolves
                );
            }

            let outcome = self.process_focus()?;
            let had_lp = match outcome {
                NodeOutcome::Unbounded => return Ok(SolveStatus::Unbounded),
                NodeOutcome::Closed { had_lp } => had_lp,
            };

            self.run_heuristics(had_lp)?;
        }
    }

    /// Pop the next focus node via the active selector.
    fn select_next_node(&mut self) -> CipResult<Option<NodeId>> {
        let idx = self.active_nodesel;
        let mut sels = std::mem::take(&mut self.plugins.nodesels);
        let result = (|| -> CipResult<Option<NodeId>> {
            let sel = &mut sels[idx];
            if let Some(chosen) = sel.select(self)? {
                self.tree.queue_remove(chosen, &|a, b| sel.compare(a, b));
                return Ok(Some(chosen));
            }
            Ok(self.tree.queue_pop(&|a, b| sel.compare(a, b)))
        })();
        self.plugins.nodesels = sels;
        result
    }

    fn check_limits(&mut self) -> Option<SolveStatus> {
        if self.stopped {
            return Some(SolveStatus::Interrupted);
        }
        if let Ok(limit) = self.params.get_real("limits/time") {
            if self.clock.elapsed() >= limit {
                self.stopped = true;
                return Some(SolveStatus::TimeLimit);
            }
        }
        if let Ok(limit) = self.params.get_longint("limits/nodes") {
            if limit >= 0 && self.stats.nnodes >= limit as u64 {
                self.stopped = true;
                return Some(SolveStatus::NodeLimit);
            }
        }
        if let Ok(limit) = self.params.get_real("limits/memory") {
            if self.mem_estimate_mb() >= limit {
                self.stopped = true;
                return Some(SolveStatus::MemLimit);
            }
        }
        if !self.sols.is_empty() {
            let primal = self.sols.upper_bound();
            let dual = self.global_lower_bound();
            let gap = if dual.is_infinite() {
                if dual > 0.0 {
                    // Queue exhausted: the incumbent is optimal.
                    return Some(SolveStatus::Optimal);
                }
                f64::INFINITY
            } else {
                (primal - dual).abs() / primal.abs().max(1e-10)
            };
            let limit = self.params.get_real("limits/gap").unwrap_or(0.0);
            if gap <= limit {
                return Some(if gap <= EPS {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::GapLimit
                });
            }
        }
        None
    }

    /// Rough block-memory estimate of the engine-owned arenas in MB.
    fn mem_estimate_mb(&self) -> f64 {
        let bytes = self.tree.nnodes() * 320
            + self.conss.len() * 256
            + self.lp.nrows() * 128
            + self.lp.ncols() * 64
            + self.sols.len() * 128;
        bytes as f64 / 1e6
    }

    /// Process the focus node: propagate, LP, separate, enforce, branch.
    fn process_focus(&mut self) -> CipResult<NodeOutcome> {
        let depth = self.tree.focus_depth();

        match self.propagate_loop(depth)? {
            PropResult::Cutoff => {
                self.conflict_hook(ConflictSource::PropagationCutoff {
                    var: self.last_deduced_var,
                })?;
                self.close_focus(NodeState::Infeasible);
                return Ok(NodeOutcome::Closed { had_lp: false });
            }
            _ => {}
        }

        // Pseudo solution shortcut: every variable at its objective
        // bound is a lower bound for the subtree; if that point is
        // feasible it is optimal for the whole subtree.
        if let Some(pseudo) = self.finite_pseudo_solution() {
            let pseudo_obj = pseudo.obj;
            if self.check_solution(&pseudo, true, true)? {
                if let Some(focus) = self.tree.focus() {
                    self.tree.node_mut(focus).update_lower_bound(pseudo_obj);
                }
                self.install_solution(pseudo);
                self.close_focus(NodeState::Feasible);
                return Ok(NodeOutcome::Closed { had_lp: false });
            }
        }

        let max_sepa_rounds = if depth == 0 {
            self.params.get_int("separating/maxroundsroot").unwrap_or(-1)
        } else {
            self.params.get_int("separating/maxrounds").unwrap_or(5)
        };
        let mut sepa_rounds = 0i32;
        let mut cycles = 0u32;

        loop {
            cycles += 1;
            if cycles > 1000 {
                return Err(CipError::InvalidData(
                    "node processing did not converge".into(),
                ));
            }
            if self.stopped {
                self.requeue_focus();
                return Ok(NodeOutcome::Closed { had_lp: true });
            }

            self.sync_lp_bounds();
            let status = self.solve_node_lp()?;
            match status {
                LpStatus::Infeasible => {
                    self.conflict_hook(ConflictSource::LpInfeasible)?;
                    self.close_focus(NodeState::Infeasible);
                    return Ok(NodeOutcome::Closed { had_lp: true });
                }
                LpStatus::Unbounded => {
                    self.capture_lp_ray();
                    return Ok(NodeOutcome::Unbounded);
                }
                LpStatus::Optimal => {}
                _ => {
                    // Iteration/time trouble: hand the node back and let
                    // the limit checks decide.
                    log::warn!("node LP ended with status {status:?}");
                    self.stopped = true;
                    self.requeue_focus();
                    return Ok(NodeOutcome::Closed { had_lp: true });
                }
            }

            let lp_obj = self.lp.objval() + self.prob.obj_offset;
            if let Some(focus) = self.tree.focus() {
                self.tree.node_mut(focus).update_lower_bound(lp_obj);
            }
            if lp_obj >= self.cutoff_bound() - EPS {
                self.close_focus(NodeState::Infeasible);
                return Ok(NodeOutcome::Closed { had_lp: true });
            }

            if !self.plugins.pricers.is_empty() && self.pricing_round()? {
                continue;
            }

            if max_sepa_rounds < 0 || sepa_rounds < max_sepa_rounds {
                sepa_rounds += 1;
                if self.separation_round(depth)? > 0 {
                    continue;
                }
            }

            match self.enforce_lp_solution()? {
                Enforce::Cutoff => {
                    self.close_focus(NodeState::Infeasible);
                    return Ok(NodeOutcome::Closed { had_lp: true });
                }
                Enforce::Branched => {
                    self.close_focus(NodeState::Branched);
                    return Ok(NodeOutcome::Closed { had_lp: true });
                }
                Enforce::Resolve => continue,
                Enforce::Feasible => {
                    let mut sol = Solution::new(SolOrigin::Lp);
                    for v in self.prob.active_vars() {
                        sol.set(v, self.lp.var_primal(v));
                    }
                    self.try_solution(sol, false, false)?;
                    self.close_focus(NodeState::Feasible);
                    return Ok(NodeOutcome::Closed { had_lp: true });
                }
                Enforce::Branch => match self.branching_step()? {
                    BranchResult::Branched => {
                        self.close_focus(NodeState::Branched);
                        return Ok(NodeOutcome::Closed { had_lp: true });
                    }
                    BranchResult::Cutoff => {
                        self.close_focus(NodeState::Infeasible);
                        return Ok(NodeOutcome::Closed { had_lp: true });
                    }
                    BranchResult::ReducedDom => continue,
                    BranchResult::DidNotRun => {
                        return Err(CipError::BranchingFailed(format!(
                            "node {:?}",
                            self.tree.focus()
                        )));
                    }
                },
            }
        }
    }

    /// Push the LP columns to the focus node's local bounds.
    fn sync_lp_bounds(&mut self) {
        for v in self.prob.active_vars() {
            if let Some(col) = self.lp.col_index(v) {
                let var = self.prob.var(v);
                self.lp.set_col_bounds(col, var.local.lb, var.local.ub);
            }
        }
    }

    fn solve_node_lp(&mut self) -> CipResult<LpStatus> {
        match self.lp.solve(true) {
            Ok(status) => {
                self.stats.nlps = self.lp.nsolves;
                Ok(status)
            }
            Err(CipError::Lp(msg)) => {
                log::warn!("LP solver failed at node: {msg}");
                Ok(LpStatus::Error)
            }
            Err(e) => Err(e),
        }
    }

    /// The pseudo solution if every active variable sits on a finite
    /// bound (objective recomputed).
    fn finite_pseudo_solution(&self) -> Option<Solution> {
        let mut sol = Solution::new(SolOrigin::Pseudo);
        for v in self.prob.active_vars() {
            let value = self.prob.pseudo_value(v);
            if !value.is_finite() {
                return None;
            }
            sol.set(v, value);
        }
        sol.recompute_obj(&self.prob);
        Some(sol)
    }

    /// Enforcement loop: handlers in decreasing enforcement priority.
    fn enforce_lp_solution(&mut self) -> CipResult<Enforce> {
        let mut hdlrs = std::mem::take(&mut self.plugins.cons_handlers);
        let order = self.plugins.hdlrs_by_enfo.clone();
        let mut outcome = Enforce::Feasible;
        let mut any_infeasible = false;

        let iter: Vec<usize> = if order.is_empty() {
            (0..hdlrs.len()).collect()
        } else {
            order
        };
        for i in iter {
            let hdlr = &mut hdlrs[i];
            if !self.conss.has_enforcement_work(hdlr.as_ref()) {
                continue;
            }
            let conss = if hdlr.needs_cons() {
                self.conss.enabled_of(hdlr.name())
            } else {
                Vec::new()
            };
            let result = match hdlr.enforce_lp(self, &conss) {
                Ok(r) => r,
                Err(e) => {
                    self.plugins.cons_handlers = hdlrs;
                    return Err(e);
                }
            };
            match result {
                EnforceResult::Cutoff => {
                    outcome = Enforce::Cutoff;
                    break;
                }
                EnforceResult::Branched => {
                    outcome = Enforce::Branched;
                    break;
                }
                EnforceResult::ReducedDom
                | EnforceResult::Separated
                | EnforceResult::ConsAdded => {
                    outcome = Enforce::Resolve;
                    break;
                }
                EnforceResult::Infeasible => any_infeasible = true,
                EnforceResult::Feasible => {}
            }
        }
        self.plugins.cons_handlers = hdlrs;

        Ok(match outcome {
            Enforce::Feasible if any_infeasible => Enforce::Branch,
            other => other,
        })
    }

    /// Branching rules in decreasing parameterized priority.
    fn branching_step(&mut self) -> CipResult<BranchResult> {
        let mut order: Vec<usize> = (0..self.plugins.branchrules.len()).collect();
        let prio = |engine: &Engine, i: usize| -> i32 {
            let name = engine.plugins.branchrules[i].name();
            engine
                .params
                .get_int(&format!("branching/{name}/priority"))
                .unwrap_or_else(|_| engine.plugins.branchrules[i].priority())
        };
        order.sort_by_key(|&i| -prio(self, i));

        let mut rules = std::mem::take(&mut self.plugins.branchrules);
        let mut result = BranchResult::DidNotRun;
        for i in order {
            let out = match rules[i].execute_lp(self) {
                Ok(r) => r,
                Err(e) => {
                    self.plugins.branchrules = rules;
                    return Err(e);
                }
            };
            if out != BranchResult::DidNotRun {
                result = out;
                break;
            }
        }
        self.plugins.branchrules = rules;
        Ok(result)
    }

    /// One pricing round; true if new columns entered the LP.
    fn pricing_round(&mut self) -> CipResult<bool> {
        let mut pricers = std::mem::take(&mut self.plugins.pricers);
        let mut order: Vec<usize> = (0..pricers.len()).collect();
        order.sort_by_key(|&i| -pricers[i].priority());
        let mut found = false;
        for i in order {
            let result = match pricers[i].price_redcost(self) {
                Ok(r) => r,
                Err(e) => {
                    self.plugins.pricers = pricers;
                    return Err(e);
                }
            };
            if result == PriceResult::FoundVars {
                found = true;
                break;
            }
        }
        self.plugins.pricers = pricers;
        Ok(found)
    }

    /// Invoke all conflict analyzers on an infeasibility proof.
    pub(crate) fn conflict_hook(&mut self, source: ConflictSource) -> CipResult<()> {
        let mut analyzers = std::mem::take(&mut self.plugins.conflict_analyzers);
        let mut result = Ok(());
        for a in analyzers.iter_mut() {
            if let Err(e) = a.analyze(self, source.clone()) {
                result = Err(e);
                break;
            }
        }
        self.plugins.conflict_analyzers = analyzers;
        result
    }

    fn close_focus(&mut self, state: NodeState) {
        if let Some(focus) = self.tree.focus() {
            self.tree.node_mut(focus).state = state;
        }
    }

    fn requeue_focus(&mut self) {
        if let Some(focus) = self.tree.focus() {
            self.enqueue_node(focus);
        }
    }

    /// Record the LP's unbounded ray as the engine's primal ray.
    fn capture_lp_ray(&mut self) {
        let mut ray = Solution::new(SolOrigin::Ray);
        for v in self.prob.active_vars() {
            ray.set(v, self.lp.var_ray(v));
        }
        self.primal_ray = Some(ray);
    }

    /// Build a ray witness from objective directions (presolve found the
    /// problem unbounded before any LP existed).
    pub(crate) fn capture_pseudo_ray(&mut self) {
        let mut ray = Solution::new(SolOrigin::Ray);
        for v in self.prob.active_vars() {
            let var = self.prob.var(v);
            if var.obj < 0.0 && var.ub() == f64::INFINITY {
                ray.set(v, 1.0);
            } else if var.obj > 0.0 && var.lb() == f64::NEG_INFINITY {
                ray.set(v, -1.0);
            }
        }
        self.primal_ray = Some(ray);
    }

    /// Order two nodes with the active selector (exposed for tests).
    pub fn compare_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        let sel = &self.plugins.nodesels[self.active_nodesel];
        sel.compare(self.tree.node(a), self.tree.node(b))
    }
}

impl ConsPool {
    /// True if the handler has enforcement work: either it needs no
    /// constraints, or it has enabled ones.
    fn has_enforcement_work(&self, hdlr: &dyn ConsHandler) -> bool {
        if !hdlr.needs_cons() {
            return true;
        }
        !self.enabled_of(hdlr.name()).is_empty()
    }
}
