//! Generic worklist fixpoint solver.
//!
//! Classic Kildall-style monotone framework: facts form a finite-height
//! lattice, transfer functions are monotone, so repeatedly meeting
//! predecessor facts and re-applying transfers terminates at the least
//! fixpoint. The solver performs no cycle analysis and never inspects a
//! fact's internals; worklist order is irrelevant to the result.
//!
//! Callers may pass a [`CancelToken`]; it is checked at worklist-pop
//! boundaries and a cancelled run returns its partial facts flagged
//! `incomplete`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::features::dataflow::domain::fact::DataflowResult;
use crate::shared::models::cfg::Cfg;
use crate::shared::models::ir::StmtId;

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A monotone dataflow analysis over statement-level facts.
///
/// `transfer_node` receives the fact flowing into the transfer and updates
/// the outgoing fact in place, reporting whether it changed. For a forward
/// analysis `source` is the node's IN and `target` its OUT; a backward
/// analysis reads OUT and writes IN.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// Fact at the boundary node (entry for forward, exit for backward).
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// Lattice bottom.
    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    fn transfer_node(&self, node: StmtId, source: &Self::Fact, target: &mut Self::Fact) -> bool;
}

/// Solves `analysis` over `cfg` to the least fixpoint.
pub fn solve<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
    solve_with_cancel(analysis, cfg, &CancelToken::default())
}

/// [`solve`] with cooperative cancellation.
pub fn solve_with_cancel<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &Cfg,
    cancel: &CancelToken,
) -> DataflowResult<A::Fact> {
    let mut result = DataflowResult::new();
    for &n in cfg.nodes() {
        result.in_facts.insert(n, analysis.new_initial_fact());
        result.out_facts.insert(n, analysis.new_initial_fact());
    }
    let boundary = if analysis.is_forward() {
        cfg.entry()
    } else {
        cfg.exit()
    };
    result.in_facts.insert(boundary, analysis.new_boundary_fact(cfg));
    result.out_facts.insert(boundary, analysis.new_boundary_fact(cfg));

    if analysis.is_forward() {
        solve_forward(analysis, cfg, cancel, &mut result);
    } else {
        solve_backward(analysis, cfg, cancel, &mut result);
    }
    result
}

fn solve_forward<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &Cfg,
    cancel: &CancelToken,
    result: &mut DataflowResult<A::Fact>,
) {
    let mut worklist: VecDeque<StmtId> = cfg.nodes().iter().copied().collect();
    let mut iterations = 0usize;
    while let Some(n) = worklist.pop_front() {
        if cancel.is_cancelled() {
            warn!(iterations, "forward solve cancelled before fixpoint");
            result.incomplete = true;
            return;
        }
        if cfg.is_entry(n) {
            continue;
        }
        iterations += 1;

        let mut in_fact = analysis.new_initial_fact();
        for p in cfg.preds_of(n) {
            if let Some(out) = result.out_facts.get(&p) {
                analysis.meet_into(out, &mut in_fact);
            }
        }
        let changed = {
            let out = result
                .out_facts
                .entry(n)
                .or_insert_with(|| analysis.new_initial_fact());
            analysis.transfer_node(n, &in_fact, out)
        };
        result.in_facts.insert(n, in_fact);

        if changed {
            for s in cfg.succs_of(n) {
                worklist.push_back(s);
            }
        }
    }
    debug!(iterations, "forward fixpoint reached");
}

fn solve_backward<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &Cfg,
    cancel: &CancelToken,
    result: &mut DataflowResult<A::Fact>,
) {
    let mut worklist: VecDeque<StmtId> = cfg.nodes().iter().copied().collect();
    let mut iterations = 0usize;
    while let Some(n) = worklist.pop_front() {
        if cancel.is_cancelled() {
            warn!(iterations, "backward solve cancelled before fixpoint");
            result.incomplete = true;
            return;
        }
        if cfg.is_exit(n) {
            continue;
        }
        iterations += 1;

        let mut out_fact = analysis.new_initial_fact();
        for s in cfg.succs_of(n) {
            if let Some(in_f) = result.in_facts.get(&s) {
                analysis.meet_into(in_f, &mut out_fact);
            }
        }
        let changed = {
            let in_f = result
                .in_facts
                .entry(n)
                .or_insert_with(|| analysis.new_initial_fact());
            analysis.transfer_node(n, &out_fact, in_f)
        };
        result.out_facts.insert(n, out_fact);

        if changed {
            for p in cfg.preds_of(n) {
                worklist.push_back(p);
            }
        }
    }
    debug!(iterations, "backward fixpoint reached");
}
