//! Worklist solver for interprocedural dataflow.
//!
//! Same monotone-framework argument as the intraprocedural solver, but facts
//! flow along typed ICFG edges: every incoming edge is transformed by the
//! analysis's edge transfer before it is met into the node's IN fact. IN
//! facts accumulate monotonically across visits instead of being rebuilt.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::features::dataflow::domain::fact::DataflowResult;
use crate::features::dataflow::infrastructure::solver::CancelToken;
use crate::features::interproc::icfg::{Icfg, IcfgEdge};
use crate::shared::models::ir::StmtId;

/// A monotone analysis over ICFG nodes with edge-aware transfers.
pub trait InterDataflowAnalysis {
    type Fact: Clone + PartialEq;

    /// Fact at an entry node of an entry method.
    fn new_boundary_fact(&self, node: StmtId) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    fn transfer_node(&self, node: StmtId, in_fact: &Self::Fact, out: &mut Self::Fact) -> bool;

    /// Transforms the OUT fact of an edge's source for flow along `edge`.
    fn transfer_edge(&self, edge: &IcfgEdge, source_out: &Self::Fact) -> Self::Fact;
}

pub fn solve_inter<A: InterDataflowAnalysis>(analysis: &A, icfg: &Icfg) -> DataflowResult<A::Fact> {
    solve_inter_with_cancel(analysis, icfg, &CancelToken::default())
}

pub fn solve_inter_with_cancel<A: InterDataflowAnalysis>(
    analysis: &A,
    icfg: &Icfg,
    cancel: &CancelToken,
) -> DataflowResult<A::Fact> {
    let mut result = DataflowResult::new();
    for &n in icfg.nodes() {
        result.in_facts.insert(n, analysis.new_initial_fact());
        result.out_facts.insert(n, analysis.new_initial_fact());
    }
    for &entry in icfg.entry_nodes() {
        result.in_facts.insert(entry, analysis.new_boundary_fact(entry));
        result.out_facts.insert(entry, analysis.new_boundary_fact(entry));
    }

    let mut worklist: VecDeque<StmtId> = icfg.nodes().iter().copied().collect();
    let mut iterations = 0usize;
    while let Some(n) = worklist.pop_front() {
        if cancel.is_cancelled() {
            warn!(iterations, "interprocedural solve cancelled before fixpoint");
            result.incomplete = true;
            return result;
        }
        iterations += 1;

        let mut in_fact = result
            .in_facts
            .get(&n)
            .cloned()
            .unwrap_or_else(|| analysis.new_initial_fact());
        for e in icfg.in_edges_of(n) {
            if let Some(src_out) = result.out_facts.get(&e.source) {
                let transferred = analysis.transfer_edge(e, src_out);
                analysis.meet_into(&transferred, &mut in_fact);
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
            for s in icfg.succs_of(n) {
                worklist.push_back(s);
            }
        }
    }
    debug!(iterations, "interprocedural fixpoint reached");
    result
}
