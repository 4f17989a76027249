//! Parallel fan-out of an intraprocedural analysis.
//!
//! Per-method CFGs are independent, so one analysis instance can solve many
//! of them on the rayon pool. Shared-mutable machinery (call graphs, pointer
//! flow graphs) stays off this path.

use rayon::prelude::*;

use crate::features::dataflow::domain::fact::DataflowResult;
use crate::features::dataflow::infrastructure::solver::{solve, DataflowAnalysis};
use crate::shared::models::cfg::Cfg;

/// Solves `analysis` over every CFG in `cfgs`, in parallel. Results are in
/// input order and identical to sequential [`solve`] runs.
pub fn solve_parallel<A>(analysis: &A, cfgs: &[Cfg]) -> Vec<DataflowResult<A::Fact>>
where
    A: DataflowAnalysis + Sync,
    A::Fact: Send,
{
    cfgs.par_iter().map(|cfg| solve(analysis, cfg)).collect()
}
