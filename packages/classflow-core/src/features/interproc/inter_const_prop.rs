//! Interprocedural constant propagation.
//!
//! Reuses the intraprocedural transfer for non-call nodes; the
//! interprocedural semantics live on the ICFG edges:
//!
//! - `Normal` is the identity,
//! - `CallToReturn` kills the call site's result binding so the only source
//!   of the result is the matching `Return` edge,
//! - `Call` binds each integer-holding formal to its argument's value at
//!   the call site,
//! - `Return` binds the call site's result to the meet of the callee's
//!   return variables.

use crate::error::Result;
use crate::features::callgraph::cha::build_call_graph;
use crate::features::callgraph::call_graph::CallGraph;
use crate::features::dataflow::analysis::const_prop::ConstantPropagation;
use crate::features::dataflow::domain::fact::{CPFact, DataflowResult};
use crate::features::dataflow::domain::value::Value;
use crate::features::dataflow::infrastructure::solver::{CancelToken, DataflowAnalysis};
use crate::features::interproc::icfg::{CfgMap, Icfg, IcfgEdge, IcfgEdgeKind};
use crate::features::interproc::inter_solver::{
    solve_inter_with_cancel, InterDataflowAnalysis,
};
use crate::shared::models::hierarchy::ClassHierarchy;
use crate::shared::models::ir::{MethodId, Program, StmtId, StmtKind};

pub struct InterConstantPropagation<'p> {
    program: &'p Program,
    icfg: &'p Icfg,
    cp: ConstantPropagation<'p>,
}

impl<'p> InterConstantPropagation<'p> {
    pub fn new(program: &'p Program, icfg: &'p Icfg) -> Self {
        Self {
            program,
            icfg,
            cp: ConstantPropagation::new(program),
        }
    }

    fn is_call_node(&self, node: StmtId) -> bool {
        matches!(self.program.stmt(node).kind, StmtKind::Invoke(_))
    }
}

impl InterDataflowAnalysis for InterConstantPropagation<'_> {
    type Fact = CPFact;

    fn new_boundary_fact(&self, node: StmtId) -> CPFact {
        let mut fact = CPFact::new();
        if let Some(m) = self.icfg.containing_method_of(node) {
            for &param in self.program.method(m).params() {
                if self.program.var(param).ty.can_hold_int() {
                    fact.update(param, Value::Nac);
                }
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CPFact {
        CPFact::new()
    }

    fn meet_into(&self, fact: &CPFact, target: &mut CPFact) {
        self.cp.meet_into(fact, target);
    }

    fn transfer_node(&self, node: StmtId, in_fact: &CPFact, out: &mut CPFact) -> bool {
        if self.is_call_node(node) {
            // The call/return edges carry the interesting semantics.
            out.copy_from(in_fact)
        } else {
            self.cp.transfer_node(node, in_fact, out)
        }
    }

    fn transfer_edge(&self, edge: &IcfgEdge, source_out: &CPFact) -> CPFact {
        match &edge.kind {
            IcfgEdgeKind::Normal => source_out.clone(),
            IcfgEdgeKind::CallToReturn => {
                let mut fact = source_out.clone();
                if let StmtKind::Invoke(inv) = &self.program.stmt(edge.source).kind {
                    if let Some(r) = inv.result {
                        fact.remove(r);
                    }
                }
                fact
            }
            IcfgEdgeKind::Call => {
                let mut fact = CPFact::new();
                let (Some(callee), StmtKind::Invoke(inv)) = (
                    self.icfg.containing_method_of(edge.target),
                    &self.program.stmt(edge.source).kind,
                ) else {
                    return fact;
                };
                let params = self.program.method(callee).params();
                for (&param, &arg) in params.iter().zip(inv.args.iter()) {
                    if self.program.var(param).ty.can_hold_int() {
                        fact.update(param, source_out.get(arg));
                    }
                }
                fact
            }
            IcfgEdgeKind::Return {
                call_site,
                ret_vars,
            } => {
                let mut fact = CPFact::new();
                let mut ret = Value::Undef;
                for &v in ret_vars {
                    ret = ret.meet(source_out.get(v));
                }
                if let StmtKind::Invoke(inv) = &self.program.stmt(*call_site).kind {
                    if let Some(r) = inv.result {
                        if self.program.var(r).ty.can_hold_int() {
                            fact.update(r, ret);
                        }
                    }
                }
                fact
            }
        }
    }
}

/// Result bundle of one interprocedural CP run.
#[derive(Debug)]
pub struct InterCpResult {
    pub call_graph: CallGraph,
    pub icfg: Icfg,
    pub dataflow: DataflowResult<CPFact>,
}

/// Builds the CHA call graph and ICFG rooted at `entry` and solves
/// interprocedural constant propagation over it.
pub fn run_inter_const_prop(
    program: &Program,
    hierarchy: &ClassHierarchy,
    cfgs: &CfgMap,
    entry: MethodId,
) -> Result<InterCpResult> {
    run_inter_const_prop_with_cancel(program, hierarchy, cfgs, entry, &CancelToken::default())
}

pub fn run_inter_const_prop_with_cancel(
    program: &Program,
    hierarchy: &ClassHierarchy,
    cfgs: &CfgMap,
    entry: MethodId,
    cancel: &CancelToken,
) -> Result<InterCpResult> {
    let call_graph = build_call_graph(program, hierarchy, entry)?;
    let icfg = Icfg::build(program, cfgs, &call_graph)?;
    let dataflow = {
        let analysis = InterConstantPropagation::new(program, &icfg);
        solve_inter_with_cancel(&analysis, &icfg, cancel)
    };
    Ok(InterCpResult {
        call_graph,
        icfg,
        dataflow,
    })
}
