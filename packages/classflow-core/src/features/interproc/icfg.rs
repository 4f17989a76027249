//! Interprocedural CFG.
//!
//! Overlay of the per-method CFGs and a call graph. Within a method, edges
//! stay `Normal` except at resolved call sites, whose fall-through edges
//! become `CallToReturn`. Each call-graph edge contributes a `Call` edge to
//! the callee's entry and `Return` edges from the callee's exit back to the
//! call site's return nodes.
//!
//! Call sites the call graph could not resolve keep plain `Normal`
//! out-edges: with no Call/Return edge pair their result variable simply
//! never receives a binding.

use rustc_hash::FxHashMap;

use crate::error::{AnalysisError, Result};
use crate::features::callgraph::call_graph::CallGraph;
use crate::shared::models::cfg::Cfg;
use crate::shared::models::ir::{MethodId, Program, StmtId, StmtKind, VarId};

/// Per-method CFGs, keyed by method. Produced by the front-end layer.
pub type CfgMap = FxHashMap<MethodId, Cfg>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    /// Intraprocedural edge away from call sites.
    Normal,
    /// Call site to its fall-through node.
    CallToReturn,
    /// Call site to callee entry.
    Call,
    /// Callee exit to a return node of the call site.
    Return {
        call_site: StmtId,
        ret_vars: Vec<VarId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcfgEdge {
    pub source: StmtId,
    pub target: StmtId,
    pub kind: IcfgEdgeKind,
}

#[derive(Debug, Clone, Default)]
pub struct Icfg {
    nodes: Vec<StmtId>,
    out_edges: FxHashMap<StmtId, Vec<IcfgEdge>>,
    in_edges: FxHashMap<StmtId, Vec<IcfgEdge>>,
    entry_nodes: Vec<StmtId>,
    containing: FxHashMap<StmtId, MethodId>,
}

impl Icfg {
    /// Assembles the ICFG over the call graph's reachable methods.
    pub fn build(program: &Program, cfgs: &CfgMap, cg: &CallGraph) -> Result<Icfg> {
        let mut icfg = Icfg::default();

        for &m in cg.reachable_methods() {
            let cfg = cfgs.get(&m).ok_or_else(|| {
                AnalysisError::config(format!("no CFG supplied for reachable method {m:?}"))
            })?;
            for &n in cfg.nodes() {
                icfg.nodes.push(n);
                icfg.containing.insert(n, m);
            }
        }

        for &m in cg.reachable_methods() {
            let cfg = &cfgs[&m];
            for &n in cfg.nodes() {
                let is_resolved_call = matches!(program.stmt(n).kind, StmtKind::Invoke(_))
                    && !cg.edges_out_of(n).is_empty();
                for e in cfg.out_edges_of(n) {
                    let kind = if is_resolved_call {
                        IcfgEdgeKind::CallToReturn
                    } else {
                        IcfgEdgeKind::Normal
                    };
                    icfg.add_edge(IcfgEdge {
                        source: n,
                        target: e.target,
                        kind,
                    });
                    if is_resolved_call {
                        for ce in cg.edges_out_of(n) {
                            let callee_cfg = cfgs.get(&ce.callee).ok_or_else(|| {
                                AnalysisError::config(format!(
                                    "no CFG supplied for callee {:?}",
                                    ce.callee
                                ))
                            })?;
                            icfg.add_edge(IcfgEdge {
                                source: callee_cfg.exit(),
                                target: e.target,
                                kind: IcfgEdgeKind::Return {
                                    call_site: n,
                                    ret_vars: program.method(ce.callee).return_vars().to_vec(),
                                },
                            });
                        }
                    }
                }
                if is_resolved_call {
                    for ce in cg.edges_out_of(n) {
                        let callee_cfg = cfgs.get(&ce.callee).ok_or_else(|| {
                            AnalysisError::config(format!(
                                "no CFG supplied for callee {:?}",
                                ce.callee
                            ))
                        })?;
                        icfg.add_edge(IcfgEdge {
                            source: n,
                            target: callee_cfg.entry(),
                            kind: IcfgEdgeKind::Call,
                        });
                    }
                }
            }
        }

        for &m in cg.entries() {
            if let Some(cfg) = cfgs.get(&m) {
                icfg.entry_nodes.push(cfg.entry());
            }
        }
        Ok(icfg)
    }

    fn add_edge(&mut self, edge: IcfgEdge) {
        self.in_edges.entry(edge.target).or_default().push(edge.clone());
        self.out_edges.entry(edge.source).or_default().push(edge);
    }

    #[inline]
    pub fn nodes(&self) -> &[StmtId] {
        &self.nodes
    }

    /// Entry nodes of the program's entry methods.
    #[inline]
    pub fn entry_nodes(&self) -> &[StmtId] {
        &self.entry_nodes
    }

    pub fn in_edges_of(&self, n: StmtId) -> &[IcfgEdge] {
        self.in_edges.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn out_edges_of(&self, n: StmtId) -> &[IcfgEdge] {
        self.out_edges.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn succs_of(&self, n: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.out_edges_of(n).iter().map(|e| e.target)
    }

    pub fn containing_method_of(&self, n: StmtId) -> Option<MethodId> {
        self.containing.get(&n).copied()
    }
}
