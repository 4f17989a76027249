//! Call-graph model.
//!
//! Reachable methods, entry methods, and `(kind, call site, callee)` edges
//! with both per-call-site and per-callee indexes. A method enters the
//! reachable set exactly once; duplicate edges are idempotent.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::shared::models::ir::{CallKind, MethodId, Program, StmtId, StmtKind};

/// One resolved call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: StmtId,
    pub callee: MethodId,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    entries: Vec<MethodId>,
    reachable: Vec<MethodId>,
    reachable_set: FxHashSet<MethodId>,
    edges: Vec<CallEdge>,
    edge_set: FxHashSet<(StmtId, MethodId)>,
    out_edges: FxHashMap<StmtId, Vec<CallEdge>>,
    in_edges: FxHashMap<MethodId, Vec<CallEdge>>,
    call_sites: FxHashMap<MethodId, Vec<StmtId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, m: MethodId) {
        if !self.entries.contains(&m) {
            self.entries.push(m);
        }
    }

    /// Marks `m` reachable, collecting its call sites on first insertion.
    /// Returns false (a no-op) when it already was.
    pub fn add_reachable_method(&mut self, program: &Program, m: MethodId) -> bool {
        if !self.reachable_set.insert(m) {
            return false;
        }
        self.reachable.push(m);
        let sites: Vec<StmtId> = program
            .method(m)
            .stmts()
            .iter()
            .copied()
            .filter(|&s| matches!(program.stmt(s).kind, StmtKind::Invoke(_)))
            .collect();
        self.call_sites.insert(m, sites);
        true
    }

    /// Inserts an edge; duplicate `(call site, callee)` pairs are no-ops.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert((edge.call_site, edge.callee)) {
            return false;
        }
        self.edges.push(edge);
        self.out_edges.entry(edge.call_site).or_default().push(edge);
        self.in_edges.entry(edge.callee).or_default().push(edge);
        true
    }

    #[inline]
    pub fn is_reachable(&self, m: MethodId) -> bool {
        self.reachable_set.contains(&m)
    }

    /// Reachable methods in discovery order.
    #[inline]
    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.reachable
    }

    #[inline]
    pub fn entries(&self) -> &[MethodId] {
        &self.entries
    }

    #[inline]
    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Invoke statements inside a reachable method.
    pub fn call_sites_in(&self, m: MethodId) -> &[StmtId] {
        self.call_sites.get(&m).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outgoing edges of a call site.
    pub fn edges_out_of(&self, call_site: StmtId) -> &[CallEdge] {
        self.out_edges
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn callees_of(&self, call_site: StmtId) -> impl Iterator<Item = MethodId> + '_ {
        self.edges_out_of(call_site).iter().map(|e| e.callee)
    }

    /// Incoming edges of a method.
    pub fn callers_of(&self, m: MethodId) -> &[CallEdge] {
        self.in_edges.get(&m).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ir::ProgramBuilder;

    #[test]
    fn test_reachable_is_once_only() {
        let mut b = ProgramBuilder::new();
        let c = b.add_class("A", None, vec![], false, false);
        let m = b.add_method(c, "m()", false);
        let program = b.finish();

        let mut cg = CallGraph::new();
        assert!(cg.add_reachable_method(&program, m));
        assert!(!cg.add_reachable_method(&program, m), "second add is a no-op");
        assert_eq!(cg.reachable_methods(), &[m]);
    }

    #[test]
    fn test_duplicate_edges_idempotent() {
        let edge = CallEdge {
            kind: CallKind::Static,
            call_site: StmtId(0),
            callee: MethodId(1),
        };
        let mut cg = CallGraph::new();
        assert!(cg.add_edge(edge));
        assert!(!cg.add_edge(edge));
        assert_eq!(cg.edges().len(), 1);
        assert_eq!(cg.callees_of(StmtId(0)).collect::<Vec<_>>(), vec![MethodId(1)]);
        assert_eq!(cg.callers_of(MethodId(1)).len(), 1);
    }
}
