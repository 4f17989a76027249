//! Control-flow graph facade.
//!
//! One CFG per method, over statement handles. Entry and exit are synthetic
//! `Nop` statements so every method has a unique boundary node in both
//! directions. Edges carry the branch kind; switch-case values live on the
//! edges, which keeps the successor relation the single source of truth for
//! control flow.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::ir::{MethodId, StmtId};

/// Control-flow edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Fall-through.
    Normal,
    /// True branch of a conditional.
    IfTrue,
    /// False branch of a conditional.
    IfFalse,
    /// Switch case with its case value.
    SwitchCase(i32),
    /// Switch default target.
    SwitchDefault,
}

/// A directed CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: StmtId,
    pub target: StmtId,
    pub kind: EdgeKind,
}

/// Intraprocedural CFG with unique entry and exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cfg {
    method: MethodId,
    entry: StmtId,
    exit: StmtId,
    nodes: Vec<StmtId>,
    out_edges: FxHashMap<StmtId, Vec<Edge>>,
    in_edges: FxHashMap<StmtId, Vec<Edge>>,
}

impl Cfg {
    #[inline]
    pub fn method(&self) -> MethodId {
        self.method
    }

    #[inline]
    pub fn entry(&self) -> StmtId {
        self.entry
    }

    #[inline]
    pub fn exit(&self) -> StmtId {
        self.exit
    }

    #[inline]
    pub fn is_entry(&self, n: StmtId) -> bool {
        n == self.entry
    }

    #[inline]
    pub fn is_exit(&self, n: StmtId) -> bool {
        n == self.exit
    }

    #[inline]
    pub fn nodes(&self) -> &[StmtId] {
        &self.nodes
    }

    pub fn out_edges_of(&self, n: StmtId) -> &[Edge] {
        self.out_edges.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_edges_of(&self, n: StmtId) -> &[Edge] {
        self.in_edges.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn succs_of(&self, n: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.out_edges_of(n).iter().map(|e| e.target)
    }

    pub fn preds_of(&self, n: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.in_edges_of(n).iter().map(|e| e.source)
    }
}

/// Builder used by the front-end layer (and tests) to assemble CFGs.
#[derive(Debug)]
pub struct CfgBuilder {
    method: MethodId,
    entry: StmtId,
    exit: StmtId,
    nodes: Vec<StmtId>,
    edges: Vec<Edge>,
}

impl CfgBuilder {
    /// `entry` and `exit` should be `Nop` statements of `method`; they are
    /// registered as nodes up front.
    pub fn new(method: MethodId, entry: StmtId, exit: StmtId) -> Self {
        Self {
            method,
            entry,
            exit,
            nodes: vec![entry, exit],
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, n: StmtId) -> &mut Self {
        if !self.nodes.contains(&n) {
            self.nodes.push(n);
        }
        self
    }

    pub fn add_edge(&mut self, source: StmtId, target: StmtId, kind: EdgeKind) -> &mut Self {
        self.add_node(source);
        self.add_node(target);
        self.edges.push(Edge {
            source,
            target,
            kind,
        });
        self
    }

    pub fn build(self) -> Cfg {
        let mut out_edges: FxHashMap<StmtId, Vec<Edge>> = FxHashMap::default();
        let mut in_edges: FxHashMap<StmtId, Vec<Edge>> = FxHashMap::default();
        for e in &self.edges {
            out_edges.entry(e.source).or_default().push(*e);
            in_edges.entry(e.target).or_default().push(*e);
        }
        Cfg {
            method: self.method,
            entry: self.entry,
            exit: self.exit,
            nodes: self.nodes,
            out_edges,
            in_edges,
        }
    }
}
