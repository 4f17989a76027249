//! Pointer universe shared by both Andersen solvers.
//!
//! The pointer-flow graph and its points-to sets are generic over the
//! pointer key and the object handle, so the context-insensitive solver
//! instantiates them with plain [`Pointer`]/[`ObjId`] and the
//! context-sensitive solver with their context-qualified counterparts.
//!
//! Invariants: self-loop edges are illegal (rejected), duplicate edges are
//! idempotent, and points-to sets only ever grow.

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::pta::domain::heap::ObjId;
use crate::shared::models::ir::{FieldId, VarId};

/// Context-insensitive pointer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    Var(VarId),
    InstanceField(ObjId, FieldId),
    StaticField(FieldId),
    ArrayIndex(ObjId),
}

/// A set of abstract objects.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsToSet<O: Copy + Eq + Hash> {
    objs: FxHashSet<O>,
}

impl<O: Copy + Eq + Hash> Default for PointsToSet<O> {
    fn default() -> Self {
        Self {
            objs: FxHashSet::default(),
        }
    }
}

impl<O: Copy + Eq + Hash> PointsToSet<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: O) -> Self {
        let mut s = Self::default();
        s.add(obj);
        s
    }

    /// Returns true when the object was not yet present.
    pub fn add(&mut self, obj: O) -> bool {
        self.objs.insert(obj)
    }

    #[inline]
    pub fn contains(&self, obj: O) -> bool {
        self.objs.contains(&obj)
    }

    pub fn iter(&self) -> impl Iterator<Item = O> + '_ {
        self.objs.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}

/// Inclusion edges between pointers plus the points-to set of each pointer.
#[derive(Debug, Clone)]
pub struct PointerFlowGraph<P, O>
where
    P: Clone + Eq + Hash,
    O: Copy + Eq + Hash,
{
    succs: FxHashMap<P, FxHashSet<P>>,
    pts: FxHashMap<P, PointsToSet<O>>,
    num_edges: usize,
}

impl<P, O> Default for PointerFlowGraph<P, O>
where
    P: Clone + Eq + Hash,
    O: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self {
            succs: FxHashMap::default(),
            pts: FxHashMap::default(),
            num_edges: 0,
        }
    }
}

impl<P, O> PointerFlowGraph<P, O>
where
    P: Clone + Eq + Hash,
    O: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the inclusion edge `source → target`. Self-loops are illegal
    /// and duplicate edges are no-ops; both return false.
    pub fn add_edge(&mut self, source: P, target: P) -> bool {
        if source == target {
            return false;
        }
        let inserted = self.succs.entry(source).or_default().insert(target);
        if inserted {
            self.num_edges += 1;
        }
        inserted
    }

    pub fn succs_of(&self, p: &P) -> impl Iterator<Item = &P> {
        self.succs.get(p).into_iter().flatten()
    }

    /// Current points-to set of `p`, if it has one.
    pub fn points_to(&self, p: &P) -> Option<&PointsToSet<O>> {
        self.pts.get(p)
    }

    /// Unions `pts` into `pt(p)` and returns the delta that was new.
    pub fn propagate(&mut self, p: &P, pts: &PointsToSet<O>) -> PointsToSet<O> {
        let entry = self.pts.entry(p.clone()).or_default();
        let mut delta = PointsToSet::new();
        for obj in pts.iter() {
            if entry.add(obj) {
                delta.add(obj);
            }
        }
        delta
    }

    /// Pointers that currently have a points-to set.
    pub fn pointers(&self) -> impl Iterator<Item = &P> {
        self.pts.keys()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }
}

/// FIFO of pending `(pointer, points-to delta)` entries.
#[derive(Debug, Clone)]
pub struct WorkList<P, O: Copy + Eq + Hash> {
    queue: VecDeque<(P, PointsToSet<O>)>,
}

impl<P, O: Copy + Eq + Hash> Default for WorkList<P, O> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<P, O: Copy + Eq + Hash> WorkList<P, O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pointer: P, pts: PointsToSet<O>) {
        self.queue.push_back((pointer, pts));
    }

    pub fn pop(&mut self) -> Option<(P, PointsToSet<O>)> {
        self.queue.pop_front()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
