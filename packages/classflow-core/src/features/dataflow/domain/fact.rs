//! Dataflow fact containers.
//!
//! `CPFact` maps variables to lattice [`Value`]s; an unbound variable reads
//! as `Undef`, and updating to `Undef` drops the binding so structurally
//! equal facts compare equal. `SetFact` is the plain union-lattice set used
//! by liveness. `DataflowResult` holds the per-node IN/OUT solution of one
//! solver run.

use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::features::dataflow::domain::value::Value;
use crate::shared::models::ir::{StmtId, VarId};

/// Map fact for constant propagation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CPFact {
    map: FxHashMap<VarId, Value>,
}

impl CPFact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `var`; `Undef` when unbound.
    #[inline]
    pub fn get(&self, var: VarId) -> Value {
        self.map.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Binds `var` to `value`. Binding `Undef` removes the entry. Returns
    /// true when the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            self.map.remove(&var).is_some()
        } else {
            self.map.insert(var, value) != Some(value)
        }
    }

    /// Drops the binding of `var`. Returns true when one was present.
    pub fn remove(&mut self, var: VarId) -> bool {
        self.map.remove(&var).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = VarId> + '_ {
        self.map.keys().copied()
    }

    /// Replaces this fact with a copy of `other`; true when it differed.
    pub fn copy_from(&mut self, other: &CPFact) -> bool {
        if self == other {
            false
        } else {
            self.map = other.map.clone();
            true
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Set fact with union meet.
#[derive(Debug, Clone, PartialEq)]
pub struct SetFact<T: Eq + Hash + Clone> {
    set: FxHashSet<T>,
}

impl<T: Eq + Hash + Clone> Default for SetFact<T> {
    fn default() -> Self {
        Self {
            set: FxHashSet::default(),
        }
    }
}

impl<T: Eq + Hash + Clone> SetFact<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: T) -> bool {
        self.set.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.set.remove(item)
    }

    #[inline]
    pub fn contains(&self, item: &T) -> bool {
        self.set.contains(item)
    }

    /// Unions `other` into this set; true when anything was added.
    pub fn union(&mut self, other: &SetFact<T>) -> bool {
        let before = self.set.len();
        self.set.extend(other.set.iter().cloned());
        self.set.len() > before
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.set.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// IN/OUT facts of every CFG (or ICFG) node after a solver run.
#[derive(Debug, Clone, Default)]
pub struct DataflowResult<F> {
    pub(crate) in_facts: FxHashMap<StmtId, F>,
    pub(crate) out_facts: FxHashMap<StmtId, F>,
    /// Set when the solver was cancelled before reaching the fixpoint.
    pub incomplete: bool,
}

impl<F> DataflowResult<F> {
    pub fn new() -> Self {
        Self {
            in_facts: FxHashMap::default(),
            out_facts: FxHashMap::default(),
            incomplete: false,
        }
    }

    pub fn in_of(&self, node: StmtId) -> Option<&F> {
        self.in_facts.get(&node)
    }

    pub fn out_of(&self, node: StmtId) -> Option<&F> {
        self.out_facts.get(&node)
    }
}
