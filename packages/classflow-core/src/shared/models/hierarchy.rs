//! Class-hierarchy oracle.
//!
//! Read-only during an analysis run. Answers the subtype queries the
//! call-graph builders need and implements method dispatch over the
//! single-inheritance class lattice.

use rustc_hash::FxHashMap;

use crate::shared::models::ir::{ClassId, MethodId, Program};

/// Direct-subtype indexes over a frozen [`Program`].
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    direct_subclasses: FxHashMap<ClassId, Vec<ClassId>>,
    direct_subinterfaces: FxHashMap<ClassId, Vec<ClassId>>,
    direct_implementors: FxHashMap<ClassId, Vec<ClassId>>,
}

impl ClassHierarchy {
    pub fn build(program: &Program) -> Self {
        let mut h = Self::default();
        for c in program.class_ids() {
            let class = program.class(c);
            if let Some(sup) = class.superclass {
                if !class.is_interface {
                    h.direct_subclasses.entry(sup).or_default().push(c);
                }
            }
            for &i in &class.interfaces {
                if class.is_interface {
                    h.direct_subinterfaces.entry(i).or_default().push(c);
                } else {
                    h.direct_implementors.entry(i).or_default().push(c);
                }
            }
        }
        h
    }

    pub fn direct_subclasses_of(&self, c: ClassId) -> &[ClassId] {
        self.direct_subclasses.get(&c).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_subinterfaces_of(&self, i: ClassId) -> &[ClassId] {
        self.direct_subinterfaces.get(&i).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn direct_implementors_of(&self, i: ClassId) -> &[ClassId] {
        self.direct_implementors.get(&i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Looks up the target method for a receiver class and subsignature by
    /// walking the superclass chain. Abstract declarations are skipped;
    /// returns `None` when no concrete method satisfies the call.
    pub fn dispatch(
        &self,
        program: &Program,
        class: ClassId,
        subsignature: &str,
    ) -> Option<MethodId> {
        let mut cur = Some(class);
        while let Some(c) = cur {
            let data = program.class(c);
            if let Some(m) = data.declared_method(subsignature) {
                if !program.method(m).is_abstract {
                    return Some(m);
                }
            }
            cur = data.superclass;
        }
        None
    }
}
