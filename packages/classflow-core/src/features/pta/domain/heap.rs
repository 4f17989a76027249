//! Heap abstraction.
//!
//! Objects are identified by allocation site. The [`HeapModel`] trait is
//! the seam for coarser or finer abstractions; the shipped model interns
//! one abstract object per `New` statement.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::ir::{ClassId, StmtId};

/// Handle of an abstract heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u32);

/// An abstract heap object: its allocation site and dynamic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obj {
    pub site: StmtId,
    pub class: ClassId,
}

/// Maps allocation sites to abstract objects.
pub trait HeapModel {
    /// The abstract object for an allocation site.
    fn obj_at(&mut self, site: StmtId, class: ClassId) -> ObjId;

    fn obj(&self, id: ObjId) -> &Obj;
}

/// One abstract object per allocation site.
#[derive(Debug, Clone, Default)]
pub struct AllocationSiteHeapModel {
    objs: Vec<Obj>,
    by_site: FxHashMap<StmtId, ObjId>,
}

impl AllocationSiteHeapModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeapModel for AllocationSiteHeapModel {
    fn obj_at(&mut self, site: StmtId, class: ClassId) -> ObjId {
        if let Some(&id) = self.by_site.get(&site) {
            return id;
        }
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(Obj { site, class });
        self.by_site.insert(site, id);
        id
    }

    fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.0 as usize]
    }
}
