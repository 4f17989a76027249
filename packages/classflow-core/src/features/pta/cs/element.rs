//! Context-sensitive elements.
//!
//! A [`Context`] is a k-limited sequence of context elements (call sites,
//! allocation sites, or types). The [`CsManager`] interns every
//! `(context, element)` pair to a dense handle, so context-qualified
//! variables, objects, methods and call sites compare and hash as plain
//! integers.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::features::pta::domain::heap::ObjId;
use crate::shared::models::ir::{ClassId, FieldId, MethodId, StmtId, VarId};

/// One element of a calling/heap context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    CallSite(StmtId),
    Obj(ObjId),
    Type(ClassId),
}

/// An abstraction of calling history: the most recent context elements,
/// oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Context {
    elements: Vec<ContextElem>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[ContextElem] {
        &self.elements
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Appends `elem`, keeping only the `k` most recent elements.
    pub fn push_limited(&self, elem: ContextElem, k: usize) -> Context {
        let mut elements = self.elements.clone();
        elements.push(elem);
        let overflow = elements.len().saturating_sub(k);
        elements.drain(..overflow);
        Context { elements }
    }

    /// The `k` most recent elements.
    pub fn truncated(&self, k: usize) -> Context {
        let overflow = self.elements.len().saturating_sub(k);
        Context {
            elements: self.elements[overflow..].to_vec(),
        }
    }
}

/// Handle of a context-qualified variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsVarId(pub u32);

/// Handle of a context-qualified object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsObjId(pub u32);

/// Handle of a context-qualified method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsMethodId(pub u32);

/// Handle of a context-qualified call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsCallSiteId(pub u32);

/// Context-qualified pointer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsPointer {
    Var(CsVarId),
    InstanceField(CsObjId, FieldId),
    StaticField(FieldId),
    ArrayIndex(CsObjId),
}

#[derive(Debug, Clone)]
struct Interner<T: Clone + Eq + Hash> {
    index: FxHashMap<T, u32>,
    items: Vec<T>,
}

impl<T: Clone + Eq + Hash> Default for Interner<T> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
            items: Vec::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Interner<T> {
    fn intern(&mut self, item: &T) -> u32 {
        if let Some(&i) = self.index.get(item) {
            return i;
        }
        let i = self.items.len() as u32;
        self.items.push(item.clone());
        self.index.insert(item.clone(), i);
        i
    }

    fn get(&self, i: u32) -> &T {
        &self.items[i as usize]
    }
}

/// Content-addressed cache of context-qualified elements.
#[derive(Debug, Clone, Default)]
pub struct CsManager {
    vars: Interner<(Context, VarId)>,
    objs: Interner<(Context, ObjId)>,
    methods: Interner<(Context, MethodId)>,
    call_sites: Interner<(Context, StmtId)>,
    obj_classes: FxHashMap<ObjId, ClassId>,
}

impl CsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_cs_var(&mut self, ctx: &Context, var: VarId) -> CsVarId {
        CsVarId(self.vars.intern(&(ctx.clone(), var)))
    }

    pub fn get_cs_obj(&mut self, heap_ctx: &Context, obj: ObjId) -> CsObjId {
        CsObjId(self.objs.intern(&(heap_ctx.clone(), obj)))
    }

    pub fn get_cs_method(&mut self, ctx: &Context, method: MethodId) -> CsMethodId {
        CsMethodId(self.methods.intern(&(ctx.clone(), method)))
    }

    pub fn get_cs_call_site(&mut self, ctx: &Context, call_site: StmtId) -> CsCallSiteId {
        CsCallSiteId(self.call_sites.intern(&(ctx.clone(), call_site)))
    }

    pub fn context_of_var(&self, id: CsVarId) -> &Context {
        &self.vars.get(id.0).0
    }

    pub fn var_of(&self, id: CsVarId) -> VarId {
        self.vars.get(id.0).1
    }

    pub fn context_of_obj(&self, id: CsObjId) -> &Context {
        &self.objs.get(id.0).0
    }

    pub fn obj_of(&self, id: CsObjId) -> ObjId {
        self.objs.get(id.0).1
    }

    pub fn context_of_method(&self, id: CsMethodId) -> &Context {
        &self.methods.get(id.0).0
    }

    pub fn method_of(&self, id: CsMethodId) -> MethodId {
        self.methods.get(id.0).1
    }

    pub fn context_of_call_site(&self, id: CsCallSiteId) -> &Context {
        &self.call_sites.get(id.0).0
    }

    pub fn call_site_of(&self, id: CsCallSiteId) -> StmtId {
        self.call_sites.get(id.0).1
    }

    /// Records the dynamic class of an abstract object so selectors can use
    /// type context elements.
    pub fn record_obj_class(&mut self, obj: ObjId, class: ClassId) {
        self.obj_classes.insert(obj, class);
    }

    pub fn class_of_obj(&self, obj: ObjId) -> Option<ClassId> {
        self.obj_classes.get(&obj).copied()
    }
}
