//! Context selectors.
//!
//! The only pluggable protocol of the analysis core: given a call site (and
//! for instance calls the receiver object), a selector produces the context
//! of the callee; heap contexts qualify allocation sites. The shipped
//! selectors cover the standard abstractions: no context, call-site k-CFA,
//! object sensitivity and type sensitivity, all k-limited.

use crate::features::pta::cs::element::{Context, ContextElem, CsCallSiteId, CsManager, CsMethodId, CsObjId};
use crate::features::pta::domain::heap::ObjId;
use crate::shared::models::ir::MethodId;

pub trait ContextSelector {
    /// The context entry methods are analyzed under.
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    /// Callee context for a static call.
    fn select_context(&self, mgr: &CsManager, call_site: CsCallSiteId, callee: MethodId)
        -> Context;

    /// Callee context for an instance call with receiver object `recv`.
    fn select_context_with_recv(
        &self,
        mgr: &CsManager,
        call_site: CsCallSiteId,
        recv: CsObjId,
        callee: MethodId,
    ) -> Context;

    /// Heap context for an allocation inside `method`.
    fn select_heap_context(&self, mgr: &CsManager, method: CsMethodId, obj: ObjId) -> Context;
}

/// Context-insensitive baseline: every context is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContextSelector;

impl ContextSelector for NoContextSelector {
    fn select_context(&self, _: &CsManager, _: CsCallSiteId, _: MethodId) -> Context {
        Context::empty()
    }

    fn select_context_with_recv(
        &self,
        _: &CsManager,
        _: CsCallSiteId,
        _: CsObjId,
        _: MethodId,
    ) -> Context {
        Context::empty()
    }

    fn select_heap_context(&self, _: &CsManager, _: CsMethodId, _: ObjId) -> Context {
        Context::empty()
    }
}

/// Call-site sensitivity: the callee context is the k most recent call
/// sites; heap contexts are limited to k-1.
#[derive(Debug, Clone, Copy)]
pub struct KCallSiteSelector {
    pub k: usize,
}

impl KCallSiteSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KCallSiteSelector {
    fn select_context(&self, mgr: &CsManager, call_site: CsCallSiteId, _: MethodId) -> Context {
        let site = mgr.call_site_of(call_site);
        mgr.context_of_call_site(call_site)
            .push_limited(ContextElem::CallSite(site), self.k)
    }

    fn select_context_with_recv(
        &self,
        mgr: &CsManager,
        call_site: CsCallSiteId,
        _: CsObjId,
        callee: MethodId,
    ) -> Context {
        self.select_context(mgr, call_site, callee)
    }

    fn select_heap_context(&self, mgr: &CsManager, method: CsMethodId, _: ObjId) -> Context {
        mgr.context_of_method(method).truncated(self.k.saturating_sub(1))
    }
}

/// Object sensitivity: the callee context is the k most recent receiver
/// allocation sites. Static calls inherit the caller's context.
#[derive(Debug, Clone, Copy)]
pub struct KObjectSelector {
    pub k: usize,
}

impl KObjectSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KObjectSelector {
    fn select_context(&self, mgr: &CsManager, call_site: CsCallSiteId, _: MethodId) -> Context {
        mgr.context_of_call_site(call_site).clone()
    }

    fn select_context_with_recv(
        &self,
        mgr: &CsManager,
        _: CsCallSiteId,
        recv: CsObjId,
        _: MethodId,
    ) -> Context {
        let obj = mgr.obj_of(recv);
        mgr.context_of_obj(recv)
            .push_limited(ContextElem::Obj(obj), self.k)
    }

    fn select_heap_context(&self, mgr: &CsManager, method: CsMethodId, _: ObjId) -> Context {
        mgr.context_of_method(method).truncated(self.k.saturating_sub(1))
    }
}

/// Type sensitivity: like object sensitivity, but receiver objects
/// contribute their dynamic class instead of their allocation site.
#[derive(Debug, Clone, Copy)]
pub struct KTypeSelector {
    pub k: usize,
}

impl KTypeSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KTypeSelector {
    fn select_context(&self, mgr: &CsManager, call_site: CsCallSiteId, _: MethodId) -> Context {
        mgr.context_of_call_site(call_site).clone()
    }

    fn select_context_with_recv(
        &self,
        mgr: &CsManager,
        call_site: CsCallSiteId,
        recv: CsObjId,
        _: MethodId,
    ) -> Context {
        let obj = mgr.obj_of(recv);
        match mgr.class_of_obj(obj) {
            Some(class) => mgr
                .context_of_obj(recv)
                .push_limited(ContextElem::Type(class), self.k),
            None => mgr.context_of_call_site(call_site).clone(),
        }
    }

    fn select_heap_context(&self, mgr: &CsManager, method: CsMethodId, _: ObjId) -> Context {
        mgr.context_of_method(method).truncated(self.k.saturating_sub(1))
    }
}
