//! Context-sensitive Andersen-style pointer analysis.
//!
//! Same propagation rules as the context-insensitive solver, with every
//! variable, object, method and call site qualified by a [`Context`]. The
//! callee context at each call comes from the pluggable
//! [`ContextSelector`]; heap contexts qualify allocation sites.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::features::dataflow::infrastructure::solver::CancelToken;
use crate::features::pta::cs::element::{
    Context, CsCallSiteId, CsManager, CsMethodId, CsObjId, CsPointer,
};
use crate::features::pta::cs::selector::ContextSelector;
use crate::features::pta::domain::heap::{AllocationSiteHeapModel, HeapModel, ObjId};
use crate::features::pta::domain::pointer::{PointerFlowGraph, PointsToSet, WorkList};
use crate::shared::models::hierarchy::ClassHierarchy;
use crate::shared::models::ir::{CallKind, MethodId, Program, StmtId, StmtKind, VarId};

/// One context-sensitive call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsCallEdge {
    pub kind: CallKind,
    pub call_site: CsCallSiteId,
    pub callee: CsMethodId,
}

/// Call graph over context-qualified methods and call sites.
#[derive(Debug, Clone, Default)]
pub struct CsCallGraph {
    entries: Vec<CsMethodId>,
    reachable: Vec<CsMethodId>,
    reachable_set: FxHashSet<CsMethodId>,
    edges: Vec<CsCallEdge>,
    edge_set: FxHashSet<(CsCallSiteId, CsMethodId)>,
    out_edges: FxHashMap<CsCallSiteId, Vec<CsCallEdge>>,
}

impl CsCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, m: CsMethodId) {
        if !self.entries.contains(&m) {
            self.entries.push(m);
        }
    }

    /// Marks a context-qualified method reachable; false when it already was.
    pub fn add_reachable_method(&mut self, m: CsMethodId) -> bool {
        if !self.reachable_set.insert(m) {
            return false;
        }
        self.reachable.push(m);
        true
    }

    pub fn add_edge(&mut self, edge: CsCallEdge) -> bool {
        if !self.edge_set.insert((edge.call_site, edge.callee)) {
            return false;
        }
        self.edges.push(edge);
        self.out_edges.entry(edge.call_site).or_default().push(edge);
        true
    }

    #[inline]
    pub fn entries(&self) -> &[CsMethodId] {
        &self.entries
    }

    #[inline]
    pub fn reachable_methods(&self) -> &[CsMethodId] {
        &self.reachable
    }

    #[inline]
    pub fn edges(&self) -> &[CsCallEdge] {
        &self.edges
    }

    pub fn edges_out_of(&self, call_site: CsCallSiteId) -> &[CsCallEdge] {
        self.out_edges
            .get(&call_site)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Result of a context-sensitive run: context-qualified points-to sets plus
/// the context-projected view.
#[derive(Debug)]
pub struct CsPtaResult<H: HeapModel = AllocationSiteHeapModel> {
    pub manager: CsManager,
    pub call_graph: CsCallGraph,
    pfg: PointerFlowGraph<CsPointer, CsObjId>,
    heap: H,
    /// Set when the run was cancelled before the fixpoint.
    pub incomplete: bool,
}

impl<H: HeapModel> CsPtaResult<H> {
    /// Context-qualified view.
    pub fn points_to_cs(&self, p: &CsPointer) -> Option<&PointsToSet<CsObjId>> {
        self.pfg.points_to(p)
    }

    /// Context-projected view: the union over all contexts of `v`.
    pub fn points_to_var(&self, v: VarId) -> PointsToSet<ObjId> {
        let mut projected = PointsToSet::new();
        for p in self.pfg.pointers() {
            let CsPointer::Var(cv) = p else { continue };
            if self.manager.var_of(*cv) != v {
                continue;
            }
            if let Some(pts) = self.pfg.points_to(p) {
                for cobj in pts.iter() {
                    projected.add(self.manager.obj_of(cobj));
                }
            }
        }
        projected
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph<CsPointer, CsObjId> {
        &self.pfg
    }

    pub fn heap_obj(&self, id: ObjId) -> &crate::features::pta::domain::heap::Obj {
        self.heap.obj(id)
    }
}

/// Runs the analysis rooted at `entry` with the allocation-site heap model.
pub fn run_pointer_analysis_cs<S: ContextSelector + ?Sized>(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: MethodId,
    selector: &S,
) -> Result<CsPtaResult> {
    run_pointer_analysis_cs_with(
        program,
        hierarchy,
        entry,
        selector,
        AllocationSiteHeapModel::new(),
        &CancelToken::default(),
    )
}

/// Runs the analysis with a caller-supplied heap model and cancel token.
pub fn run_pointer_analysis_cs_with<S: ContextSelector + ?Sized, H: HeapModel>(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: MethodId,
    selector: &S,
    heap: H,
    cancel: &CancelToken,
) -> Result<CsPtaResult<H>> {
    if !program.contains_method(entry) {
        return Err(AnalysisError::EntryMethodNotFound(format!("{entry:?}")));
    }
    let mut solver = CsSolver {
        program,
        hierarchy,
        selector,
        heap,
        mgr: CsManager::new(),
        cg: CsCallGraph::new(),
        pfg: PointerFlowGraph::new(),
        worklist: WorkList::new(),
        incomplete: false,
    };
    let empty = solver.selector.empty_context();
    let cs_entry = solver.mgr.get_cs_method(&empty, entry);
    solver.cg.add_entry(cs_entry);
    solver.add_reachable(cs_entry)?;
    solver.analyze(cancel)?;
    info!(
        reachable = solver.cg.reachable_methods().len(),
        pfg_edges = solver.pfg.num_edges(),
        "context-sensitive pointer analysis finished"
    );
    Ok(CsPtaResult {
        manager: solver.mgr,
        call_graph: solver.cg,
        pfg: solver.pfg,
        heap: solver.heap,
        incomplete: solver.incomplete,
    })
}

struct CsSolver<'p, S: ContextSelector + ?Sized, H: HeapModel> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    selector: &'p S,
    heap: H,
    mgr: CsManager,
    cg: CsCallGraph,
    pfg: PointerFlowGraph<CsPointer, CsObjId>,
    worklist: WorkList<CsPointer, CsObjId>,
    incomplete: bool,
}

impl<S: ContextSelector + ?Sized, H: HeapModel> CsSolver<'_, S, H> {
    fn add_reachable(&mut self, cs_method: CsMethodId) -> Result<()> {
        let program = self.program;
        let mut stack = vec![cs_method];
        while let Some(csm) = stack.pop() {
            if !self.cg.add_reachable_method(csm) {
                continue;
            }
            let ctx = self.mgr.context_of_method(csm).clone();
            let m = self.mgr.method_of(csm);
            debug!(method = ?m, context_depth = ctx.depth(), "reachable");
            for &s in program.method(m).stmts() {
                match &program.stmt(s).kind {
                    StmtKind::New { lhs, class } => {
                        let obj = self.heap.obj_at(s, *class);
                        self.mgr.record_obj_class(obj, *class);
                        let heap_ctx = self.selector.select_heap_context(&self.mgr, csm, obj);
                        let cs_obj = self.mgr.get_cs_obj(&heap_ctx, obj);
                        let cs_var = self.mgr.get_cs_var(&ctx, *lhs);
                        self.worklist
                            .push(CsPointer::Var(cs_var), PointsToSet::singleton(cs_obj));
                    }
                    StmtKind::Copy { lhs, rhs } => {
                        let src = self.mgr.get_cs_var(&ctx, *rhs);
                        let dst = self.mgr.get_cs_var(&ctx, *lhs);
                        self.add_pfg_edge(CsPointer::Var(src), CsPointer::Var(dst));
                    }
                    StmtKind::StoreField {
                        base: None,
                        field,
                        rhs,
                    } => {
                        let src = self.mgr.get_cs_var(&ctx, *rhs);
                        self.add_pfg_edge(CsPointer::Var(src), CsPointer::StaticField(*field));
                    }
                    StmtKind::LoadField {
                        lhs,
                        base: None,
                        field,
                    } => {
                        let dst = self.mgr.get_cs_var(&ctx, *lhs);
                        self.add_pfg_edge(CsPointer::StaticField(*field), CsPointer::Var(dst));
                    }
                    StmtKind::Invoke(inv) if inv.kind == CallKind::Static => {
                        let Some(callee) = self.hierarchy.dispatch(
                            program,
                            inv.method_ref.class,
                            &inv.method_ref.subsignature,
                        ) else {
                            debug!(call_site = ?s, "static call did not resolve");
                            continue;
                        };
                        let cs_call_site = self.mgr.get_cs_call_site(&ctx, s);
                        let callee_ctx =
                            self.selector.select_context(&self.mgr, cs_call_site, callee);
                        let cs_callee = self.mgr.get_cs_method(&callee_ctx, callee);
                        if self.cg.add_edge(CsCallEdge {
                            kind: CallKind::Static,
                            call_site: cs_call_site,
                            callee: cs_callee,
                        }) {
                            self.wire_call(&ctx, s, &callee_ctx, callee)?;
                            stack.push(cs_callee);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn wire_call(
        &mut self,
        caller_ctx: &Context,
        call_site: StmtId,
        callee_ctx: &Context,
        callee: MethodId,
    ) -> Result<()> {
        let program = self.program;
        let StmtKind::Invoke(inv) = &program.stmt(call_site).kind else {
            return Err(AnalysisError::internal(format!(
                "call edge from non-invoke statement {call_site:?}"
            )));
        };
        let params = program.method(callee).params();
        if params.len() != inv.args.len() {
            return Err(AnalysisError::ArityMismatch {
                call_site,
                expected: params.len(),
                actual: inv.args.len(),
            });
        }
        for (&arg, &param) in inv.args.iter().zip(params.iter()) {
            let src = self.mgr.get_cs_var(caller_ctx, arg);
            let dst = self.mgr.get_cs_var(callee_ctx, param);
            self.add_pfg_edge(CsPointer::Var(src), CsPointer::Var(dst));
        }
        if let Some(result) = inv.result {
            let dst = self.mgr.get_cs_var(caller_ctx, result);
            for &ret in program.method(callee).return_vars() {
                let src = self.mgr.get_cs_var(callee_ctx, ret);
                self.add_pfg_edge(CsPointer::Var(src), CsPointer::Var(dst));
            }
        }
        Ok(())
    }

    fn add_pfg_edge(&mut self, source: CsPointer, target: CsPointer) {
        if self.pfg.add_edge(source, target) {
            if let Some(pts) = self.pfg.points_to(&source) {
                if !pts.is_empty() {
                    self.worklist.push(target, pts.clone());
                }
            }
        }
    }

    fn analyze(&mut self, cancel: &CancelToken) -> Result<()> {
        let program = self.program;
        while let Some((n, pts)) = self.worklist.pop() {
            if cancel.is_cancelled() {
                self.incomplete = true;
                return Ok(());
            }
            let delta = self.pfg.propagate(&n, &pts);
            if delta.is_empty() {
                continue;
            }
            for &succ in self.pfg.succs_of(&n) {
                self.worklist.push(succ, delta.clone());
            }
            let CsPointer::Var(cs_var) = n else { continue };
            let ctx = self.mgr.context_of_var(cs_var).clone();
            let x = self.mgr.var_of(cs_var);
            for cs_obj in delta.iter() {
                // x.f = y
                for &s in program.var(x).store_fields() {
                    if let StmtKind::StoreField { field, rhs, .. } = &program.stmt(s).kind {
                        let src = self.mgr.get_cs_var(&ctx, *rhs);
                        self.add_pfg_edge(
                            CsPointer::Var(src),
                            CsPointer::InstanceField(cs_obj, *field),
                        );
                    }
                }
                // y = x.f
                for &s in program.var(x).load_fields() {
                    if let StmtKind::LoadField { lhs, field, .. } = &program.stmt(s).kind {
                        let dst = self.mgr.get_cs_var(&ctx, *lhs);
                        self.add_pfg_edge(
                            CsPointer::InstanceField(cs_obj, *field),
                            CsPointer::Var(dst),
                        );
                    }
                }
                // x[i] = y
                for &s in program.var(x).store_arrays() {
                    if let StmtKind::StoreArray { rhs, .. } = &program.stmt(s).kind {
                        let src = self.mgr.get_cs_var(&ctx, *rhs);
                        self.add_pfg_edge(CsPointer::Var(src), CsPointer::ArrayIndex(cs_obj));
                    }
                }
                // y = x[i]
                for &s in program.var(x).load_arrays() {
                    if let StmtKind::LoadArray { lhs, .. } = &program.stmt(s).kind {
                        let dst = self.mgr.get_cs_var(&ctx, *lhs);
                        self.add_pfg_edge(CsPointer::ArrayIndex(cs_obj), CsPointer::Var(dst));
                    }
                }
                self.process_call(&ctx, x, cs_obj)?;
            }
        }
        Ok(())
    }

    /// Resolves the instance calls on receiver `x` (under `ctx`) against a
    /// newly discovered context-qualified receiver object.
    fn process_call(&mut self, ctx: &Context, x: VarId, recv: CsObjId) -> Result<()> {
        let program = self.program;
        let obj = self.mgr.obj_of(recv);
        let recv_class = self.heap.obj(obj).class;
        for &cs in program.var(x).invokes() {
            let StmtKind::Invoke(inv) = &program.stmt(cs).kind else {
                continue;
            };
            if inv.kind == CallKind::Dynamic {
                continue;
            }
            let Some(callee) =
                self.hierarchy
                    .dispatch(program, recv_class, &inv.method_ref.subsignature)
            else {
                debug!(call_site = ?cs, class = ?recv_class, "dispatch found no target");
                continue;
            };
            let cs_call_site = self.mgr.get_cs_call_site(ctx, cs);
            let callee_ctx =
                self.selector
                    .select_context_with_recv(&self.mgr, cs_call_site, recv, callee);
            let cs_callee = self.mgr.get_cs_method(&callee_ctx, callee);
            let Some(this_var) = program.method(callee).this_var() else {
                return Err(AnalysisError::internal(format!(
                    "instance callee {callee:?} has no this variable"
                )));
            };
            let cs_this = self.mgr.get_cs_var(&callee_ctx, this_var);
            self.worklist
                .push(CsPointer::Var(cs_this), PointsToSet::singleton(recv));
            if self.cg.add_edge(CsCallEdge {
                kind: inv.kind,
                call_site: cs_call_site,
                callee: cs_callee,
            }) {
                self.add_reachable(cs_callee)?;
                self.wire_call(ctx, cs, &callee_ctx, callee)?;
            }
        }
        Ok(())
    }
}
