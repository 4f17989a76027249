//! Context-insensitive Andersen-style pointer analysis.
//!
//! Pointer-flow-graph fixpoint interleaved with on-the-fly call-graph
//! construction: statements of a method are processed once, when the method
//! first becomes reachable; instance calls are resolved per receiver object
//! as receiver points-to sets grow.

use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::features::callgraph::call_graph::{CallEdge, CallGraph};
use crate::features::dataflow::infrastructure::solver::CancelToken;
use crate::features::pta::domain::heap::{AllocationSiteHeapModel, HeapModel, ObjId};
use crate::features::pta::domain::pointer::{
    Pointer, PointerFlowGraph, PointsToSet, WorkList,
};
use crate::shared::models::hierarchy::ClassHierarchy;
use crate::shared::models::ir::{
    CallKind, MethodId, Program, StmtId, StmtKind, VarId,
};

/// Result of a context-insensitive run.
#[derive(Debug)]
pub struct CiPtaResult<H: HeapModel = AllocationSiteHeapModel> {
    pub call_graph: CallGraph,
    pfg: PointerFlowGraph<Pointer, ObjId>,
    heap: H,
    /// Set when the run was cancelled before the fixpoint.
    pub incomplete: bool,
}

impl<H: HeapModel> CiPtaResult<H> {
    pub fn points_to(&self, p: &Pointer) -> Option<&PointsToSet<ObjId>> {
        self.pfg.points_to(p)
    }

    pub fn points_to_var(&self, v: VarId) -> Option<&PointsToSet<ObjId>> {
        self.pfg.points_to(&Pointer::Var(v))
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph<Pointer, ObjId> {
        &self.pfg
    }

    pub fn heap_obj(&self, id: ObjId) -> &crate::features::pta::domain::heap::Obj {
        self.heap.obj(id)
    }
}

/// Runs the analysis rooted at `entry` with the allocation-site heap model.
pub fn run_pointer_analysis_ci(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: MethodId,
) -> Result<CiPtaResult> {
    run_pointer_analysis_ci_with(
        program,
        hierarchy,
        entry,
        AllocationSiteHeapModel::new(),
        &CancelToken::default(),
    )
}

/// Runs the analysis with a caller-supplied heap model and cancel token.
pub fn run_pointer_analysis_ci_with<H: HeapModel>(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: MethodId,
    heap: H,
    cancel: &CancelToken,
) -> Result<CiPtaResult<H>> {
    if !program.contains_method(entry) {
        return Err(AnalysisError::EntryMethodNotFound(format!("{entry:?}")));
    }
    let mut solver = CiSolver {
        program,
        hierarchy,
        heap,
        cg: CallGraph::new(),
        pfg: PointerFlowGraph::new(),
        worklist: WorkList::new(),
        incomplete: false,
    };
    solver.cg.add_entry(entry);
    solver.add_reachable(entry)?;
    solver.analyze(cancel)?;
    info!(
        reachable = solver.cg.reachable_methods().len(),
        pfg_edges = solver.pfg.num_edges(),
        "context-insensitive pointer analysis finished"
    );
    Ok(CiPtaResult {
        call_graph: solver.cg,
        pfg: solver.pfg,
        heap: solver.heap,
        incomplete: solver.incomplete,
    })
}

struct CiSolver<'p, H: HeapModel> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    heap: H,
    cg: CallGraph,
    pfg: PointerFlowGraph<Pointer, ObjId>,
    worklist: WorkList<Pointer, ObjId>,
    incomplete: bool,
}

impl<H: HeapModel> CiSolver<'_, H> {
    /// Marks a method reachable and seeds the PFG from its statements.
    /// Static call chains are followed iteratively.
    fn add_reachable(&mut self, method: MethodId) -> Result<()> {
        let program = self.program;
        let mut stack = vec![method];
        while let Some(m) = stack.pop() {
            if !self.cg.add_reachable_method(program, m) {
                continue;
            }
            debug!(method = ?m, "reachable");
            for &s in program.method(m).stmts() {
                match &program.stmt(s).kind {
                    StmtKind::New { lhs, class } => {
                        let obj = self.heap.obj_at(s, *class);
                        self.worklist
                            .push(Pointer::Var(*lhs), PointsToSet::singleton(obj));
                    }
                    StmtKind::Copy { lhs, rhs } => {
                        self.add_pfg_edge(Pointer::Var(*rhs), Pointer::Var(*lhs));
                    }
                    StmtKind::StoreField {
                        base: None,
                        field,
                        rhs,
                    } => {
                        self.add_pfg_edge(Pointer::Var(*rhs), Pointer::StaticField(*field));
                    }
                    StmtKind::LoadField {
                        lhs,
                        base: None,
                        field,
                    } => {
                        self.add_pfg_edge(Pointer::StaticField(*field), Pointer::Var(*lhs));
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
                        if self.cg.add_edge(CallEdge {
                            kind: CallKind::Static,
                            call_site: s,
                            callee,
                        }) {
                            self.wire_call(s, callee)?;
                            stack.push(callee);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Connects argument/parameter and return/result pointers of a newly
    /// added call edge.
    fn wire_call(&mut self, call_site: StmtId, callee: MethodId) -> Result<()> {
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
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
        }
        if let Some(result) = inv.result {
            for &ret in program.method(callee).return_vars() {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(result));
            }
        }
        Ok(())
    }

    /// New PFG edges carry the source's current points-to set to the target.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
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
            let Pointer::Var(x) = n else { continue };
            for obj in delta.iter() {
                // x.f = y
                for &s in program.var(x).store_fields() {
                    if let StmtKind::StoreField { field, rhs, .. } = &program.stmt(s).kind {
                        self.add_pfg_edge(Pointer::Var(*rhs), Pointer::InstanceField(obj, *field));
                    }
                }
                // y = x.f
                for &s in program.var(x).load_fields() {
                    if let StmtKind::LoadField { lhs, field, .. } = &program.stmt(s).kind {
                        self.add_pfg_edge(Pointer::InstanceField(obj, *field), Pointer::Var(*lhs));
                    }
                }
                // x[i] = y
                for &s in program.var(x).store_arrays() {
                    if let StmtKind::StoreArray { rhs, .. } = &program.stmt(s).kind {
                        self.add_pfg_edge(Pointer::Var(*rhs), Pointer::ArrayIndex(obj));
                    }
                }
                // y = x[i]
                for &s in program.var(x).load_arrays() {
                    if let StmtKind::LoadArray { lhs, .. } = &program.stmt(s).kind {
                        self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lhs));
                    }
                }
                self.process_call(x, obj)?;
            }
        }
        Ok(())
    }

    /// Resolves the instance calls on receiver `x` against a newly
    /// discovered receiver object.
    fn process_call(&mut self, x: VarId, recv: ObjId) -> Result<()> {
        let program = self.program;
        let recv_class = self.heap.obj(recv).class;
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
            let Some(this_var) = program.method(callee).this_var() else {
                return Err(AnalysisError::internal(format!(
                    "instance callee {callee:?} has no this variable"
                )));
            };
            self.worklist
                .push(Pointer::Var(this_var), PointsToSet::singleton(recv));
            if self.cg.add_edge(CallEdge {
                kind: inv.kind,
                call_site: cs,
                callee,
            }) {
                self.add_reachable(callee)?;
                self.wire_call(cs, callee)?;
            }
        }
        Ok(())
    }
}
