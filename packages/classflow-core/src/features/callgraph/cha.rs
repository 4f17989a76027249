//! Class-hierarchy-analysis call-graph construction.
//!
//! Worklist of methods seeded with the entry; each newly reachable method
//! contributes edges from its call sites to every target `resolve` finds.
//!
//! `resolve` expands virtual and interface calls over the declaring class
//! and its *direct* subtypes only; deeper overrides join the graph when
//! their own direct parent is expanded. `Dynamic` call sites resolve to the
//! empty set and a failed dispatch is silently dropped from the target set.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::features::callgraph::call_graph::{CallEdge, CallGraph};
use crate::shared::models::hierarchy::ClassHierarchy;
use crate::shared::models::ir::{CallKind, Invoke, MethodId, Program, StmtKind};

/// Builds the CHA call graph rooted at `entry`.
pub fn build_call_graph(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: MethodId,
) -> Result<CallGraph> {
    if !program.contains_method(entry) {
        return Err(AnalysisError::EntryMethodNotFound(format!("{entry:?}")));
    }
    if program.method(entry).is_abstract {
        return Err(AnalysisError::config("entry method is abstract"));
    }

    let mut cg = CallGraph::new();
    cg.add_entry(entry);

    let mut worklist = VecDeque::from([entry]);
    while let Some(m) = worklist.pop_front() {
        if !cg.add_reachable_method(program, m) {
            continue;
        }
        for cs in cg.call_sites_in(m).to_vec() {
            let StmtKind::Invoke(inv) = &program.stmt(cs).kind else {
                return Err(AnalysisError::internal(format!(
                    "call site index holds non-invoke statement {cs:?}"
                )));
            };
            for target in resolve(program, hierarchy, inv) {
                if cg.add_edge(CallEdge {
                    kind: inv.kind,
                    call_site: cs,
                    callee: target,
                }) {
                    worklist.push_back(target);
                }
            }
        }
    }
    debug!(
        reachable = cg.reachable_methods().len(),
        edges = cg.edges().len(),
        "CHA call graph built"
    );
    Ok(cg)
}

/// Resolves the possible targets of a call site via CHA.
pub fn resolve(
    program: &Program,
    hierarchy: &ClassHierarchy,
    inv: &Invoke,
) -> FxHashSet<MethodId> {
    let mut targets = FxHashSet::default();
    let decl = inv.method_ref.class;
    let subsig = inv.method_ref.subsignature.as_str();
    match inv.kind {
        CallKind::Static | CallKind::Special => {
            targets.extend(hierarchy.dispatch(program, decl, subsig));
        }
        CallKind::Virtual | CallKind::Interface => {
            if !program.class(decl).is_abstract {
                targets.extend(hierarchy.dispatch(program, decl, subsig));
            }
            let children: Vec<_> = if program.class(decl).is_interface {
                hierarchy
                    .direct_subinterfaces_of(decl)
                    .iter()
                    .chain(hierarchy.direct_implementors_of(decl))
                    .copied()
                    .collect()
            } else {
                hierarchy.direct_subclasses_of(decl).to_vec()
            };
            for child in children {
                targets.extend(hierarchy.dispatch(program, child, subsig));
            }
        }
        // Dynamic call sites have no static callee set.
        CallKind::Dynamic => {}
    }
    targets
}
