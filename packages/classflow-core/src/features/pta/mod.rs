//! Andersen-style pointer analysis, context-insensitive and
//! context-sensitive, both constructing the call graph on the fly.

pub mod ci;
pub mod cs;
pub mod domain;

pub use ci::solver::{run_pointer_analysis_ci, run_pointer_analysis_ci_with, CiPtaResult};
pub use cs::selector::{
    ContextSelector, KCallSiteSelector, KObjectSelector, KTypeSelector, NoContextSelector,
};
pub use cs::solver::{run_pointer_analysis_cs, run_pointer_analysis_cs_with, CsPtaResult};
pub use domain::heap::{AllocationSiteHeapModel, HeapModel, Obj, ObjId};
pub use domain::pointer::{Pointer, PointerFlowGraph, PointsToSet, WorkList};
