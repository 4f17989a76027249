//! # classflow-core
//!
//! Analytic core of a whole-program static analyzer for a class-based,
//! single-inheritance, bytecode-like IR with dynamic dispatch, fields and
//! heap objects. For one compilation closure rooted at an entry method it
//! computes:
//!
//! - a **CHA call graph** over the class hierarchy,
//! - intraprocedural **dataflow** via a generic monotone worklist solver,
//!   instantiated for **live variables** and **constant propagation**,
//! - **interprocedural constant propagation** over an ICFG with typed
//!   call/return edge transfers,
//! - **Andersen-style pointer analysis**, context-insensitive and
//!   context-sensitive (pluggable [`ContextSelector`]), both constructing
//!   their call graph on the fly,
//! - a **dead-code detector** composing constant propagation and liveness.
//!
//! IR loading, per-method CFG construction and result reporting belong to
//! collaborator layers; they feed [`Program`]/[`Cfg`] values in through the
//! builders and consume the result types returned here.
//!
//! ## Usage
//! ```text
//! let hierarchy = ClassHierarchy::build(&program);
//! let cg = build_call_graph(&program, &hierarchy, entry)?;
//! let constants = solve(&ConstantPropagation::new(&program), &cfg);
//! let live = solve(&LiveVariableAnalysis::new(&program), &cfg);
//! let dead = detect_dead_code(&program, &cfg, &constants, &live);
//! let pta = run_pointer_analysis_ci(&program, &hierarchy, entry)?;
//! ```

pub mod error;
pub mod features;
pub mod shared;

pub use error::{AnalysisError, Result};

pub use shared::models::cfg::{Cfg, CfgBuilder, Edge, EdgeKind};
pub use shared::models::hierarchy::ClassHierarchy;
pub use shared::models::ir::{
    ArithOp, BinaryExp, BinaryOp, BitwiseOp, CallKind, Class, ClassId, ConditionExp, ConditionOp,
    Exp, Field, FieldId, Invoke, Method, MethodId, MethodRef, PrimKind, Program, ProgramBuilder,
    ShiftOp, Stmt, StmtId, StmtKind, Type, Var, VarId,
};

pub use features::callgraph::{build_call_graph, resolve, CallEdge, CallGraph};
pub use features::dataflow::analysis::const_prop::ConstantPropagation;
pub use features::dataflow::analysis::dead_code::detect_dead_code;
pub use features::dataflow::analysis::live_vars::LiveVariableAnalysis;
pub use features::dataflow::analysis::parallel::solve_parallel;
pub use features::dataflow::domain::fact::{CPFact, DataflowResult, SetFact};
pub use features::dataflow::domain::value::Value;
pub use features::dataflow::infrastructure::solver::{
    solve, solve_with_cancel, CancelToken, DataflowAnalysis,
};
pub use features::interproc::{
    run_inter_const_prop, solve_inter, CfgMap, Icfg, IcfgEdge, IcfgEdgeKind,
    InterCpResult, InterDataflowAnalysis,
};
pub use features::pta::{
    run_pointer_analysis_ci, run_pointer_analysis_cs, AllocationSiteHeapModel, CiPtaResult,
    ContextSelector, CsPtaResult, HeapModel, KCallSiteSelector, KObjectSelector, KTypeSelector,
    NoContextSelector, Obj, ObjId, Pointer, PointerFlowGraph, PointsToSet,
};
pub use features::pta::cs::element::{Context, ContextElem, CsManager, CsPointer};
