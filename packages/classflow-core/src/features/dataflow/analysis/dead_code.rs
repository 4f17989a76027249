//! Dead-code detection.
//!
//! Composes constant propagation and liveness over one method's CFG.
//! Three passes, union-merged and ordered by statement index:
//!
//! 1. control-flow-unreachable statements (no predecessors),
//! 2. branch-unreachable statements behind constant conditions,
//! 3. dead assignments (defined variable not live, side-effect-free rhs).

use std::collections::BTreeSet;

use crate::features::dataflow::domain::fact::{CPFact, DataflowResult, SetFact};
use crate::shared::models::cfg::{Cfg, EdgeKind};
use crate::shared::models::ir::{
    ArithOp, BinaryOp, ConditionOp, Exp, Program, StmtId, StmtKind, VarId,
};

/// Returns the dead statements of `cfg`, ordered by statement index.
pub fn detect_dead_code(
    program: &Program,
    cfg: &Cfg,
    constants: &DataflowResult<CPFact>,
    live_vars: &DataflowResult<SetFact<VarId>>,
) -> Vec<StmtId> {
    let mut dead: BTreeSet<(u32, StmtId)> = BTreeSet::new();
    {
        let mut sink = |s: StmtId| {
            dead.insert((program.stmt(s).index, s));
        };
        collect_unreachable(cfg, &mut sink);
        collect_dead_branches(program, cfg, constants, &mut sink);
        collect_dead_assignments(program, cfg, live_vars, &mut sink);
    }
    dead.into_iter().map(|(_, s)| s).collect()
}

/// Pass 1: nodes with no predecessors. The synthetic entry/exit markers are
/// not user code and are never reported.
fn collect_unreachable(cfg: &Cfg, sink: &mut impl FnMut(StmtId)) {
    for &n in cfg.nodes() {
        if cfg.is_entry(n) || cfg.is_exit(n) {
            continue;
        }
        if cfg.in_edges_of(n).is_empty() {
            sink(n);
        }
    }
}

/// Pass 2: branches decided by constants under the OUT fact of the branch
/// statement.
fn collect_dead_branches(
    program: &Program,
    cfg: &Cfg,
    constants: &DataflowResult<CPFact>,
    sink: &mut impl FnMut(StmtId),
) {
    for &n in cfg.nodes() {
        match &program.stmt(n).kind {
            StmtKind::If { cond } => {
                let Some(fact) = constants.out_of(n) else { continue };
                let (Some(c1), Some(c2)) =
                    (fact.get(cond.lhs).const_value(), fact.get(cond.rhs).const_value())
                else {
                    continue;
                };
                let dead_kind = if eval_condition(cond.op, c1, c2) {
                    EdgeKind::IfFalse
                } else {
                    EdgeKind::IfTrue
                };
                for e in cfg.out_edges_of(n) {
                    if e.kind == dead_kind {
                        for s in dead_chain(cfg, e.target) {
                            sink(s);
                        }
                    }
                }
            }
            StmtKind::Switch { var } => {
                let Some(fact) = constants.out_of(n) else { continue };
                let Some(selector) = fact.get(*var).const_value() else { continue };
                let mut matched = false;
                let mut default_target = None;
                for e in cfg.out_edges_of(n) {
                    match e.kind {
                        EdgeKind::SwitchCase(v) if v == selector => matched = true,
                        EdgeKind::SwitchCase(_) => {
                            for s in dead_chain(cfg, e.target) {
                                sink(s);
                            }
                        }
                        EdgeKind::SwitchDefault => default_target = Some(e.target),
                        _ => {}
                    }
                }
                if matched {
                    if let Some(t) = default_target {
                        for s in dead_chain(cfg, t) {
                            sink(s);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Pass 3: `v = e` where `v` is not live after the statement and `e` cannot
/// raise or touch the heap.
fn collect_dead_assignments(
    program: &Program,
    cfg: &Cfg,
    live_vars: &DataflowResult<SetFact<VarId>>,
    sink: &mut impl FnMut(StmtId),
) {
    for &n in cfg.nodes() {
        let lhs = match &program.stmt(n).kind {
            StmtKind::Assign { lhs, rhs } if has_no_side_effect(rhs) => *lhs,
            StmtKind::Copy { lhs, .. } => *lhs,
            // New touches the heap, casts may fail, field/array accesses may
            // fault or trigger initialization; never removable.
            _ => continue,
        };
        let live = live_vars.out_of(n).map(|f| f.contains(&lhs)).unwrap_or(true);
        if !live {
            sink(n);
        }
    }
}

/// Walks a dead branch target along its straight-line continuation: each
/// collected statement must be the sole successor of its predecessor and
/// have a single successor itself; the walk stops at joins and at the exit.
fn dead_chain(cfg: &Cfg, start: StmtId) -> Vec<StmtId> {
    let mut chain = Vec::new();
    let mut cur = start;
    loop {
        if cfg.in_edges_of(cur).len() != 1 || cfg.is_exit(cur) {
            break;
        }
        chain.push(cur);
        let out = cfg.out_edges_of(cur);
        if out.len() != 1 {
            break;
        }
        cur = out[0].target;
    }
    chain
}

fn eval_condition(op: ConditionOp, c1: i32, c2: i32) -> bool {
    match op {
        ConditionOp::Eq => c1 == c2,
        ConditionOp::Ne => c1 != c2,
        ConditionOp::Lt => c1 < c2,
        ConditionOp::Gt => c1 > c2,
        ConditionOp::Le => c1 <= c2,
        ConditionOp::Ge => c1 >= c2,
    }
}

fn has_no_side_effect(exp: &Exp) -> bool {
    match exp {
        // Division and remainder may trap on a zero divisor.
        Exp::Binary(b) => !matches!(b.op, BinaryOp::Arith(ArithOp::Div | ArithOp::Rem)),
        Exp::Cast { .. } => false,
        Exp::IntLiteral(_) | Exp::Var(_) => true,
    }
}
