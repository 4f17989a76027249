//! Property tests for the universal analysis invariants: lattice laws,
//! transfer monotonicity, solver fixpoint/idempotence/determinism, CHA
//! soundness, and points-to growth.

mod common;

use classflow_core::{
    resolve, solve, ArithOp, BinaryExp, BinaryOp, CallKind, Cfg, CfgBuilder, ClassHierarchy,
    ConstantPropagation, CPFact, DataflowAnalysis, EdgeKind, Exp, Invoke, MethodRef, ObjId,
    Pointer, PointerFlowGraph, PointsToSet, Program, ProgramBuilder, StmtId, StmtKind, Value,
    VarId,
};
use common::int_ty;
use proptest::prelude::*;
use quickcheck_macros::quickcheck;

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undef),
        any::<i32>().prop_map(Value::Const),
        // small constants raise the collision rate the meet laws care about
        (-2i32..=2).prop_map(Value::Const),
        Just(Value::Nac),
    ]
}

/// `a ⊑ b` in the CP lattice (UNDEF below constants below NAC).
fn leq(a: Value, b: Value) -> bool {
    a.meet(b) == b
}

proptest! {
    #[test]
    fn meet_is_commutative(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(a.meet(b), b.meet(a));
    }

    #[test]
    fn meet_is_associative(
        a in value_strategy(),
        b in value_strategy(),
        c in value_strategy()
    ) {
        prop_assert_eq!(a.meet(b).meet(c), a.meet(b.meet(c)));
    }

    #[test]
    fn meet_is_idempotent(a in value_strategy()) {
        prop_assert_eq!(a.meet(a), a);
    }

    #[test]
    fn meet_is_an_upper_bound(a in value_strategy(), b in value_strategy()) {
        prop_assert!(leq(a, a.meet(b)));
        prop_assert!(leq(b, a.meet(b)));
    }
}

fn arith_op(tag: u8) -> BinaryOp {
    match tag % 5 {
        0 => BinaryOp::Arith(ArithOp::Add),
        1 => BinaryOp::Arith(ArithOp::Sub),
        2 => BinaryOp::Arith(ArithOp::Mul),
        3 => BinaryOp::Arith(ArithOp::Div),
        _ => BinaryOp::Arith(ArithOp::Rem),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        max_global_rejects: 1_000_000,
        ..ProptestConfig::default()
    })]

    /// Transfer monotonicity: raising either operand in the lattice never
    /// lowers the evaluation result.
    #[test]
    fn evaluate_is_monotone(
        op_tag in any::<u8>(),
        va in value_strategy(),
        vb in value_strategy(),
        wa in value_strategy(),
        wb in value_strategy(),
    ) {
        prop_assume!(leq(va, wa) && leq(vb, wb));

        let mut b = ProgramBuilder::new();
        let cls = b.add_class("A", None, vec![], false, false);
        let m = b.add_method(cls, "f()", false);
        let x = b.add_var(m, "x", int_ty());
        let y = b.add_var(m, "y", int_ty());
        let program = b.finish();

        let exp = Exp::Binary(BinaryExp { op: arith_op(op_tag), lhs: x, rhs: y });
        let cp = ConstantPropagation::new(&program);

        let mut lo = CPFact::new();
        lo.update(x, va);
        lo.update(y, vb);
        let mut hi = CPFact::new();
        hi.update(x, wa);
        hi.update(y, wb);

        prop_assert!(
            leq(cp.evaluate(&exp, &lo), cp.evaluate(&exp, &hi)),
            "evaluate({:?}) not monotone: {:?},{:?} -> {:?} vs {:?},{:?} -> {:?}",
            arith_op(op_tag), va, vb, cp.evaluate(&exp, &lo), wa, wb, cp.evaluate(&exp, &hi)
        );
    }
}

/// Builds a small program with `shapes.len()` assignments over a pool of
/// four integer variables, chained linearly with `extra` branch edges on
/// top. `reverse` flips edge insertion order to shuffle worklist order.
fn build_random_method(
    shapes: &[(u8, u8, i8)],
    extra: &[(u8, u8)],
    reverse: bool,
) -> (Program, Cfg, Vec<StmtId>) {
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let vars: Vec<VarId> = (0..4).map(|i| b.add_var(m, format!("v{i}"), int_ty())).collect();
    let entry = b.add_stmt(m, StmtKind::Nop);
    let stmts: Vec<StmtId> = shapes
        .iter()
        .map(|&(lhs, shape, lit)| {
            let lhs = vars[lhs as usize % 4];
            let rhs = match shape % 3 {
                0 => Exp::IntLiteral(lit as i32),
                1 => Exp::Var(vars[lit.unsigned_abs() as usize % 4]),
                _ => Exp::Binary(BinaryExp {
                    op: arith_op(shape),
                    lhs: vars[lit.unsigned_abs() as usize % 4],
                    rhs: vars[(lit.unsigned_abs() as usize + 1) % 4],
                }),
            };
            b.add_stmt(m, StmtKind::Assign { lhs, rhs })
        })
        .collect();
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();

    let mut edges = Vec::new();
    let mut prev = entry;
    for &s in &stmts {
        edges.push((prev, s));
        prev = s;
    }
    edges.push((prev, exit));
    for &(a, bb) in extra {
        let from = stmts[a as usize % stmts.len()];
        let to = stmts[bb as usize % stmts.len()];
        if from != to {
            edges.push((from, to));
        }
    }
    if reverse {
        edges.reverse();
    }
    let mut cb = CfgBuilder::new(m, entry, exit);
    for (from, to) in edges {
        cb.add_edge(from, to, EdgeKind::Normal);
    }
    (program, cb.build(), stmts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After `solve`, every non-entry node satisfies the fixpoint equation
    /// `out[n] = transfer(n, meet of predecessor outs)`.
    #[test]
    fn solver_reaches_a_fixpoint(
        shapes in prop::collection::vec((any::<u8>(), any::<u8>(), any::<i8>()), 1..10),
        extra in prop::collection::vec((any::<u8>(), any::<u8>()), 0..6),
    ) {
        let (program, cfg, _) = build_random_method(&shapes, &extra, false);
        let cp = ConstantPropagation::new(&program);
        let result = solve(&cp, &cfg);

        for &n in cfg.nodes() {
            if cfg.is_entry(n) {
                continue;
            }
            let mut in_fact = cp.new_initial_fact();
            for p in cfg.preds_of(n) {
                cp.meet_into(result.out_of(p).unwrap(), &mut in_fact);
            }
            let mut out = result.out_of(n).unwrap().clone();
            let changed = cp.transfer_node(n, &in_fact, &mut out);
            prop_assert!(!changed, "node {n:?} still changes after convergence");
            prop_assert_eq!(&out, result.out_of(n).unwrap());
        }
    }

    /// Solving twice yields identical facts.
    #[test]
    fn solver_is_idempotent(
        shapes in prop::collection::vec((any::<u8>(), any::<u8>(), any::<i8>()), 1..10),
        extra in prop::collection::vec((any::<u8>(), any::<u8>()), 0..6),
    ) {
        let (program, cfg, _) = build_random_method(&shapes, &extra, false);
        let cp = ConstantPropagation::new(&program);
        let first = solve(&cp, &cfg);
        let second = solve(&cp, &cfg);

        for &n in cfg.nodes() {
            prop_assert_eq!(first.in_of(n).unwrap(), second.in_of(n).unwrap());
            prop_assert_eq!(first.out_of(n).unwrap(), second.out_of(n).unwrap());
        }
    }

    /// Worklist order must not change the fixpoint: the same method solved
    /// with reversed edge insertion (different node and successor order)
    /// produces the same facts.
    #[test]
    fn solver_is_deterministic_under_worklist_order(
        shapes in prop::collection::vec((any::<u8>(), any::<u8>(), any::<i8>()), 1..10),
        extra in prop::collection::vec((any::<u8>(), any::<u8>()), 0..6),
    ) {
        let (program_a, cfg_a, stmts_a) = build_random_method(&shapes, &extra, false);
        let (program_b, cfg_b, stmts_b) = build_random_method(&shapes, &extra, true);
        let result_a = solve(&ConstantPropagation::new(&program_a), &cfg_a);
        let result_b = solve(&ConstantPropagation::new(&program_b), &cfg_b);

        for (&sa, &sb) in stmts_a.iter().zip(stmts_b.iter()) {
            prop_assert_eq!(result_a.out_of(sa).unwrap(), result_b.out_of(sb).unwrap());
        }
    }
}

/// CHA soundness on one-level hierarchies: every concrete override of a
/// subclass of the declared receiver type is in the resolved set.
#[quickcheck]
fn qc_cha_resolves_every_direct_override(child_count: u8, override_mask: u8) -> bool {
    let child_count = (child_count % 6) as usize;
    let mut b = ProgramBuilder::new();
    let base = b.add_class("Base", None, vec![], false, false);
    let base_m = b.add_method(base, "m()", false);
    let mut overriders = Vec::new();
    for i in 0..child_count {
        let child = b.add_class(format!("C{i}"), Some(base), vec![], false, false);
        if override_mask & (1u8 << i) != 0 {
            overriders.push(b.add_method(child, "m()", false));
        }
    }
    let program = b.finish();
    let hierarchy = ClassHierarchy::build(&program);

    let inv = Invoke {
        kind: CallKind::Virtual,
        method_ref: MethodRef {
            class: base,
            subsignature: "m()".into(),
        },
        recv: None,
        args: vec![],
        result: None,
    };
    let targets = resolve(&program, &hierarchy, &inv);

    targets.contains(&base_m) && overriders.iter().all(|m| targets.contains(m))
}

/// Points-to sets only ever grow, and each propagation returns exactly the
/// unseen part of its input.
#[quickcheck]
fn qc_points_to_growth_is_monotone(updates: Vec<(u8, Vec<u8>)>) -> bool {
    let mut pfg: PointerFlowGraph<Pointer, ObjId> = PointerFlowGraph::new();
    for (ptr, objs) in updates {
        let pointer = Pointer::Var(VarId(u32::from(ptr) % 8));
        let before = pfg.points_to(&pointer).map(|s| s.len()).unwrap_or(0);
        let mut pts = PointsToSet::new();
        for o in objs {
            pts.add(ObjId(u32::from(o) % 16));
        }
        let delta = pfg.propagate(&pointer, &pts);
        let after = pfg.points_to(&pointer).map(|s| s.len()).unwrap_or(0);

        if after < before || after != before + delta.len() {
            return false;
        }
        if delta.iter().any(|o| !pts.contains(o)) {
            return false;
        }
    }
    true
}
