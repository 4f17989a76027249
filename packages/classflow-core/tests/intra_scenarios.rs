//! Intraprocedural end-to-end scenarios: constant propagation, liveness and
//! dead-code detection over hand-built method CFGs.

mod common;

use classflow_core::{
    detect_dead_code, solve, solve_parallel, solve_with_cancel, ArithOp, BinaryExp, BinaryOp,
    CancelToken, CfgBuilder, ConditionExp, ConditionOp, ConstantPropagation, EdgeKind, Exp,
    LiveVariableAnalysis, ProgramBuilder, StmtKind, Value,
};
use common::{int_ty, linear_cfg};

#[test]
fn cp_division_by_zero_yields_undef() {
    // int f() { a = 10; b = 0; c = a / b; return c; }
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let a = b.add_var(m, "a", int_ty());
    let bb = b.add_var(m, "b", int_ty());
    let c = b.add_var(m, "c", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let s1 = b.add_stmt(m, StmtKind::Assign { lhs: a, rhs: Exp::IntLiteral(10) });
    let s2 = b.add_stmt(m, StmtKind::Assign { lhs: bb, rhs: Exp::IntLiteral(0) });
    let s3 = b.add_stmt(
        m,
        StmtKind::Assign {
            lhs: c,
            rhs: Exp::Binary(BinaryExp {
                op: BinaryOp::Arith(ArithOp::Div),
                lhs: a,
                rhs: bb,
            }),
        },
    );
    let s4 = b.add_stmt(m, StmtKind::Return { vars: vec![c] });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();
    let cfg = linear_cfg(m, entry, exit, &[s1, s2, s3, s4]);

    let result = solve(&ConstantPropagation::new(&program), &cfg);
    let out = result.out_of(s4).unwrap();

    assert_eq!(out.get(a), Value::Const(10));
    assert_eq!(out.get(bb), Value::Const(0));
    assert_eq!(out.get(c), Value::Undef, "x / 0 must evaluate to UNDEF");
}

#[test]
fn cp_meet_of_distinct_constants_is_nac() {
    // if (p ...) x = 1; else x = 2; return x;  -- p is an unknown parameter
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f(int)", false);
    let p = b.add_var(m, "p", int_ty());
    b.set_params(m, vec![p]);
    let x = b.add_var(m, "x", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let cond = b.add_stmt(
        m,
        StmtKind::If {
            cond: ConditionExp {
                op: ConditionOp::Gt,
                lhs: p,
                rhs: p,
            },
        },
    );
    let then_s = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
    let else_s = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(2) });
    let ret = b.add_stmt(m, StmtKind::Return { vars: vec![x] });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();

    let mut cb = CfgBuilder::new(m, entry, exit);
    cb.add_edge(entry, cond, EdgeKind::Normal);
    cb.add_edge(cond, then_s, EdgeKind::IfTrue);
    cb.add_edge(cond, else_s, EdgeKind::IfFalse);
    cb.add_edge(then_s, ret, EdgeKind::Normal);
    cb.add_edge(else_s, ret, EdgeKind::Normal);
    cb.add_edge(ret, exit, EdgeKind::Normal);
    let cfg = cb.build();

    let result = solve(&ConstantPropagation::new(&program), &cfg);

    assert_eq!(result.out_of(ret).unwrap().get(x), Value::Nac);
    assert_eq!(result.out_of(ret).unwrap().get(p), Value::Nac, "params start NAC");
    assert_eq!(result.out_of(then_s).unwrap().get(x), Value::Const(1));
    assert_eq!(result.out_of(else_s).unwrap().get(x), Value::Const(2));
}

#[test]
fn dead_code_constant_branch() {
    // if (1 < 2) { y1 = 1; } else { y2 = 2; } return y1;
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let one = b.add_var(m, "one", int_ty());
    let two = b.add_var(m, "two", int_ty());
    let y1 = b.add_var(m, "y1", int_ty());
    let y2 = b.add_var(m, "y2", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let c1 = b.add_stmt(m, StmtKind::Assign { lhs: one, rhs: Exp::IntLiteral(1) });
    let c2 = b.add_stmt(m, StmtKind::Assign { lhs: two, rhs: Exp::IntLiteral(2) });
    let cond = b.add_stmt(
        m,
        StmtKind::If {
            cond: ConditionExp {
                op: ConditionOp::Lt,
                lhs: one,
                rhs: two,
            },
        },
    );
    let then_s = b.add_stmt(m, StmtKind::Assign { lhs: y1, rhs: Exp::IntLiteral(1) });
    let else_s = b.add_stmt(m, StmtKind::Assign { lhs: y2, rhs: Exp::IntLiteral(2) });
    let ret = b.add_stmt(m, StmtKind::Return { vars: vec![y1] });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();

    let mut cb = CfgBuilder::new(m, entry, exit);
    cb.add_edge(entry, c1, EdgeKind::Normal);
    cb.add_edge(c1, c2, EdgeKind::Normal);
    cb.add_edge(c2, cond, EdgeKind::Normal);
    cb.add_edge(cond, then_s, EdgeKind::IfTrue);
    cb.add_edge(cond, else_s, EdgeKind::IfFalse);
    cb.add_edge(then_s, ret, EdgeKind::Normal);
    cb.add_edge(else_s, ret, EdgeKind::Normal);
    cb.add_edge(ret, exit, EdgeKind::Normal);
    let cfg = cb.build();

    let constants = solve(&ConstantPropagation::new(&program), &cfg);
    let live = solve(&LiveVariableAnalysis::new(&program), &cfg);
    let dead = detect_dead_code(&program, &cfg, &constants, &live);

    assert_eq!(dead, vec![else_s], "only the false branch is dead");
}

#[test]
fn dead_code_dead_assignment() {
    // x = 1; y = 2; return x;
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let x = b.add_var(m, "x", int_ty());
    let y = b.add_var(m, "y", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let s1 = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
    let s2 = b.add_stmt(m, StmtKind::Assign { lhs: y, rhs: Exp::IntLiteral(2) });
    let s3 = b.add_stmt(m, StmtKind::Return { vars: vec![x] });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();
    let cfg = linear_cfg(m, entry, exit, &[s1, s2, s3]);

    let constants = solve(&ConstantPropagation::new(&program), &cfg);
    let live = solve(&LiveVariableAnalysis::new(&program), &cfg);
    let dead = detect_dead_code(&program, &cfg, &constants, &live);

    assert_eq!(dead, vec![s2], "y is never read and the rhs has no effect");
}

#[test]
fn dead_code_constant_switch() {
    // v = 1; switch (v) { case 1: t1; case 9: t2; default: td; } join;
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let v = b.add_var(m, "v", int_ty());
    let r = b.add_var(m, "r", int_ty());
    let w1 = b.add_var(m, "w1", int_ty());
    let w2 = b.add_var(m, "w2", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let c0 = b.add_stmt(m, StmtKind::Assign { lhs: v, rhs: Exp::IntLiteral(1) });
    let sw = b.add_stmt(m, StmtKind::Switch { var: v });
    let t1 = b.add_stmt(m, StmtKind::Assign { lhs: r, rhs: Exp::IntLiteral(10) });
    let t2 = b.add_stmt(m, StmtKind::Assign { lhs: w1, rhs: Exp::IntLiteral(20) });
    let td = b.add_stmt(m, StmtKind::Assign { lhs: w2, rhs: Exp::IntLiteral(30) });
    let join = b.add_stmt(m, StmtKind::Return { vars: vec![r] });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();

    let mut cb = CfgBuilder::new(m, entry, exit);
    cb.add_edge(entry, c0, EdgeKind::Normal);
    cb.add_edge(c0, sw, EdgeKind::Normal);
    cb.add_edge(sw, t1, EdgeKind::SwitchCase(1));
    cb.add_edge(sw, t2, EdgeKind::SwitchCase(9));
    cb.add_edge(sw, td, EdgeKind::SwitchDefault);
    cb.add_edge(t1, join, EdgeKind::Normal);
    cb.add_edge(t2, join, EdgeKind::Normal);
    cb.add_edge(td, join, EdgeKind::Normal);
    cb.add_edge(join, exit, EdgeKind::Normal);
    let cfg = cb.build();

    let constants = solve(&ConstantPropagation::new(&program), &cfg);
    let live = solve(&LiveVariableAnalysis::new(&program), &cfg);
    let dead = detect_dead_code(&program, &cfg, &constants, &live);

    assert!(dead.contains(&t2), "non-matching case is dead");
    assert!(dead.contains(&td), "default is dead when a case matches");
    assert!(!dead.contains(&t1), "the matching case stays alive");
}

#[test]
fn dead_code_unreachable_statement() {
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let x = b.add_var(m, "x", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let s1 = b.add_stmt(m, StmtKind::Return { vars: vec![] });
    let stray = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();

    let mut cb = CfgBuilder::new(m, entry, exit);
    cb.add_edge(entry, s1, EdgeKind::Normal);
    cb.add_edge(s1, exit, EdgeKind::Normal);
    // stray has no incoming edge at all
    cb.add_edge(stray, exit, EdgeKind::Normal);
    let cfg = cb.build();

    let constants = solve(&ConstantPropagation::new(&program), &cfg);
    let live = solve(&LiveVariableAnalysis::new(&program), &cfg);
    let dead = detect_dead_code(&program, &cfg, &constants, &live);

    assert_eq!(dead, vec![stray]);
}

#[test]
fn cancelled_solve_is_flagged_incomplete() {
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let m = b.add_method(cls, "f()", false);
    let x = b.add_var(m, "x", int_ty());
    let entry = b.add_stmt(m, StmtKind::Nop);
    let s1 = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
    let exit = b.add_stmt(m, StmtKind::Nop);
    let program = b.finish();
    let cfg = linear_cfg(m, entry, exit, &[s1]);

    let token = CancelToken::new();
    token.cancel();
    let result = solve_with_cancel(&ConstantPropagation::new(&program), &cfg, &token);

    assert!(result.incomplete);
}

#[test]
fn parallel_fanout_matches_sequential() {
    let mut b = ProgramBuilder::new();
    let cls = b.add_class("A", None, vec![], false, false);
    let mut cfgs = Vec::new();
    let mut probes = Vec::new();
    for i in 0..4 {
        let m = b.add_method(cls, format!("f{i}()"), false);
        let x = b.add_var(m, "x", int_ty());
        let entry = b.add_stmt(m, StmtKind::Nop);
        let s1 = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(i) });
        let exit = b.add_stmt(m, StmtKind::Nop);
        probes.push((m, entry, exit, s1, x));
    }
    let program = b.finish();
    for &(m, entry, exit, s1, _) in &probes {
        cfgs.push(linear_cfg(m, entry, exit, &[s1]));
    }

    let analysis = ConstantPropagation::new(&program);
    let parallel = solve_parallel(&analysis, &cfgs);
    for (result, (cfg, &(_, _, _, s1, x))) in
        parallel.iter().zip(cfgs.iter().zip(probes.iter()))
    {
        let sequential = solve(&analysis, cfg);
        assert_eq!(
            result.out_of(s1).unwrap().get(x),
            sequential.out_of(s1).unwrap().get(x)
        );
    }
}
