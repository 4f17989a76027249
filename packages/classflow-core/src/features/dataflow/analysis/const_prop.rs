//! Intraprocedural integer constant propagation.
//!
//! Forward, pointwise meet over [`CPFact`]s. Only variables of the integer
//! primitive kinds participate; formal parameters enter the boundary fact
//! as `Nac`. Division and remainder by a known zero yield `Undef` (the
//! statement cannot complete normally), every other non-evaluable shape
//! defaults to `Nac`.

use crate::features::dataflow::domain::fact::CPFact;
use crate::features::dataflow::domain::value::Value;
use crate::features::dataflow::infrastructure::solver::DataflowAnalysis;
use crate::shared::models::cfg::Cfg;
use crate::shared::models::ir::{
    ArithOp, BinaryOp, BitwiseOp, ConditionOp, Exp, Program, ShiftOp, StmtId, StmtKind, VarId,
};

pub struct ConstantPropagation<'p> {
    program: &'p Program,
}

impl<'p> ConstantPropagation<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.can_hold_int()
    }

    /// Evaluates an expression against an IN fact.
    pub fn evaluate(&self, exp: &Exp, fact: &CPFact) -> Value {
        match exp {
            Exp::IntLiteral(n) => Value::Const(*n),
            Exp::Var(v) => fact.get(*v),
            Exp::Binary(b) => eval_binary(b.op, fact.get(b.lhs), fact.get(b.rhs)),
            // Casts are not modeled; fall through to not-a-constant.
            Exp::Cast { .. } => Value::Nac,
        }
    }

    /// The value a statement binds to its defined variable, when that
    /// variable participates in constant propagation.
    fn eval_def(&self, node: StmtId, in_fact: &CPFact) -> Option<(VarId, Value)> {
        match &self.program.stmt(node).kind {
            StmtKind::Assign { lhs, rhs } if self.can_hold_int(*lhs) => {
                Some((*lhs, self.evaluate(rhs, in_fact)))
            }
            StmtKind::Copy { lhs, rhs } if self.can_hold_int(*lhs) => {
                Some((*lhs, in_fact.get(*rhs)))
            }
            StmtKind::LoadField { lhs, .. } | StmtKind::LoadArray { lhs, .. }
                if self.can_hold_int(*lhs) =>
            {
                Some((*lhs, Value::Nac))
            }
            StmtKind::Invoke(inv) => match inv.result {
                Some(r) if self.can_hold_int(r) => Some((r, Value::Nac)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CPFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn new_boundary_fact(&self, cfg: &Cfg) -> CPFact {
        let mut fact = CPFact::new();
        for &param in self.program.method(cfg.method()).params() {
            if self.can_hold_int(param) {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CPFact {
        CPFact::new()
    }

    fn meet_into(&self, fact: &CPFact, target: &mut CPFact) {
        for var in fact.keys() {
            let merged = fact.get(var).meet(target.get(var));
            target.update(var, merged);
        }
    }

    fn transfer_node(&self, node: StmtId, in_fact: &CPFact, out: &mut CPFact) -> bool {
        let mut new_out = in_fact.clone();
        if let Some((lhs, value)) = self.eval_def(node, in_fact) {
            new_out.update(lhs, value);
        }
        if new_out == *out {
            false
        } else {
            *out = new_out;
            true
        }
    }
}

fn eval_binary(op: BinaryOp, v1: Value, v2: Value) -> Value {
    if let (Some(c1), Some(c2)) = (v1.const_value(), v2.const_value()) {
        return match op {
            BinaryOp::Arith(ArithOp::Div | ArithOp::Rem) if c2 == 0 => Value::Undef,
            _ => Value::Const(compute(op, c1, c2)),
        };
    }
    if v1.is_nac() || v2.is_nac() {
        // A known zero divisor forces Undef even under a NAC dividend.
        return match op {
            BinaryOp::Arith(ArithOp::Div | ArithOp::Rem) if v2 == Value::Const(0) => Value::Undef,
            _ => Value::Nac,
        };
    }
    Value::Undef
}

fn compute(op: BinaryOp, c1: i32, c2: i32) -> i32 {
    match op {
        BinaryOp::Arith(a) => match a {
            ArithOp::Add => c1.wrapping_add(c2),
            ArithOp::Sub => c1.wrapping_sub(c2),
            ArithOp::Mul => c1.wrapping_mul(c2),
            // Zero divisors are filtered by the caller.
            ArithOp::Div => c1.wrapping_div(c2),
            ArithOp::Rem => c1.wrapping_rem(c2),
        },
        // Shift counts are taken modulo 32.
        BinaryOp::Shift(s) => match s {
            ShiftOp::Shl => c1.wrapping_shl(c2 as u32),
            ShiftOp::Shr => c1.wrapping_shr(c2 as u32),
            ShiftOp::Ushr => ((c1 as u32).wrapping_shr(c2 as u32)) as i32,
        },
        BinaryOp::Bitwise(b) => match b {
            BitwiseOp::And => c1 & c2,
            BitwiseOp::Or => c1 | c2,
            BitwiseOp::Xor => c1 ^ c2,
        },
        BinaryOp::Condition(c) => {
            let holds = match c {
                ConditionOp::Eq => c1 == c2,
                ConditionOp::Ne => c1 != c2,
                ConditionOp::Lt => c1 < c2,
                ConditionOp::Gt => c1 > c2,
                ConditionOp::Le => c1 <= c2,
                ConditionOp::Ge => c1 >= c2,
            };
            holds as i32
        }
    }
}
