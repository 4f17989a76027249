//! Classic live-variable analysis.
//!
//! Backward, meet = set union: `IN[s] = (OUT[s] \ def(s)) ∪ use(s)`.

use crate::features::dataflow::domain::fact::SetFact;
use crate::features::dataflow::infrastructure::solver::DataflowAnalysis;
use crate::shared::models::cfg::Cfg;
use crate::shared::models::ir::{Program, StmtId, VarId};

pub struct LiveVariableAnalysis<'p> {
    program: &'p Program,
}

impl<'p> LiveVariableAnalysis<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }
}

impl DataflowAnalysis for LiveVariableAnalysis<'_> {
    type Fact = SetFact<VarId>;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> Self::Fact {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> Self::Fact {
        SetFact::new()
    }

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact) {
        target.union(fact);
    }

    fn transfer_node(&self, node: StmtId, out: &Self::Fact, in_f: &mut Self::Fact) -> bool {
        let mut new_in = out.clone();
        if let Some(def) = self.program.def_of(node) {
            new_in.remove(&def);
        }
        for used in self.program.uses_of(node) {
            new_in.add(used);
        }
        if new_in == *in_f {
            false
        } else {
            *in_f = new_in;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dataflow::infrastructure::solver::solve;
    use crate::shared::models::cfg::{CfgBuilder, EdgeKind};
    use crate::shared::models::ir::{Exp, PrimKind, ProgramBuilder, StmtKind, Type};

    #[test]
    fn test_straight_line_liveness() {
        // x = 1; y = x; return y
        let mut b = ProgramBuilder::new();
        let c = b.add_class("A", None, vec![], false, false);
        let m = b.add_method(c, "f()", false);
        let x = b.add_var(m, "x", Type::Prim(PrimKind::Int));
        let y = b.add_var(m, "y", Type::Prim(PrimKind::Int));
        let entry = b.add_stmt(m, StmtKind::Nop);
        let s1 = b.add_stmt(m, StmtKind::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
        let s2 = b.add_stmt(m, StmtKind::Copy { lhs: y, rhs: x });
        let s3 = b.add_stmt(m, StmtKind::Return { vars: vec![y] });
        let exit = b.add_stmt(m, StmtKind::Nop);
        let program = b.finish();

        let mut cb = CfgBuilder::new(m, entry, exit);
        cb.add_edge(entry, s1, EdgeKind::Normal);
        cb.add_edge(s1, s2, EdgeKind::Normal);
        cb.add_edge(s2, s3, EdgeKind::Normal);
        cb.add_edge(s3, exit, EdgeKind::Normal);
        let cfg = cb.build();

        let result = solve(&LiveVariableAnalysis::new(&program), &cfg);

        let out_s1 = result.out_of(s1).unwrap();
        assert!(out_s1.contains(&x), "x live after its definition");
        assert!(!out_s1.contains(&y));
        let out_s2 = result.out_of(s2).unwrap();
        assert!(out_s2.contains(&y), "y live up to the return");
        assert!(!out_s2.contains(&x), "x dead after last use");
    }
}
