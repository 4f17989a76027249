//! Shared scaffolding for integration tests.

use classflow_core::{
    Cfg, CfgBuilder, EdgeKind, MethodId, PrimKind, StmtId, Type,
};

pub fn int_ty() -> Type {
    Type::Prim(PrimKind::Int)
}

/// Chains `stmts` with `Normal` edges between `entry` and `exit`.
pub fn linear_cfg(method: MethodId, entry: StmtId, exit: StmtId, stmts: &[StmtId]) -> Cfg {
    let mut b = CfgBuilder::new(method, entry, exit);
    let mut prev = entry;
    for &s in stmts {
        b.add_edge(prev, s, EdgeKind::Normal);
        prev = s;
    }
    b.add_edge(prev, exit, EdgeKind::Normal);
    b.build()
}
