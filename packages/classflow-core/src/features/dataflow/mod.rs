//! Intraprocedural dataflow: lattice domains, the generic worklist solver,
//! and the analyses built on it (liveness, constant propagation, dead code).

pub mod analysis;
pub mod domain;
pub mod infrastructure;
