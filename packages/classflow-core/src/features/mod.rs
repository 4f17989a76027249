pub mod callgraph;
pub mod dataflow;
pub mod interproc;
pub mod pta;
