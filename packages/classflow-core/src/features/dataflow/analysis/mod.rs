pub mod const_prop;
pub mod dead_code;
pub mod live_vars;
pub mod parallel;
