//! Stepplan: compiles pipeline step configuration into versioned build plans.
//!
//! Every node of a compiled plan carries a unique id, resource and image
//! references are resolved up front, and `across` steps are expanded into
//! one scoped sub-plan per combination of values.

pub mod cli;
pub mod core;
pub mod vars;
