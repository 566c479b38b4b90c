//! Core planning logic: types, id issuance, resolution, compilation, parsing.

pub mod error;
pub mod hasher;
pub mod parser;
pub mod plan_id;
pub mod planner;
pub mod resolver;
pub mod types;
