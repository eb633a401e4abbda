//! Heuristics module.
//!
//! This module exports the first-solution (construction) heuristics and the
//! local search / metaheuristic improvement methods.

pub mod construction;
pub mod local_search;

pub use construction::*;
pub use local_search::*;
