//! TSP Tour Solver Library
//!
//! Reads named 2-D points, builds an integer Euclidean distance matrix and
//! routes a single vehicle through every point, starting and ending at the
//! first location (the depot).
//!
//! # Features
//!
//! - Plain `<id> <x> <y>` and TSPLIB coordinate files, scaled ×10
//! - First-solution strategies (Path Cheapest Arc, Insertion, Savings)
//! - Local search methods (2-opt, Or-opt, Relocate, Swap, VND)
//! - Metaheuristics (Simulated Annealing, Tabu Search, ILS)
//! - Reporting against a reference price, benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use tsp_tour_solver::instance::LocationSet;
//! use tsp_tour_solver::matrix::RoutingProblem;
//! use tsp_tour_solver::routing::{IndexManager, LocalSearchSolver, RoutingSolver, SearchParameters};
//! use tsp_tour_solver::report::ResultReporter;
//! use std::time::Duration;
//!
//! // Load locations and build the problem
//! let locations = LocationSet::from_file("bcl380.tsp").unwrap();
//! let problem = RoutingProblem::from_locations(&locations);
//! let manager = IndexManager::new(problem.num_nodes(), problem.num_vehicles, problem.depot).unwrap();
//!
//! // Solve with path cheapest arc
//! let result = LocalSearchSolver::new()
//!     .solve(&problem, &manager, &SearchParameters::default())
//!     .ok();
//!
//! let reporter = ResultReporter::new(&manager, &problem.distance_matrix, locations.name.as_str(), 1621);
//! println!("{}", reporter.report(result.as_ref(), Duration::ZERO));
//! ```

pub mod error;
pub mod instance;
pub mod matrix;
pub mod solution;
pub mod heuristics;
pub mod routing;
pub mod report;
pub mod benchmark;

pub use error::{Result, TourError};
pub use instance::{Location, LocationSet};
pub use matrix::{ArcCost, DistanceMatrix, RoutingProblem};
pub use report::{Report, ResultReporter};
pub use solution::Tour;
