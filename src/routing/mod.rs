//! Request/response contract between the tour pipeline and a routing solver.
//!
//! The caller hands over a [`RoutingProblem`], an [`IndexManager`] and
//! [`SearchParameters`]; the solver answers with a [`TourResult`] whose route
//! is expressed in solver indices, or with [`TourError::NoSolution`].
//!
//! [`TourError::NoSolution`]: crate::error::TourError::NoSolution

mod index;
mod solver;

pub use index::IndexManager;
pub use solver::LocalSearchSolver;

use crate::error::Result;
use crate::heuristics::construction::*;
use crate::heuristics::local_search::*;
use crate::matrix::RoutingProblem;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Greedy strategy used to build the first tour.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum FirstSolutionStrategy {
    PathCheapestArc,
    CheapestInsertion,
    FarthestInsertion,
    Savings,
}

impl FirstSolutionStrategy {
    pub const ALL: [FirstSolutionStrategy; 4] = [
        FirstSolutionStrategy::PathCheapestArc,
        FirstSolutionStrategy::CheapestInsertion,
        FirstSolutionStrategy::FarthestInsertion,
        FirstSolutionStrategy::Savings,
    ];

    pub fn heuristic(&self) -> Box<dyn ConstructionHeuristic + Send + Sync> {
        match self {
            FirstSolutionStrategy::PathCheapestArc => Box::new(PathCheapestArc::new()),
            FirstSolutionStrategy::CheapestInsertion => Box::new(InsertionHeuristic::cheapest()),
            FirstSolutionStrategy::FarthestInsertion => Box::new(InsertionHeuristic::farthest()),
            FirstSolutionStrategy::Savings => Box::new(SavingsHeuristic::new()),
        }
    }
}

/// Improvement phase applied to the first tour.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Metaheuristic {
    /// Descend to a local optimum of the standard neighbourhoods
    GreedyDescent,
    SimulatedAnnealing,
    TabuSearch,
    IteratedLocalSearch,
}

impl Metaheuristic {
    pub const ALL: [Metaheuristic; 4] = [
        Metaheuristic::GreedyDescent,
        Metaheuristic::SimulatedAnnealing,
        Metaheuristic::TabuSearch,
        Metaheuristic::IteratedLocalSearch,
    ];

    pub fn improver(&self, seed: u64, time_limit: Option<Duration>) -> Box<dyn LocalSearch + Send + Sync> {
        match self {
            Metaheuristic::GreedyDescent => {
                Box::new(VND::with_standard_operators().with_time_limit(time_limit))
            }
            Metaheuristic::SimulatedAnnealing => {
                let mut sa = SimulatedAnnealing::new();
                sa.seed = seed;
                sa.time_limit = time_limit;
                Box::new(sa)
            }
            Metaheuristic::TabuSearch => {
                let mut ts = TabuSearch::new();
                ts.time_limit = time_limit;
                Box::new(ts)
            }
            Metaheuristic::IteratedLocalSearch => {
                let mut ils = IteratedLocalSearch::new();
                ils.seed = seed;
                ils.time_limit = time_limit;
                Box::new(ils)
            }
        }
    }
}

/// Knobs passed through to the solver unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParameters {
    pub first_solution_strategy: FirstSolutionStrategy,
    pub metaheuristic: Metaheuristic,
    /// Wall-clock limit for the whole search
    pub time_limit: Option<Duration>,
    /// Seed for stochastic metaheuristics
    pub seed: u64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            first_solution_strategy: FirstSolutionStrategy::PathCheapestArc,
            metaheuristic: Metaheuristic::GreedyDescent,
            time_limit: None,
            seed: 42,
        }
    }
}

/// A solved tour in solver indices plus its objective value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourResult {
    route: Vec<usize>,
    objective: i64,
    /// Algorithm chain that produced the tour
    pub algorithm: String,
    /// Iterations spent in the improvement phase
    pub iterations: Option<usize>,
}

impl TourResult {
    /// `route` must start at the vehicle start index and end at its end index.
    pub fn new(route: Vec<usize>, objective: i64, algorithm: impl Into<String>) -> Self {
        TourResult {
            route,
            objective,
            algorithm: algorithm.into(),
            iterations: None,
        }
    }

    /// Sum of the arc costs along the route.
    pub fn objective(&self) -> i64 {
        self.objective
    }

    /// Successor of a solver index on the route.
    pub fn next(&self, index: usize) -> Option<usize> {
        let pos = self.route.iter().position(|&i| i == index)?;
        self.route.get(pos + 1).copied()
    }

    /// The route as node indices, depot at both ends. `None` if the route
    /// holds an index the manager does not know.
    pub fn node_route(&self, manager: &IndexManager) -> Option<Vec<usize>> {
        self.route.iter().map(|&i| manager.index_to_node(i)).collect()
    }
}

/// A routing engine answering the solve request.
pub trait RoutingSolver {
    fn solve(
        &self,
        problem: &RoutingProblem,
        manager: &IndexManager,
        params: &SearchParameters,
    ) -> Result<TourResult>;

    fn name(&self) -> &str;
}
