use super::{IndexManager, RoutingSolver, SearchParameters, TourResult};
use crate::error::{Result, TourError};
use crate::matrix::RoutingProblem;
use std::time::Instant;

/// Construction followed by local search improvement.
///
/// The first tour comes from the configured first-solution strategy; the
/// configured metaheuristic then improves it within the remaining time.
pub struct LocalSearchSolver;

impl LocalSearchSolver {
    pub fn new() -> Self {
        LocalSearchSolver
    }
}

impl Default for LocalSearchSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingSolver for LocalSearchSolver {
    fn solve(
        &self,
        problem: &RoutingProblem,
        manager: &IndexManager,
        params: &SearchParameters,
    ) -> Result<TourResult> {
        problem.validate()?;
        if manager.num_nodes() != problem.num_nodes() {
            return Err(TourError::InvalidProblem {
                reason: format!(
                    "index manager covers {} nodes, problem has {}",
                    manager.num_nodes(),
                    problem.num_nodes()
                ),
            });
        }
        if problem.num_nodes() == 0 {
            return Err(TourError::NoSolution {
                reason: "no locations to route".to_string(),
            });
        }

        let start = Instant::now();
        let heuristic = params.first_solution_strategy.heuristic();
        let mut tour = heuristic.construct(problem);
        log::info!("First solution ({}) cost {}", heuristic.name(), tour.cost);

        if !tour.is_complete(problem.num_nodes(), problem.depot) {
            return Err(TourError::NoSolution {
                reason: format!("{} did not visit every location", heuristic.name()),
            });
        }

        let remaining = params.time_limit.map(|l| l.saturating_sub(start.elapsed()));
        let improver = params.metaheuristic.improver(params.seed, remaining);
        if improver.improve(problem, &mut tour) {
            log::info!("{} improved tour to {}", improver.name(), tour.cost);
        }

        let mut route: Vec<usize> = Vec::with_capacity(tour.nodes.len() + 1);
        for &node in &tour.nodes {
            let index = manager.node_to_index(node).ok_or_else(|| TourError::NoSolution {
                reason: format!("node {node} has no solver index"),
            })?;
            route.push(index);
        }
        route.push(manager.end(0));

        let mut result = TourResult::new(
            route,
            tour.cost,
            format!("{}+{}", heuristic.name(), improver.name()),
        );
        result.iterations = tour.iterations;
        Ok(result)
    }

    fn name(&self) -> &str {
        "LocalSearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Location, LocationSet};
    use crate::matrix::ArcCost;
    use crate::routing::{FirstSolutionStrategy, Metaheuristic};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use std::io::Cursor;
    use std::time::Duration;

    fn problem_from(text: &str) -> (RoutingProblem, IndexManager) {
        let set = LocationSet::from_reader(Cursor::new(text)).unwrap();
        let problem = RoutingProblem::from_locations(&set);
        let manager = IndexManager::new(problem.num_nodes(), problem.num_vehicles, problem.depot).unwrap();
        (problem, manager)
    }

    fn scattered(n: usize) -> (RoutingProblem, IndexManager) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let locations = (0..n)
            .map(|i| {
                let (x, y) = (rng.gen_range(0..10_000i64), rng.gen_range(0..10_000i64));
                Location::new(format!("P{i}"), x * 10, y * 10)
            })
            .collect();
        let set = LocationSet::from_locations("scattered", locations).unwrap();
        let problem = RoutingProblem::from_locations(&set);
        let manager = IndexManager::new(n, problem.num_vehicles, problem.depot).unwrap();
        (problem, manager)
    }

    #[test]
    fn test_two_points_round_trip_is_one_hundred() {
        let (problem, manager) = problem_from("P1 0 0\nP2 3 4\n");
        let result = LocalSearchSolver::new()
            .solve(&problem, &manager, &SearchParameters::default())
            .unwrap();

        assert_eq!(result.node_route(&manager), Some(vec![0, 1, 0]));
        assert_eq!(result.objective(), 100);
    }

    #[test]
    fn test_every_configuration_visits_all_nodes_once() {
        let (problem, manager) =
            problem_from("A 0 0\nB 10 0\nC 10 10\nD 0 10\nE 5 5\nF 2 8\nG 7 1\nH 9 4\n");

        for strategy in FirstSolutionStrategy::ALL {
            for metaheuristic in Metaheuristic::ALL {
                let params = SearchParameters {
                    first_solution_strategy: strategy,
                    metaheuristic,
                    time_limit: Some(Duration::from_secs(5)),
                    seed: 7,
                };
                let result = LocalSearchSolver::new().solve(&problem, &manager, &params).unwrap();
                let route = result.node_route(&manager).unwrap();

                assert_eq!(route.first(), Some(&0));
                assert_eq!(route.last(), Some(&0));
                let mut inner = route[..route.len() - 1].to_vec();
                inner.sort_unstable();
                assert_eq!(inner, (0..8).collect::<Vec<_>>());

                let length = problem.tour_length(&route[..route.len() - 1]);
                assert_eq!(result.objective(), length);
            }
        }
    }

    #[test]
    fn test_single_location_has_zero_objective() {
        let (problem, manager) = problem_from("ONLY 4 2\n");
        let result = LocalSearchSolver::new()
            .solve(&problem, &manager, &SearchParameters::default())
            .unwrap();
        assert_eq!(result.node_route(&manager), Some(vec![0, 0]));
        assert_eq!(result.objective(), 0);
    }

    #[test]
    fn test_time_limit_holds_on_large_instance() {
        let (problem, manager) = scattered(1000);
        let limit = Duration::from_millis(100);

        for metaheuristic in [Metaheuristic::GreedyDescent, Metaheuristic::IteratedLocalSearch] {
            let params = SearchParameters {
                metaheuristic,
                time_limit: Some(limit),
                ..SearchParameters::default()
            };
            let start = Instant::now();
            let result = LocalSearchSolver::new().solve(&problem, &manager, &params).unwrap();
            let elapsed = start.elapsed();

            // construction is not interruptible, so allow some slack on top
            assert!(elapsed < limit + Duration::from_millis(400), "{metaheuristic:?} took {elapsed:?}");
            let route = result.node_route(&manager).unwrap();
            assert_eq!(route.len(), 1001);
            assert_eq!(result.objective(), problem.tour_length(&route[..1000]));
        }
    }

    #[test]
    fn test_empty_problem_is_no_solution() {
        let (problem, manager) = problem_from("");
        let err = LocalSearchSolver::new()
            .solve(&problem, &manager, &SearchParameters::default())
            .unwrap_err();
        assert!(matches!(err, TourError::NoSolution { .. }));
    }

    #[test]
    fn test_mismatched_manager_is_rejected() {
        let (problem, _) = problem_from("A 0 0\nB 1 1\n");
        let manager = IndexManager::new(5, 1, 0).unwrap();
        let err = LocalSearchSolver::new()
            .solve(&problem, &manager, &SearchParameters::default())
            .unwrap_err();
        assert!(matches!(err, TourError::InvalidProblem { .. }));
    }
}
