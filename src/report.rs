//! Turning a solver answer into console and JSON output.

use crate::error::{Result, TourError};
use crate::matrix::ArcCost;
use crate::routing::{IndexManager, TourResult};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Percentage by which `objective` misses the reference price:
/// `100 - reference / objective * 100`.
///
/// Positive values mean the tour is worse than the reference, negative values
/// mean it is better. `None` when the objective is zero.
pub fn solution_error(reference_price: i64, objective: i64) -> Option<f64> {
    if objective == 0 {
        return None;
    }
    Some(100.0 - (reference_price as f64 / objective as f64 * 100.0))
}

/// Report of a solved tour.
#[derive(Debug, Clone, Serialize)]
pub struct TourReport {
    pub instance: String,
    pub algorithm: String,
    /// Objective value as returned by the solver
    pub objective: i64,
    pub reference_price: i64,
    pub solution_error: f64,
    /// Node indices from the depot back to the depot
    pub route: Vec<usize>,
    /// Arc costs summed along `route`
    pub route_distance: i64,
    /// Seconds spent inside the solver
    pub solve_time: f64,
    pub generated_at: String,
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Solved(TourReport),
    NoSolution { instance: String, reason: String, solve_time: f64 },
}

impl Report {
    pub fn is_solved(&self) -> bool {
        matches!(self, Report::Solved(_))
    }

    pub fn solve_time(&self) -> f64 {
        match self {
            Report::Solved(r) => r.solve_time,
            Report::NoSolution { solve_time, .. } => *solve_time,
        }
    }
}

/// Builds reports from solver results without touching them.
pub struct ResultReporter<'a, C: ArcCost + ?Sized> {
    manager: &'a IndexManager,
    costs: &'a C,
    instance: String,
    reference_price: i64,
}

impl<'a, C: ArcCost + ?Sized> ResultReporter<'a, C> {
    pub fn new(manager: &'a IndexManager, costs: &'a C, instance: impl Into<String>, reference_price: i64) -> Self {
        ResultReporter {
            manager,
            costs,
            instance: instance.into(),
            reference_price,
        }
    }

    /// Walk the route from the vehicle start to its end, summing arc costs.
    ///
    /// Each solver index is visited at most once; a malformed route is an
    /// error rather than a hang.
    pub fn route_distance(&self, result: &TourResult) -> Result<(Vec<usize>, i64)> {
        let broken = |reason: String| TourError::NoSolution { reason };
        let node_of = |index: usize| {
            self.manager
                .index_to_node(index)
                .ok_or_else(|| broken(format!("route holds unknown solver index {index}")))
        };

        let mut index = self.manager.start(0);
        let mut from = node_of(index)?;
        let mut route = vec![from];
        let mut visited = vec![false; self.manager.num_indices()];
        let mut distance = 0;

        while !self.manager.is_end(index) {
            if std::mem::replace(&mut visited[index], true) {
                return Err(broken(format!("route revisits solver index {index}")));
            }
            let next = result
                .next(index)
                .ok_or_else(|| broken(format!("route stops at solver index {index} before the end")))?;
            let to = node_of(next)?;
            distance += self.costs.arc_cost(from, to);
            route.push(to);
            (index, from) = (next, to);
        }

        Ok((route, distance))
    }

    /// Report for a solver answer; `None` means the solver found no tour.
    pub fn report(&self, result: Option<&TourResult>, solve_time: Duration) -> Report {
        let solve_time = solve_time.as_secs_f64();
        let no_solution = |reason: &str| Report::NoSolution {
            instance: self.instance.clone(),
            reason: reason.to_string(),
            solve_time,
        };

        let Some(result) = result else {
            return no_solution("solver returned no tour");
        };
        let Some(error) = solution_error(self.reference_price, result.objective()) else {
            return no_solution("objective value is zero");
        };

        let (route, route_distance) = match self.route_distance(result) {
            Ok(walk) => walk,
            Err(e) => {
                log::warn!("Discarding solver answer: {}", e);
                return no_solution(&e.to_string());
            }
        };
        if route_distance != result.objective() {
            log::warn!(
                "Recomputed route distance {} differs from objective {}",
                route_distance,
                result.objective()
            );
        }

        Report::Solved(TourReport {
            instance: self.instance.clone(),
            algorithm: result.algorithm.clone(),
            objective: result.objective(),
            reference_price: self.reference_price,
            solution_error: error,
            route,
            route_distance,
            solve_time,
            generated_at: chrono::Local::now().to_rfc3339(),
        })
    }
}

impl fmt::Display for TourReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Objective: {} miles", self.objective)?;
        writeln!(f, "solution error:{}%", self.solution_error.trunc() as i64)?;
        writeln!(f, "Route for vehicle 0:")?;
        let stops: Vec<String> = self.route.iter().map(|n| n.to_string()).collect();
        writeln!(f, " {}", stops.join(" -> "))?;
        writeln!(f, "Route distance: {}miles", self.route_distance)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Solved(report) => write!(f, "{report}")?,
            Report::NoSolution { reason, .. } => writeln!(f, "No solution found: {reason}")?,
        }
        write!(f, "solution time:{} seconds", self.solve_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DistanceMatrix;

    fn two_nodes() -> (IndexManager, DistanceMatrix) {
        let matrix = DistanceMatrix::from_rows(vec![vec![0, 50], vec![50, 0]]).unwrap();
        (IndexManager::new(2, 1, 0).unwrap(), matrix)
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.map_or(false, |v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn test_solution_error_sign() {
        // tour worse than reference
        assert!(close(solution_error(90, 100), 10.0));
        // tour better than reference
        assert!(close(solution_error(110, 100), -10.0));
        assert_eq!(solution_error(100, 100), Some(0.0));
        assert!(close(solution_error(1621, 2000), 18.95));
    }

    #[test]
    fn test_solution_error_guards_zero_objective() {
        assert_eq!(solution_error(100, 0), None);
    }

    #[test]
    fn test_report_for_two_node_tour() {
        let (manager, matrix) = two_nodes();
        let result = TourResult::new(vec![0, 1, 2], 100, "test");
        let report = ResultReporter::new(&manager, &matrix, "pair", 95)
            .report(Some(&result), Duration::from_millis(250));

        let Report::Solved(solved) = &report else {
            panic!("expected a solved report");
        };
        assert_eq!(solved.route, vec![0, 1, 0]);
        assert_eq!(solved.route_distance, 100);
        assert_eq!(solved.objective, 100);
        assert!((solved.solution_error - 5.0).abs() < 1e-9);

        let text = report.to_string();
        assert!(text.contains("Objective: 100 miles"));
        assert!(text.contains("solution error:5%"));
        assert!(text.contains(" 0 -> 1 -> 0"));
        assert!(text.contains("Route distance: 100miles"));
        assert!(text.ends_with("solution time:0.25 seconds"));
    }

    #[test]
    fn test_negative_error_is_printed_truncated() {
        let (manager, matrix) = two_nodes();
        let result = TourResult::new(vec![0, 1, 2], 100, "test");
        let report = ResultReporter::new(&manager, &matrix, "pair", 112)
            .report(Some(&result), Duration::ZERO);
        assert!(report.to_string().contains("solution error:-12%"));
    }

    #[test]
    fn test_missing_result_reports_no_solution() {
        let (manager, matrix) = two_nodes();
        let report = ResultReporter::new(&manager, &matrix, "pair", 100).report(None, Duration::ZERO);

        assert!(!report.is_solved());
        assert!(report.to_string().starts_with("No solution found"));
    }

    #[test]
    fn test_zero_objective_reports_no_solution() {
        let manager = IndexManager::new(1, 1, 0).unwrap();
        let matrix = DistanceMatrix::from_rows(vec![vec![0]]).unwrap();
        let result = TourResult::new(vec![0, 1], 0, "test");

        let report = ResultReporter::new(&manager, &matrix, "single", 100).report(Some(&result), Duration::ZERO);
        assert!(matches!(report, Report::NoSolution { .. }));
    }

    #[test]
    fn test_cycling_route_reports_no_solution() {
        let (manager, matrix) = two_nodes();
        // never reaches the end index 2
        let result = TourResult::new(vec![0, 1, 0], 100, "test");
        let reporter = ResultReporter::new(&manager, &matrix, "pair", 100);

        assert!(matches!(reporter.route_distance(&result), Err(TourError::NoSolution { .. })));
        let report = reporter.report(Some(&result), Duration::ZERO);
        assert!(!report.is_solved());
        assert!(report.to_string().contains("revisits solver index 0"));
    }

    #[test]
    fn test_truncated_or_foreign_route_reports_no_solution() {
        let (manager, matrix) = two_nodes();
        let reporter = ResultReporter::new(&manager, &matrix, "pair", 100);

        let stops_early = TourResult::new(vec![0, 1], 50, "test");
        assert!(!reporter.report(Some(&stops_early), Duration::ZERO).is_solved());

        let unknown_index = TourResult::new(vec![0, 9, 2], 50, "test");
        assert!(!reporter.report(Some(&unknown_index), Duration::ZERO).is_solved());
    }

    #[test]
    fn test_json_has_status_tag() {
        let (manager, matrix) = two_nodes();
        let report = ResultReporter::new(&manager, &matrix, "pair", 100).report(None, Duration::ZERO);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "no_solution");
    }
}
