//! Benchmarking and experimentation module.
//!
//! Runs every first-solution strategy against every metaheuristic on one or
//! more instances, collects per-run results, aggregates statistics and
//! exports them as CSV and a text report.

use crate::error::{Result, TourError};
use crate::instance::LocationSet;
use crate::matrix::RoutingProblem;
use crate::report::solution_error;
use crate::routing::{
    FirstSolutionStrategy, IndexManager, LocalSearchSolver, Metaheuristic, RoutingSolver,
    SearchParameters,
};

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of a single solver run on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Strategy and metaheuristic, e.g. `PathCheapestArc+GreedyDescent`
    pub algorithm: String,
    pub instance: String,
    pub dimension: usize,
    pub seed: u64,
    /// Whether the solver returned a tour with a non-zero objective
    pub solved: bool,
    pub objective: i64,
    /// Solve time in seconds
    pub time: f64,
    pub iterations: Option<usize>,
    /// Solution error against the best-known price, if one is registered
    pub gap_to_best: Option<f64>,
}

/// Aggregated statistics for one algorithm across all runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    pub num_runs: usize,
    pub num_solved: usize,
    pub avg_objective: f64,
    pub best_objective: i64,
    pub worst_objective: i64,
    /// Sample standard deviation; zero with fewer than two solved runs
    pub std_objective: f64,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Runs per strategy and metaheuristic pair, one seed each
    pub num_runs: usize,
    /// Time limit per run
    pub time_limit: Option<Duration>,
    /// Seed of the first run; run `r` uses `base_seed + r`
    pub base_seed: u64,
    /// Run the combinations of an instance in parallel
    pub parallel: bool,
    /// Show a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            time_limit: Some(Duration::from_secs(60)),
            base_seed: 0,
            parallel: true,
            show_progress: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BestKnownRecord {
    instance: String,
    price: i64,
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
    best_known: HashMap<String, i64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Set best known price for an instance
    pub fn set_best_known(&mut self, instance_name: &str, price: i64) {
        self.best_known.insert(instance_name.to_string(), price);
    }

    /// Read best known prices from a CSV file with `instance,price` rows.
    ///
    /// Returns the number of prices read.
    pub fn load_best_known<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TourError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => TourError::Io(e),
        })?;

        let mut reader = csv::Reader::from_reader(file);
        let mut count = 0;
        for row in reader.deserialize() {
            let record: BestKnownRecord = row.map_err(|e| TourError::InputFormat {
                line: e.position().map_or(0, |p| p.line() as usize),
                content: String::new(),
                reason: e.to_string(),
            })?;
            self.best_known.insert(record.instance, record.price);
            count += 1;
        }

        log::info!("Loaded {} best known prices from {}", count, path.display());
        Ok(count)
    }

    /// Run every strategy and metaheuristic pair on an instance.
    pub fn run_instance(&mut self, instance: &LocationSet) -> Result<()> {
        let problem = RoutingProblem::from_locations(instance);
        problem.validate()?;
        let manager = IndexManager::new(problem.num_nodes(), problem.num_vehicles, problem.depot)?;

        let mut tasks = Vec::new();
        for strategy in FirstSolutionStrategy::ALL {
            for metaheuristic in Metaheuristic::ALL {
                for run in 0..self.config.num_runs {
                    tasks.push(SearchParameters {
                        first_solution_strategy: strategy,
                        metaheuristic,
                        time_limit: self.config.time_limit,
                        seed: self.config.base_seed + run as u64,
                    });
                }
            }
        }

        log::info!(
            "Running {} configurations on {} (n={})",
            tasks.len(),
            instance.name,
            instance.len()
        );

        let progress = if self.config.show_progress {
            let bar = ProgressBar::new(tasks.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_message(instance.name.clone());
            bar
        } else {
            ProgressBar::hidden()
        };

        let best = self.best_known.get(&instance.name).copied();
        let run = |params: &SearchParameters| {
            let result = run_once(instance, &problem, &manager, params, best);
            progress.inc(1);
            result
        };

        let mut results: Vec<RunResult> = if self.config.parallel {
            tasks.par_iter().map(run).collect()
        } else {
            tasks.iter().map(run).collect()
        };
        progress.finish_and_clear();

        self.results.append(&mut results);
        Ok(())
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[LocationSet]) -> Result<()> {
        for (i, instance) in instances.iter().enumerate() {
            println!(
                "\n[{}/{}] Processing {} (n={})...",
                i + 1,
                instances.len(),
                instance.name,
                instance.len()
            );
            self.run_instance(instance)?;
        }
        Ok(())
    }

    /// Compute statistics for each algorithm, best average objective first.
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut by_algorithm: HashMap<&str, Vec<&RunResult>> = HashMap::new();
        for result in &self.results {
            by_algorithm.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = by_algorithm
            .into_iter()
            .filter_map(|(algorithm, runs)| {
                let solved: Vec<&RunResult> = runs.iter().copied().filter(|r| r.solved).collect();
                if solved.is_empty() {
                    return None;
                }

                let objectives: Vec<f64> = solved.iter().map(|r| r.objective as f64).collect();
                let times: Vec<f64> = solved.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = solved.iter().filter_map(|r| r.gap_to_best).collect();

                let std_objective = objectives.iter().std_dev();

                Some(AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: runs.len(),
                    num_solved: solved.len(),
                    avg_objective: objectives.iter().mean(),
                    best_objective: solved.iter().map(|r| r.objective).min().unwrap_or_default(),
                    worst_objective: solved.iter().map(|r| r.objective).max().unwrap_or_default(),
                    std_objective: if std_objective.is_nan() { 0.0 } else { std_objective },
                    avg_time: times.iter().mean(),
                    total_time: times.iter().sum(),
                    avg_gap: (!gaps.is_empty()).then(|| gaps.iter().mean()),
                })
            })
            .collect();

        statistics.sort_by_key(|s| (OrderedFloat(s.avg_objective), s.algorithm.clone()));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for result in &self.results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("          TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str(&"-".repeat(96));
        report.push('\n');
        report.push_str(&format!(
            "{:<42} {:>8} {:>12} {:>10} {:>10} {:>10}\n",
            "Algorithm", "Solved", "Avg Obj", "Best Obj", "Avg Gap%", "Avg Time"
        ));
        report.push_str(&"-".repeat(96));
        report.push('\n');

        for stat in self.compute_statistics() {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<42} {:>8} {:>12.1} {:>10} {:>10} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_solved, stat.num_runs),
                stat.avg_objective,
                stat.best_objective,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str(&"-".repeat(96));
        report.push('\n');

        report.push_str("\nBest Tours per Instance:\n");
        let mut instance_best: BTreeMap<&str, &RunResult> = BTreeMap::new();
        for result in self.results.iter().filter(|r| r.solved) {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.objective < entry.objective {
                *entry = result;
            }
        }
        for (instance, best) in &instance_best {
            report.push_str(&format!("  {}: {} ({})\n", instance, best.objective, best.algorithm));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Get best known prices
    pub fn best_known(&self) -> &HashMap<String, i64> {
        &self.best_known
    }
}

fn algorithm_label(params: &SearchParameters) -> String {
    format!("{:?}+{:?}", params.first_solution_strategy, params.metaheuristic)
}

fn run_once(
    instance: &LocationSet,
    problem: &RoutingProblem,
    manager: &IndexManager,
    params: &SearchParameters,
    best_known: Option<i64>,
) -> RunResult {
    let start = Instant::now();
    let outcome = LocalSearchSolver::new().solve(problem, manager, params);
    let time = start.elapsed().as_secs_f64();

    let mut result = RunResult {
        algorithm: algorithm_label(params),
        instance: instance.name.clone(),
        dimension: instance.len(),
        seed: params.seed,
        solved: false,
        objective: 0,
        time,
        iterations: None,
        gap_to_best: None,
    };

    match outcome {
        Ok(tour) => {
            result.objective = tour.objective();
            result.iterations = tour.iterations;
            result.solved = tour.objective() > 0;
            result.gap_to_best = best_known.and_then(|best| solution_error(best, tour.objective()));
        }
        Err(e) => log::warn!("{} on {}: {}", result.algorithm, instance.name, e),
    }

    result
}

/// Load every `.tsp` file in a directory, smallest instance first.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<LocationSet>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == "tsp") {
            match LocationSet::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.name.cmp(&b.name)));
    Ok(instances)
}
