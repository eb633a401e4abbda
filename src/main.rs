//! TSP Tour Solver - Command Line Interface
//!
//! Routes a single vehicle through a set of named points and reports the tour
//! against a reference price.

use clap::{Parser, Subcommand, ValueEnum};
use tsp_tour_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsp_tour_solver::error::{Result, TourError};
use tsp_tour_solver::heuristics::construction::{ConstructionHeuristic, PathCheapestArc};
use tsp_tour_solver::instance::LocationSet;
use tsp_tour_solver::matrix::RoutingProblem;
use tsp_tour_solver::report::ResultReporter;
use tsp_tour_solver::routing::{self, IndexManager, LocalSearchSolver, RoutingSolver, SearchParameters};

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "tsp-tour-solver")]
#[command(version = "1.0")]
#[command(about = "Single-vehicle TSP tour solver with reference price reporting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance and compare the tour with a reference price
    Solve {
        /// Path to the point file
        #[arg(short, long, default_value = "bcl380.tsp")]
        input: PathBuf,

        /// Reference price; prompted for when omitted
        #[arg(short = 'p', long)]
        reference_price: Option<i64>,

        /// First solution strategy
        #[arg(long, value_enum, default_value = "path-cheapest-arc")]
        first_solution: FirstSolution,

        /// Improvement phase after the first solution
        #[arg(short, long, value_enum, default_value = "greedy-descent")]
        metaheuristic: Improvement,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the point file
        #[arg(short, long, default_value = "bcl380.tsp")]
        input: PathBuf,
    },

    /// Run every strategy and metaheuristic on a file or directory of instances
    Benchmark {
        /// Instance file, or directory containing `.tsp` files
        #[arg(short, long)]
        input: PathBuf,

        /// Number of runs per combination
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Time limit per run in seconds
        #[arg(short, long, default_value = "60")]
        time_limit: f64,

        /// CSV file with `instance,price` rows
        #[arg(short, long)]
        best_known: Option<PathBuf>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum FirstSolution {
    /// Extend the route by the cheapest arc from its last node
    PathCheapestArc,
    /// Insert the node with the cheapest insertion cost
    CheapestInsertion,
    /// Insert the node farthest from the route
    FarthestInsertion,
    /// Savings algorithm (Clarke-Wright)
    Savings,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Improvement {
    /// Variable Neighborhood Descent to a local optimum
    GreedyDescent,
    /// Simulated Annealing
    SimulatedAnnealing,
    /// Tabu Search
    TabuSearch,
    /// Iterated Local Search
    IteratedLocalSearch,
}

impl From<FirstSolution> for routing::FirstSolutionStrategy {
    fn from(value: FirstSolution) -> Self {
        match value {
            FirstSolution::PathCheapestArc => routing::FirstSolutionStrategy::PathCheapestArc,
            FirstSolution::CheapestInsertion => routing::FirstSolutionStrategy::CheapestInsertion,
            FirstSolution::FarthestInsertion => routing::FirstSolutionStrategy::FarthestInsertion,
            FirstSolution::Savings => routing::FirstSolutionStrategy::Savings,
        }
    }
}

impl From<Improvement> for routing::Metaheuristic {
    fn from(value: Improvement) -> Self {
        match value {
            Improvement::GreedyDescent => routing::Metaheuristic::GreedyDescent,
            Improvement::SimulatedAnnealing => routing::Metaheuristic::SimulatedAnnealing,
            Improvement::TabuSearch => routing::Metaheuristic::TabuSearch,
            Improvement::IteratedLocalSearch => routing::Metaheuristic::IteratedLocalSearch,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Solve {
            input,
            reference_price,
            first_solution,
            metaheuristic,
            time_limit,
            seed,
            output,
            verbose,
        } => {
            let params = SearchParameters {
                first_solution_strategy: first_solution.into(),
                metaheuristic: metaheuristic.into(),
                time_limit: time_limit.map(seconds),
                seed,
            };
            solve_instance(&input, reference_price, params, output, verbose)
        }

        Commands::Analyze { input } => analyze_instance(&input),

        Commands::Benchmark {
            input,
            runs,
            time_limit,
            best_known,
            output,
        } => run_benchmark(&input, runs, time_limit, best_known, &output),
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Ask for the reference price on stdin.
fn prompt_reference_price() -> Result<i64> {
    print!("input solution price>");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    parse_reference_price(&line)
}

/// Reference prices are whole numbers; surrounding whitespace is ignored.
fn parse_reference_price(answer: &str) -> Result<i64> {
    let answer = answer.trim();
    answer.parse().map_err(|_| TourError::InvalidReferencePrice {
        input: answer.to_string(),
    })
}

fn solve_instance(
    path: &Path,
    reference_price: Option<i64>,
    params: SearchParameters,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let reference_price = match reference_price {
        Some(price) => price,
        None => prompt_reference_price()?,
    };

    let locations = LocationSet::from_file(path)?;
    let problem = RoutingProblem::from_locations(&locations);
    let manager = IndexManager::new(problem.num_nodes(), problem.num_vehicles, problem.depot)?;

    if verbose {
        println!("{}", locations.statistics(&problem.distance_matrix));
        println!("Search parameters: {:?}", params);
    }

    let solver = LocalSearchSolver::new();
    log::info!("Solving {} with {}", locations.name, solver.name());

    let start = Instant::now();
    let outcome = solver.solve(&problem, &manager, &params);
    let elapsed = start.elapsed();

    let result = match outcome {
        Ok(result) => Some(result),
        Err(TourError::NoSolution { reason }) => {
            log::warn!("Solver found no tour: {}", reason);
            None
        }
        Err(e) => return Err(e),
    };

    let reporter = ResultReporter::new(&manager, &problem.distance_matrix, locations.name.as_str(), reference_price);
    let report = reporter.report(result.as_ref(), elapsed);
    println!("{}", report);

    if verbose {
        if let Some(result) = &result {
            println!("Algorithm: {}", result.algorithm);
            if let Some(iter) = result.iterations {
                println!("Iterations: {}", iter);
            }
        }
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&out_path, json)?;
        println!("\nReport saved to {:?}", out_path);
    }

    Ok(())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let locations = LocationSet::from_file(path)?;
    let problem = RoutingProblem::from_locations(&locations);

    println!("========== Instance Analysis ==========\n");
    println!("{}", locations.statistics(&problem.distance_matrix));

    if !locations.is_empty() {
        let pca = PathCheapestArc::new();
        let tour = pca.construct(&problem);
        println!("Quick Solution Estimate:");
        println!("  {}: {} ({:.4}s)", pca.name(), tour.cost, tour.computation_time);
    }

    Ok(())
}

fn run_benchmark(
    input: &Path,
    runs: usize,
    time_limit: f64,
    best_known: Option<PathBuf>,
    output: &Path,
) -> Result<()> {
    println!("Loading instances from {:?}...", input);

    let instances = if input.is_dir() {
        load_instances_from_dir(input)?
    } else {
        vec![LocationSet::from_file(input)?]
    };

    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        return Err(TourError::InputNotFound {
            path: input.join("*.tsp"),
        });
    }

    std::fs::create_dir_all(output)?;

    let config = BenchmarkConfig {
        num_runs: runs,
        time_limit: Some(seconds(time_limit)),
        ..Default::default()
    };
    let mut benchmark = Benchmark::new(config);
    if let Some(path) = best_known {
        benchmark.load_best_known(path)?;
    }

    benchmark.run_on_instances(&instances)?;

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}
