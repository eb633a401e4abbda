//! Local search improvement heuristics.
//!
//! This module implements the improvement phase of the solver:
//! - 2-opt (segment reversal)
//! - Or-opt (relocation of segments of 1 to 3 nodes)
//! - Node exchange
//! - Variable Neighborhood Descent chaining the operators above
//! - Simulated Annealing, Tabu Search and Iterated Local Search
//!
//! All move deltas are evaluated in constant time and assume symmetric arc
//! costs. The depot stays at position 0 throughout.

use crate::matrix::{ArcCost, RoutingProblem};
use crate::solution::Tour;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve the tour, giving up once `deadline` has passed. The tour is
    /// always left complete and never worse than it came in.
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool;

    fn improve(&self, problem: &RoutingProblem, tour: &mut Tour) -> bool {
        self.improve_until(problem, tour, None)
    }

    fn name(&self) -> &str;
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.map_or(false, |d| Instant::now() >= d)
}

/// The sooner of an inherited deadline and a local time limit.
fn earliest(deadline: Option<Instant>, start: Instant, limit: Option<Duration>) -> Option<Instant> {
    match (deadline, limit.map(|l| start + l)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Cost change of reversing `nodes[i+1..=j]`.
fn two_opt_delta<C: ArcCost + ?Sized>(costs: &C, nodes: &[usize], i: usize, j: usize) -> i64 {
    let n = nodes.len();
    let (a, b) = (nodes[i], nodes[i + 1]);
    let (c, d) = (nodes[j], nodes[(j + 1) % n]);
    costs.arc_cost(a, c) + costs.arc_cost(b, d) - costs.arc_cost(a, b) - costs.arc_cost(c, d)
}

/// Cost change of exchanging the nodes at positions `i < j` (both > 0).
fn swap_delta<C: ArcCost + ?Sized>(costs: &C, nodes: &[usize], i: usize, j: usize) -> i64 {
    let n = nodes.len();
    let (x, y) = (nodes[i], nodes[j]);
    let prev_i = nodes[i - 1];
    let next_j = nodes[(j + 1) % n];

    if j == i + 1 {
        let old = costs.arc_cost(prev_i, x) + costs.arc_cost(x, y) + costs.arc_cost(y, next_j);
        let new = costs.arc_cost(prev_i, y) + costs.arc_cost(y, x) + costs.arc_cost(x, next_j);
        return new - old;
    }

    let next_i = nodes[i + 1];
    let prev_j = nodes[j - 1];
    let old = costs.arc_cost(prev_i, x)
        + costs.arc_cost(x, next_i)
        + costs.arc_cost(prev_j, y)
        + costs.arc_cost(y, next_j);
    let new = costs.arc_cost(prev_i, y)
        + costs.arc_cost(y, next_i)
        + costs.arc_cost(prev_j, x)
        + costs.arc_cost(x, next_j);
    new - old
}

/// Cost change of moving segment `[start, start + len)` behind position `after`.
fn segment_move_delta<C: ArcCost + ?Sized>(
    costs: &C,
    nodes: &[usize],
    start: usize,
    len: usize,
    after: usize,
) -> i64 {
    let n = nodes.len();
    let first = nodes[start];
    let last = nodes[start + len - 1];
    let prev = nodes[start - 1];
    let next = nodes[(start + len) % n];

    let removal_gain = costs.arc_cost(prev, first) + costs.arc_cost(last, next) - costs.arc_cost(prev, next);

    let a = nodes[after];
    let b = nodes[(after + 1) % n];
    let insertion = costs.arc_cost(a, first) + costs.arc_cost(last, b) - costs.arc_cost(a, b);

    insertion - removal_gain
}

/// 2-Opt Local Search
///
/// Reverses segments of the tour to reduce total distance.
pub struct TwoOptSearch {
    /// Use first improvement instead of best improvement
    pub first_improvement: bool,
    /// Maximum number of applied moves
    pub max_passes: usize,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch {
            first_improvement: false,
            max_passes: 10_000,
        }
    }

    pub fn first_improvement() -> Self {
        TwoOptSearch {
            first_improvement: true,
            max_passes: 10_000,
        }
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }

        let mut total_improved = false;
        for _ in 0..self.max_passes {
            if expired(deadline) {
                break;
            }
            let mut best: Option<(usize, usize, i64)> = None;

            'scan: for i in 0..n - 2 {
                if expired(deadline) {
                    break;
                }
                for j in i + 2..n {
                    if i == 0 && j == n - 1 {
                        continue; // reversing everything but the depot is a no-op
                    }
                    let delta = two_opt_delta(problem, &tour.nodes, i, j);
                    if delta < 0 && best.map_or(true, |b| delta < b.2) {
                        best = Some((i, j, delta));
                        if self.first_improvement {
                            break 'scan;
                        }
                    }
                }
            }

            match best {
                Some((i, j, delta)) => {
                    tour.apply_two_opt(i, j);
                    tour.cost += delta;
                    total_improved = true;
                }
                None => break,
            }
        }

        tour.validate(problem);
        total_improved
    }

    fn name(&self) -> &str {
        if self.first_improvement {
            "2-Opt-FI"
        } else {
            "2-Opt-BI"
        }
    }
}

/// Or-Opt Local Search
///
/// Relocates segments of up to `max_segment_length` consecutive nodes to
/// other positions. With a maximum length of 1 this is plain relocation.
pub struct OrOptSearch {
    /// Maximum segment length to consider
    pub max_segment_length: usize,
    /// Use first improvement
    pub first_improvement: bool,
    /// Maximum number of applied moves
    pub max_passes: usize,
}

impl OrOptSearch {
    pub fn new() -> Self {
        OrOptSearch {
            max_segment_length: 3,
            first_improvement: false,
            max_passes: 10_000,
        }
    }

    pub fn first_improvement() -> Self {
        OrOptSearch {
            first_improvement: true,
            ..Self::new()
        }
    }

    /// Single-node relocation
    pub fn relocate() -> Self {
        OrOptSearch {
            max_segment_length: 1,
            first_improvement: true,
            max_passes: 10_000,
        }
    }
}

impl Default for OrOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for OrOptSearch {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }

        let mut total_improved = false;
        for _ in 0..self.max_passes {
            if expired(deadline) {
                break;
            }
            let mut best: Option<(usize, usize, usize, i64)> = None;

            'scan: for len in 1..=self.max_segment_length.min(n - 2) {
                for start in 1..=n - len {
                    if expired(deadline) {
                        break 'scan;
                    }
                    for after in 0..n {
                        if after + 1 >= start && after < start + len {
                            continue; // inside the segment or directly before it
                        }
                        let delta = segment_move_delta(problem, &tour.nodes, start, len, after);
                        if delta < 0 && best.map_or(true, |b| delta < b.3) {
                            best = Some((start, len, after, delta));
                            if self.first_improvement {
                                break 'scan;
                            }
                        }
                    }
                }
            }

            match best {
                Some((start, len, after, delta)) => {
                    tour.apply_segment_move(start, len, after);
                    tour.cost += delta;
                    total_improved = true;
                }
                None => break,
            }
        }

        tour.validate(problem);
        total_improved
    }

    fn name(&self) -> &str {
        if self.max_segment_length == 1 {
            "Relocate"
        } else {
            "Or-Opt"
        }
    }
}

/// Node Exchange Local Search
///
/// Swaps pairs of nodes to improve tour quality.
pub struct SwapSearch {
    /// Use first improvement
    pub first_improvement: bool,
    /// Maximum number of applied moves
    pub max_passes: usize,
}

impl SwapSearch {
    pub fn new() -> Self {
        SwapSearch {
            first_improvement: false,
            max_passes: 10_000,
        }
    }

    pub fn first_improvement() -> Self {
        SwapSearch {
            first_improvement: true,
            max_passes: 10_000,
        }
    }
}

impl Default for SwapSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for SwapSearch {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }

        let mut total_improved = false;
        for _ in 0..self.max_passes {
            if expired(deadline) {
                break;
            }
            let mut best: Option<(usize, usize, i64)> = None;

            'scan: for i in 1..n - 1 {
                if expired(deadline) {
                    break;
                }
                for j in i + 1..n {
                    let delta = swap_delta(problem, &tour.nodes, i, j);
                    if delta < 0 && best.map_or(true, |b| delta < b.2) {
                        best = Some((i, j, delta));
                        if self.first_improvement {
                            break 'scan;
                        }
                    }
                }
            }

            match best {
                Some((i, j, delta)) => {
                    tour.apply_swap(i, j);
                    tour.cost += delta;
                    total_improved = true;
                }
                None => break,
            }
        }

        tour.validate(problem);
        total_improved
    }

    fn name(&self) -> &str {
        "Exchange"
    }
}

/// Variable Neighborhood Descent (VND)
///
/// Applies the operators in order, restarting from the first one after any
/// improvement, until none of them improves the tour.
pub struct VND {
    operators: Vec<Box<dyn LocalSearch + Send + Sync>>,
    /// Wall-clock limit for the whole descent
    pub time_limit: Option<Duration>,
}

impl VND {
    pub fn new() -> Self {
        VND {
            operators: Vec::new(),
            time_limit: None,
        }
    }

    pub fn with_standard_operators() -> Self {
        let mut vnd = VND::new();
        vnd.add_operator(TwoOptSearch::first_improvement());
        vnd.add_operator(OrOptSearch::relocate());
        vnd.add_operator(SwapSearch::first_improvement());
        vnd.add_operator(OrOptSearch::first_improvement());
        vnd
    }

    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn add_operator<L: LocalSearch + Send + Sync + 'static>(&mut self, op: L) {
        self.operators.push(Box::new(op));
    }
}

impl Default for VND {
    fn default() -> Self {
        Self::with_standard_operators()
    }
}

impl LocalSearch for VND {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let deadline = earliest(deadline, Instant::now(), self.time_limit);
        let mut total_improved = false;
        let mut k = 0;
        let mut steps = 0;

        while k < self.operators.len() {
            if expired(deadline) {
                log::info!("VND stopped by time limit after {} steps", steps);
                break;
            }
            if self.operators[k].improve_until(problem, tour, deadline) {
                log::debug!("{} improved tour to {}", self.operators[k].name(), tour.cost);
                total_improved = true;
                k = 0;
            } else {
                k += 1;
            }
            steps += 1;
        }

        tour.iterations = Some(steps);
        total_improved
    }

    fn name(&self) -> &str {
        "VND"
    }
}

/// Simulated Annealing
///
/// Metaheuristic that accepts worse tours with decreasing probability.
pub struct SimulatedAnnealing {
    /// Initial temperature
    pub initial_temp: f64,
    /// Final temperature
    pub final_temp: f64,
    /// Cooling rate
    pub cooling_rate: f64,
    /// Iterations per temperature
    pub iterations_per_temp: usize,
    /// Random seed
    pub seed: u64,
    /// Wall-clock limit
    pub time_limit: Option<Duration>,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        SimulatedAnnealing {
            initial_temp: 1000.0,
            final_temp: 0.1,
            cooling_rate: 0.995,
            iterations_per_temp: 100,
            seed: 42,
            time_limit: None,
        }
    }

    pub fn with_params(initial_temp: f64, final_temp: f64, cooling_rate: f64, iterations_per_temp: usize) -> Self {
        SimulatedAnnealing {
            initial_temp,
            final_temp,
            cooling_rate,
            iterations_per_temp,
            ..Self::new()
        }
    }

    /// Draw a random move and apply it when accepted. Returns the delta of
    /// the applied move, if any.
    fn try_random_move(&self, problem: &RoutingProblem, tour: &mut Tour, temp: f64, rng: &mut ChaCha8Rng) -> Option<i64> {
        let n = tour.nodes.len();
        let accept = |delta: i64, rng: &mut ChaCha8Rng| {
            delta < 0 || rng.gen::<f64>() < (-(delta as f64) / temp).exp()
        };

        match rng.gen_range(0..3) {
            0 => {
                let i = rng.gen_range(0..n - 2);
                let j = rng.gen_range(i + 2..n);
                if i == 0 && j == n - 1 {
                    return None;
                }
                let delta = two_opt_delta(problem, &tour.nodes, i, j);
                if accept(delta, rng) {
                    tour.apply_two_opt(i, j);
                    return Some(delta);
                }
            }
            1 => {
                let i = rng.gen_range(1..n - 1);
                let j = rng.gen_range(i + 1..n);
                let delta = swap_delta(problem, &tour.nodes, i, j);
                if accept(delta, rng) {
                    tour.apply_swap(i, j);
                    return Some(delta);
                }
            }
            _ => {
                let len = rng.gen_range(1..=3usize.min(n - 2));
                let start = rng.gen_range(1..=n - len);
                let after = rng.gen_range(0..n);
                if after + 1 >= start && after < start + len {
                    return None;
                }
                let delta = segment_move_delta(problem, &tour.nodes, start, len, after);
                if accept(delta, rng) {
                    tour.apply_segment_move(start, len, after);
                    return Some(delta);
                }
            }
        }
        None
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for SimulatedAnnealing {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }
        let deadline = earliest(deadline, Instant::now(), self.time_limit);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let initial_cost = tour.cost;
        let mut current = tour.clone();
        let mut best_nodes = current.nodes.clone();
        let mut best_cost = current.cost;

        let mut temp = self.initial_temp;
        let mut iterations = 0;

        'cooling: while temp > self.final_temp {
            for _ in 0..self.iterations_per_temp {
                if expired(deadline) {
                    log::info!("Simulated annealing stopped by time limit at T={:.3}", temp);
                    break 'cooling;
                }
                if let Some(delta) = self.try_random_move(problem, &mut current, temp, &mut rng) {
                    current.cost += delta;
                    if current.cost < best_cost {
                        best_cost = current.cost;
                        best_nodes.clone_from(&current.nodes);
                    }
                }
                iterations += 1;
            }
            temp *= self.cooling_rate;
        }

        tour.nodes = best_nodes;
        tour.iterations = Some(iterations);
        tour.validate(problem);

        tour.cost < initial_cost
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}

/// Tabu Search
///
/// Best-admissible-move search over exchange and 2-opt moves, with node
/// pairs kept tabu for `tenure` iterations and an aspiration criterion.
pub struct TabuSearch {
    /// Tabu tenure (how long a move stays tabu)
    pub tenure: usize,
    /// Maximum iterations
    pub max_iterations: usize,
    /// Maximum iterations without improvement
    pub max_no_improve: usize,
    /// Wall-clock limit
    pub time_limit: Option<Duration>,
}

#[derive(Clone, Copy)]
enum TabuMove {
    Swap,
    TwoOpt,
}

impl TabuSearch {
    pub fn new() -> Self {
        TabuSearch {
            tenure: 10,
            max_iterations: 1000,
            max_no_improve: 100,
            time_limit: None,
        }
    }

    pub fn with_params(tenure: usize, max_iterations: usize, max_no_improve: usize) -> Self {
        TabuSearch {
            tenure,
            max_iterations,
            max_no_improve,
            time_limit: None,
        }
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TabuSearch {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }
        let deadline = earliest(deadline, Instant::now(), self.time_limit);

        // (node1, node2) -> iteration the pair stops being tabu
        let mut tabu_list: HashMap<(usize, usize), usize> = HashMap::new();

        let initial_cost = tour.cost;
        let mut current = tour.nodes.clone();
        let mut current_cost = tour.cost;
        let mut best_nodes = current.clone();
        let mut best_cost = current_cost;

        let mut iteration = 0;
        let mut no_improve = 0;

        'search: while iteration < self.max_iterations && no_improve < self.max_no_improve {
            let mut best_move: Option<(TabuMove, usize, usize, i64)> = None;

            for i in 1..n - 1 {
                if expired(deadline) {
                    log::info!("Tabu search stopped by time limit at iteration {}", iteration);
                    break 'search;
                }
                for j in i + 1..n {
                    let key = (current[i].min(current[j]), current[i].max(current[j]));
                    let is_tabu = tabu_list.get(&key).map_or(false, |&exp| exp > iteration);

                    let swap = Some((TabuMove::Swap, swap_delta(problem, &current, i, j)));
                    let two_opt = (j > i + 1).then(|| (TabuMove::TwoOpt, two_opt_delta(problem, &current, i, j)));

                    for (kind, delta) in swap.into_iter().chain(two_opt) {
                        // Aspiration: a tabu move is allowed when it beats the best tour
                        let admissible = !is_tabu || current_cost + delta < best_cost;
                        if admissible && best_move.map_or(true, |b| delta < b.3) {
                            best_move = Some((kind, i, j, delta));
                        }
                    }
                }
            }

            match best_move {
                Some((kind, i, j, delta)) => {
                    let key = (current[i].min(current[j]), current[i].max(current[j]));
                    match kind {
                        TabuMove::Swap => current.swap(i, j),
                        TabuMove::TwoOpt => current[i + 1..=j].reverse(),
                    }
                    tabu_list.insert(key, iteration + self.tenure);
                    current_cost += delta;

                    if current_cost < best_cost {
                        best_nodes.clone_from(&current);
                        best_cost = current_cost;
                        no_improve = 0;
                    } else {
                        no_improve += 1;
                    }
                }
                None => no_improve += 1,
            }

            iteration += 1;
        }

        tour.nodes = best_nodes;
        tour.iterations = Some(iteration);
        tour.validate(problem);

        tour.cost < initial_cost
    }

    fn name(&self) -> &str {
        "TabuSearch"
    }
}

/// Iterated Local Search
///
/// Applies VND, then perturbation, then VND again, keeping the perturbed
/// tour whenever it beats the current one.
pub struct IteratedLocalSearch {
    /// Number of perturbation moves
    pub perturbation_strength: usize,
    /// Maximum iterations
    pub max_iterations: usize,
    /// Maximum iterations without improvement
    pub max_no_improve: usize,
    /// Random seed
    pub seed: u64,
    /// Wall-clock limit
    pub time_limit: Option<Duration>,
}

impl IteratedLocalSearch {
    pub fn new() -> Self {
        IteratedLocalSearch {
            perturbation_strength: 3,
            max_iterations: 100,
            max_no_improve: 20,
            seed: 42,
            time_limit: None,
        }
    }

    pub fn with_params(perturbation_strength: usize, max_iterations: usize, max_no_improve: usize) -> Self {
        IteratedLocalSearch {
            perturbation_strength,
            max_iterations,
            max_no_improve,
            ..Self::new()
        }
    }

    /// Perturb a node sequence with random 2-opt and exchange moves
    fn perturb(&self, nodes: &mut [usize], rng: &mut ChaCha8Rng) {
        let n = nodes.len();
        for _ in 0..self.perturbation_strength {
            if rng.gen_bool(0.5) {
                let i = rng.gen_range(0..n - 2);
                let j = rng.gen_range(i + 2..n);
                nodes[i + 1..=j].reverse();
            } else {
                let i = rng.gen_range(1..n);
                let j = rng.gen_range(1..n);
                nodes.swap(i, j);
            }
        }
    }
}

impl Default for IteratedLocalSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for IteratedLocalSearch {
    fn improve_until(&self, problem: &RoutingProblem, tour: &mut Tour, deadline: Option<Instant>) -> bool {
        let n = tour.nodes.len();
        if n < 4 {
            return false;
        }
        let deadline = earliest(deadline, Instant::now(), self.time_limit);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let initial_cost = tour.cost;

        let descent = VND::with_standard_operators();
        descent.improve_until(problem, tour, deadline);

        let mut current = tour.clone();
        let mut best = tour.clone();

        let mut no_improve = 0;
        let mut iteration = 0;

        while iteration < self.max_iterations && no_improve < self.max_no_improve {
            if expired(deadline) {
                log::info!("ILS stopped by time limit at iteration {}", iteration);
                break;
            }

            let mut candidate = current.clone();
            self.perturb(&mut candidate.nodes, &mut rng);
            candidate.validate(problem);
            descent.improve_until(problem, &mut candidate, deadline);

            if candidate.cost < current.cost {
                current = candidate;
                if current.cost < best.cost {
                    best = current.clone();
                    no_improve = 0;
                } else {
                    no_improve += 1;
                }
            } else {
                no_improve += 1;
            }

            iteration += 1;
        }

        tour.nodes = best.nodes;
        tour.iterations = Some(iteration);
        tour.validate(problem);

        tour.cost < initial_cost
    }

    fn name(&self) -> &str {
        "ILS"
    }
}
