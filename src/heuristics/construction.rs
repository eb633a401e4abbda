use crate::matrix::{ArcCost, RoutingProblem};
use crate::solution::Tour;
use ordered_float::OrderedFloat;

/// Builds a first complete tour from scratch.
pub trait ConstructionHeuristic {
    fn construct(&self, problem: &RoutingProblem) -> Tour;
    fn name(&self) -> &str;
}

fn finish(problem: &RoutingProblem, nodes: Vec<usize>, name: &str, start: std::time::Instant) -> Tour {
    let mut tour = Tour::from_nodes(problem, nodes, name);
    tour.computation_time = start.elapsed().as_secs_f64();
    log::debug!("{} built a tour of cost {}", name, tour.cost);
    tour
}

/// Path Cheapest Arc
///
/// Starting from the depot, repeatedly extends the route with the unvisited
/// node reached by the cheapest arc from the last node added. Ties go to the
/// lowest node index.
pub struct PathCheapestArc;

impl PathCheapestArc {
    pub fn new() -> Self {
        PathCheapestArc
    }

    fn cheapest_next(&self, problem: &RoutingProblem, current: usize, visited: &[bool]) -> Option<usize> {
        (0..problem.num_nodes())
            .filter(|&n| !visited[n])
            .min_by_key(|&n| (problem.arc_cost(current, n), n))
    }
}

impl Default for PathCheapestArc {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for PathCheapestArc {
    fn construct(&self, problem: &RoutingProblem) -> Tour {
        let start = std::time::Instant::now();
        let n = problem.num_nodes();
        if n == 0 {
            return finish(problem, Vec::new(), self.name(), start);
        }

        let mut visited = vec![false; n];
        let mut nodes = Vec::with_capacity(n);
        let mut current = problem.depot;
        visited[current] = true;
        nodes.push(current);

        while let Some(next) = self.cheapest_next(problem, current, &visited) {
            visited[next] = true;
            nodes.push(next);
            current = next;
        }

        finish(problem, nodes, self.name(), start)
    }

    fn name(&self) -> &str {
        "PathCheapestArc"
    }
}

/// Greedy Insertion Heuristic
///
/// Starts from the depot and one seed node and repeatedly inserts a node at
/// the position causing the minimum increase in tour length. The cheapest
/// variant picks the node with the smallest insertion cost, the farthest
/// variant picks the node farthest from the current tour.
pub struct InsertionHeuristic {
    pub farthest_insertion: bool,
}

impl InsertionHeuristic {
    pub fn cheapest() -> Self {
        InsertionHeuristic {
            farthest_insertion: false,
        }
    }

    pub fn farthest() -> Self {
        InsertionHeuristic {
            farthest_insertion: true,
        }
    }

    /// Cost of inserting node after position pos
    fn insertion_cost(&self, problem: &RoutingProblem, tour: &[usize], node: usize, pos: usize) -> i64 {
        let prev = tour[pos];
        let next = tour[(pos + 1) % tour.len()];
        problem.arc_cost(prev, node) + problem.arc_cost(node, next) - problem.arc_cost(prev, next)
    }

    /// Best position (insert after) for a node
    fn find_best_insertion(&self, problem: &RoutingProblem, tour: &[usize], node: usize) -> (usize, i64) {
        (0..tour.len())
            .map(|pos| (pos, self.insertion_cost(problem, tour, node, pos)))
            .min_by_key(|&(pos, cost)| (cost, pos))
            .unwrap_or((0, 0))
    }
}

impl Default for InsertionHeuristic {
    fn default() -> Self {
        Self::cheapest()
    }
}

impl ConstructionHeuristic for InsertionHeuristic {
    fn construct(&self, problem: &RoutingProblem) -> Tour {
        let start = std::time::Instant::now();
        let n = problem.num_nodes();
        if n == 0 {
            return finish(problem, Vec::new(), self.name(), start);
        }

        let depot = problem.depot;
        let mut tour = vec![depot];
        let mut unvisited: Vec<usize> = (0..n).filter(|&v| v != depot).collect();

        let seed = if self.farthest_insertion {
            unvisited
                .iter()
                .copied()
                .max_by_key(|&v| (problem.arc_cost(depot, v), std::cmp::Reverse(v)))
        } else {
            unvisited
                .iter()
                .copied()
                .min_by_key(|&v| (problem.arc_cost(depot, v), v))
        };

        if let Some(seed) = seed {
            tour.push(seed);
            unvisited.retain(|&v| v != seed);
        }

        // Distance from each unvisited node to the nearest tour node.
        let mut nearest: Vec<i64> = unvisited
            .iter()
            .map(|&v| tour.iter().map(|&t| problem.arc_cost(t, v)).min().unwrap_or(0))
            .collect();

        while !unvisited.is_empty() {
            let (slot, pos) = if self.farthest_insertion {
                let slot = (0..unvisited.len())
                    .max_by_key(|&k| (nearest[k], std::cmp::Reverse(unvisited[k])))
                    .unwrap_or(0);
                let (pos, _) = self.find_best_insertion(problem, &tour, unvisited[slot]);
                (slot, pos)
            } else {
                let mut best = (0usize, 0usize, i64::MAX);
                for (k, &v) in unvisited.iter().enumerate() {
                    let (pos, cost) = self.find_best_insertion(problem, &tour, v);
                    if cost < best.2 {
                        best = (k, pos, cost);
                    }
                }
                (best.0, best.1)
            };

            let node = unvisited.swap_remove(slot);
            nearest.swap_remove(slot);
            tour.insert(pos + 1, node);

            for (k, &v) in unvisited.iter().enumerate() {
                nearest[k] = nearest[k].min(problem.arc_cost(node, v));
            }
        }

        finish(problem, tour, self.name(), start)
    }

    fn name(&self) -> &str {
        if self.farthest_insertion {
            "FarthestInsertion"
        } else {
            "CheapestInsertion"
        }
    }
}

/// Clarke-Wright Savings Algorithm
///
/// Starts from one depot round trip per node and merges route ends in
/// decreasing order of savings `d(i,0) + d(0,j) - lambda * d(i,j)` until a
/// single route remains.
pub struct SavingsHeuristic {
    /// Shape parameter for savings calculation
    pub lambda: f64,
}

impl SavingsHeuristic {
    pub fn new() -> Self {
        SavingsHeuristic { lambda: 1.0 }
    }

    fn savings(&self, problem: &RoutingProblem, i: usize, j: usize) -> f64 {
        let depot = problem.depot;
        (problem.arc_cost(i, depot) + problem.arc_cost(depot, j)) as f64
            - self.lambda * problem.arc_cost(i, j) as f64
    }
}

impl Default for SavingsHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for SavingsHeuristic {
    fn construct(&self, problem: &RoutingProblem) -> Tour {
        let start = std::time::Instant::now();
        let n = problem.num_nodes();
        if n == 0 {
            return finish(problem, Vec::new(), self.name(), start);
        }
        let depot = problem.depot;
        let customers: Vec<usize> = (0..n).filter(|&v| v != depot).collect();

        let mut savings: Vec<(usize, usize, f64)> = Vec::new();
        for (a, &i) in customers.iter().enumerate() {
            for &j in &customers[a + 1..] {
                savings.push((i, j, self.savings(problem, i, j)));
            }
        }
        savings.sort_by(|a, b| OrderedFloat(b.2).cmp(&OrderedFloat(a.2)));

        let mut routes: Vec<Vec<usize>> = customers.iter().map(|&c| vec![c]).collect();
        let mut route_of = vec![usize::MAX; n];
        for (r, &c) in customers.iter().enumerate() {
            route_of[c] = r;
        }
        let mut remaining = routes.len();

        for &(i, j, _) in &savings {
            if remaining <= 1 {
                break;
            }
            let (ri, rj) = (route_of[i], route_of[j]);
            if ri == rj {
                continue;
            }
            let is_end = |r: &Vec<usize>, v: usize| r.first() == Some(&v) || r.last() == Some(&v);
            if !is_end(&routes[ri], i) || !is_end(&routes[rj], j) {
                continue;
            }

            // Orient so that ri ends with i and rj starts with j, then join.
            let mut tail = std::mem::take(&mut routes[rj]);
            if routes[ri].last() != Some(&i) {
                routes[ri].reverse();
            }
            if tail.first() != Some(&j) {
                tail.reverse();
            }
            for &v in &tail {
                route_of[v] = ri;
            }
            routes[ri].extend(tail);
            remaining -= 1;
        }

        let mut nodes = vec![depot];
        for route in routes.into_iter().filter(|r| !r.is_empty()) {
            nodes.extend(route);
        }

        finish(problem, nodes, self.name(), start)
    }

    fn name(&self) -> &str {
        "Savings-ClarkeWright"
    }
}
