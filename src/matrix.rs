//! Integer Euclidean distance matrix and the routing problem built on it.

use crate::error::{Result, TourError};
use crate::instance::{Location, LocationSet};

/// Number of vehicles the solver routes.
pub const NUM_VEHICLES: usize = 1;
/// Node index every tour starts and ends at.
pub const DEPOT: usize = 0;

/// Cost of travelling directly between two node indices.
pub trait ArcCost {
    fn arc_cost(&self, from: usize, to: usize) -> i64;

    /// Length of a closed tour given as node indices, with implicit return
    /// from the last node to the first.
    fn tour_length(&self, tour: &[usize]) -> i64 {
        if tour.len() < 2 {
            return 0;
        }
        let open: i64 = tour.windows(2).map(|w| self.arc_cost(w[0], w[1])).sum();
        open + self.arc_cost(tour[tour.len() - 1], tour[0])
    }
}

/// Floor of the Euclidean distance between two scaled locations.
pub fn euclid_distance(a: &Location, b: &Location) -> i64 {
    let dx = (b.x as i128) - (a.x as i128);
    let dy = (b.y as i128) - (a.y as i128);
    isqrt((dx * dx + dy * dy) as u128) as i64
}

/// Integer square root, truncated toward zero.
fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    // Float estimate, then correct the last couple of units exactly.
    let mut root = (value as f64).sqrt() as u128;
    while root.checked_mul(root).map_or(true, |sq| sq > value) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).map_or(false, |sq| sq <= value) {
        root += 1;
    }
    root
}

/// Square matrix of pairwise integer distances.
///
/// Storage is O(N²); sizes in the low thousands are the practical limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    rows: Vec<Vec<i64>>,
}

impl DistanceMatrix {
    /// Compute the matrix for a location set, in its index order.
    pub fn from_locations(locations: &LocationSet) -> Self {
        let points = locations.locations();
        let n = points.len();
        let mut rows = vec![vec![0i64; n]; n];

        for i in 0..n {
            for j in i + 1..n {
                let d = euclid_distance(&points[i], &points[j]);
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }

        log::debug!("Built {}x{} distance matrix", n, n);
        DistanceMatrix { rows }
    }

    /// Wrap explicit rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(DistanceMatrix { rows })
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> i64 {
        self.rows[i][j]
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.size();
        (0..n).all(|i| (i + 1..n).all(|j| self.rows[i][j] == self.rows[j][i]))
    }
}

impl ArcCost for DistanceMatrix {
    #[inline]
    fn arc_cost(&self, from: usize, to: usize) -> i64 {
        self.rows[from][to]
    }
}

/// Everything the solver needs: distances, vehicle count and depot.
#[derive(Debug, Clone)]
pub struct RoutingProblem {
    pub distance_matrix: DistanceMatrix,
    pub num_vehicles: usize,
    pub depot: usize,
}

impl RoutingProblem {
    /// Single-vehicle problem rooted at node 0.
    pub fn from_locations(locations: &LocationSet) -> Self {
        RoutingProblem {
            distance_matrix: DistanceMatrix::from_locations(locations),
            num_vehicles: NUM_VEHICLES,
            depot: DEPOT,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.distance_matrix.size()
    }

    /// Reject configurations the solver cannot route.
    pub fn validate(&self) -> Result<()> {
        if self.num_vehicles != NUM_VEHICLES {
            return Err(TourError::InvalidProblem {
                reason: format!(
                    "{} vehicles requested, only a single vehicle is supported",
                    self.num_vehicles
                ),
            });
        }
        if self.num_nodes() > 0 && self.depot >= self.num_nodes() {
            return Err(TourError::InvalidProblem {
                reason: format!(
                    "depot {} outside of {} nodes",
                    self.depot,
                    self.num_nodes()
                ),
            });
        }
        Ok(())
    }
}

impl ArcCost for RoutingProblem {
    #[inline]
    fn arc_cost(&self, from: usize, to: usize) -> i64 {
        self.distance_matrix.distance(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[(&str, i64, i64)]) -> LocationSet {
        let locations = points
            .iter()
            .map(|&(id, x, y)| Location::new(id, x * 10, y * 10))
            .collect();
        LocationSet::from_locations("test", locations).unwrap()
    }

    #[test]
    fn test_three_four_five() {
        let matrix = DistanceMatrix::from_locations(&set(&[("A", 0, 0), ("B", 3, 4)]));
        assert_eq!(matrix.distance(0, 1), 50);
        assert_eq!(matrix.distance(1, 0), 50);
    }

    #[test]
    fn test_symmetric_with_zero_diagonal() {
        let matrix = DistanceMatrix::from_locations(&set(&[
            ("A", 0, 0),
            ("B", 7, -3),
            ("C", -12, 5),
            ("D", 100, 42),
            ("E", 7, -3),
        ]));

        assert!(matrix.is_symmetric());
        for i in 0..matrix.size() {
            assert_eq!(matrix.distance(i, i), 0);
            for j in 0..matrix.size() {
                assert!(matrix.distance(i, j) >= 0);
            }
        }
        // identical coordinates under different ids
        assert_eq!(matrix.distance(1, 4), 0);
    }

    #[test]
    fn test_distance_truncates() {
        // sqrt(10^2 + 10^2) = 14.142...
        let a = Location::new("a", 0, 0);
        let b = Location::new("b", 10, 10);
        assert_eq!(euclid_distance(&a, &b), 14);
        assert_eq!(euclid_distance(&b, &a), 14);
    }

    #[test]
    fn test_collinear_points_within_one_unit() {
        let triples = [
            [(0, 0), (1, 1), (3, 3)],
            [(0, 0), (2, 5), (4, 10)],
            [(-7, 2), (0, 2), (9, 2)],
            [(1, 1), (4, 2), (13, 5)],
        ];
        for [a, b, c] in triples {
            let matrix = DistanceMatrix::from_locations(&set(&[
                ("A", a.0, a.1),
                ("B", b.0, b.1),
                ("C", c.0, c.1),
            ]));
            let via = matrix.distance(0, 1) + matrix.distance(1, 2);
            let direct = matrix.distance(0, 2);
            assert!((via - direct).abs() <= 1, "{via} vs {direct}");
        }
    }

    #[test]
    fn test_isqrt_exact_at_boundaries() {
        for v in [0u128, 1, 2, 3, 4, 15, 16, 17, 99, 100, 101] {
            let r = isqrt(v);
            assert!(r * r <= v && (r + 1) * (r + 1) > v, "isqrt({v}) = {r}");
        }
        let big = (u64::MAX as u128) * (u64::MAX as u128);
        assert_eq!(isqrt(big), u64::MAX as u128);
        assert_eq!(isqrt(big - 1), u64::MAX as u128 - 1);
    }

    #[test]
    fn test_tour_length_closes_the_loop() {
        let matrix = DistanceMatrix::from_locations(&set(&[("A", 0, 0), ("B", 3, 4)]));
        assert_eq!(matrix.tour_length(&[0, 1]), 100);
        assert_eq!(matrix.tour_length(&[0]), 0);
    }

    #[test]
    fn test_from_rows_requires_square() {
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![1]]).is_none());
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).is_some());
    }

    #[test]
    fn test_problem_defaults_and_validation() {
        let mut problem = RoutingProblem::from_locations(&set(&[("A", 0, 0), ("B", 3, 4)]));
        assert_eq!(problem.num_vehicles, 1);
        assert_eq!(problem.depot, 0);
        assert!(problem.validate().is_ok());

        problem.num_vehicles = 2;
        assert!(matches!(problem.validate(), Err(TourError::InvalidProblem { .. })));
    }
}
