//! Working tour representation used by construction and local search.
//!
//! A tour is a sequence of node indices that starts at the depot and
//! implicitly returns to it after the last node.

use crate::matrix::ArcCost;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    /// Node indices, depot first, return to depot implicit
    pub nodes: Vec<usize>,
    /// Total closed tour length
    pub cost: i64,
    /// Algorithm that generated this tour
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Tour {
    /// Create an empty tour
    pub fn new() -> Self {
        Tour {
            nodes: Vec::new(),
            cost: i64::MAX,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a tour from a node sequence, computing its cost.
    pub fn from_nodes<C: ArcCost + ?Sized>(costs: &C, nodes: Vec<usize>, algorithm: &str) -> Self {
        let cost = costs.tour_length(&nodes);
        Tour {
            nodes,
            cost,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Recompute the cached cost from scratch.
    pub fn validate<C: ArcCost + ?Sized>(&mut self, costs: &C) {
        self.cost = costs.tour_length(&self.nodes);
    }

    /// Every node of `0..num_nodes` appears exactly once, depot first.
    pub fn is_complete(&self, num_nodes: usize, depot: usize) -> bool {
        if self.nodes.len() != num_nodes || self.nodes.first() != Some(&depot) {
            return false;
        }
        let unique: HashSet<usize> = self.nodes.iter().copied().collect();
        unique.len() == num_nodes && self.nodes.iter().all(|&n| n < num_nodes)
    }

    /// Reverse the segment between positions i+1 and j (2-opt)
    pub fn apply_two_opt(&mut self, i: usize, j: usize) {
        self.nodes[i + 1..=j].reverse();
    }

    pub fn apply_swap(&mut self, i: usize, j: usize) {
        self.nodes.swap(i, j);
    }

    /// Move the segment `[start, start + len)` so that it follows the node
    /// currently at position `after`. `after` must lie outside the segment.
    pub fn apply_segment_move(&mut self, start: usize, len: usize, after: usize) {
        let segment: Vec<usize> = self.nodes.drain(start..start + len).collect();
        let insert_at = if after < start { after + 1 } else { after + 1 - len };
        for (k, node) in segment.into_iter().enumerate() {
            self.nodes.insert(insert_at + k, node);
        }
    }
}

impl Default for Tour {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tour ({})", self.algorithm)?;
        writeln!(f, "  Cost: {}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Nodes: {:?}", self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DistanceMatrix;

    fn line_matrix() -> DistanceMatrix {
        // points on a line at 0, 10, 20, 30
        let pos = [0i64, 10, 20, 30];
        let rows = pos
            .iter()
            .map(|a| pos.iter().map(|b| (a - b).abs()).collect())
            .collect();
        DistanceMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_tour_creation() {
        let tour = Tour::new();
        assert!(tour.nodes.is_empty());
        assert_eq!(tour.cost, i64::MAX);
    }

    #[test]
    fn test_from_nodes_and_completeness() {
        let matrix = line_matrix();
        let tour = Tour::from_nodes(&matrix, vec![0, 2, 1, 3], "test");

        assert_eq!(tour.cost, 20 + 10 + 20 + 30);
        assert!(tour.is_complete(4, 0));
        assert!(!Tour::from_nodes(&matrix, vec![0, 2, 2, 3], "dup").is_complete(4, 0));
        assert!(!Tour::from_nodes(&matrix, vec![1, 0, 2, 3], "depot").is_complete(4, 0));
    }

    #[test]
    fn test_segment_move_forward_and_backward() {
        let mut tour = Tour::from_nodes(&line_matrix(), vec![0, 1, 2, 3], "t");
        tour.apply_segment_move(1, 1, 3);
        assert_eq!(tour.nodes, vec![0, 2, 3, 1]);

        tour.apply_segment_move(2, 2, 0);
        assert_eq!(tour.nodes, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_two_opt_and_swap() {
        let mut tour = Tour::from_nodes(&line_matrix(), vec![0, 2, 1, 3], "t");
        tour.apply_two_opt(0, 2);
        assert_eq!(tour.nodes, vec![0, 1, 2, 3]);
        tour.apply_swap(1, 3);
        assert_eq!(tour.nodes, vec![0, 3, 2, 1]);
    }
}
