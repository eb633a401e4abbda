//! Translation between solver indices and node indices.

use crate::error::{Result, TourError};

/// Maps the solver's internal variable indices to node indices.
///
/// For the single vehicle, indices `0..N` coincide with node indices; the
/// vehicle's start index is the depot's node index. One extra index `N` is
/// the vehicle's end and maps back to the depot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexManager {
    num_nodes: usize,
    depot: usize,
}

impl IndexManager {
    pub fn new(num_nodes: usize, num_vehicles: usize, depot: usize) -> Result<Self> {
        if num_vehicles != 1 {
            return Err(TourError::InvalidProblem {
                reason: format!("index manager supports a single vehicle, got {num_vehicles}"),
            });
        }
        if num_nodes > 0 && depot >= num_nodes {
            return Err(TourError::InvalidProblem {
                reason: format!("depot {depot} outside of {num_nodes} nodes"),
            });
        }
        Ok(IndexManager { num_nodes, depot })
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Total number of solver indices, end index included.
    pub fn num_indices(&self) -> usize {
        self.num_nodes + 1
    }

    pub fn start(&self, _vehicle: usize) -> usize {
        self.depot
    }

    pub fn end(&self, _vehicle: usize) -> usize {
        self.num_nodes
    }

    pub fn is_start(&self, index: usize) -> bool {
        index == self.depot
    }

    pub fn is_end(&self, index: usize) -> bool {
        index == self.num_nodes
    }

    /// Node index behind a solver index, `None` past the end index.
    pub fn index_to_node(&self, index: usize) -> Option<usize> {
        match index {
            i if self.is_end(i) => Some(self.depot),
            i if i < self.num_nodes => Some(i),
            _ => None,
        }
    }

    /// Solver index of a node; the depot maps to the vehicle start.
    pub fn node_to_index(&self, node: usize) -> Option<usize> {
        (node < self.num_nodes).then_some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_end_index() {
        let manager = IndexManager::new(4, 1, 0).unwrap();

        assert_eq!(manager.start(0), 0);
        assert_eq!(manager.end(0), 4);
        assert_eq!(manager.num_indices(), 5);
        for node in 0..4 {
            let index = manager.node_to_index(node).unwrap();
            assert_eq!(manager.index_to_node(index), Some(node));
        }
        assert_eq!(manager.index_to_node(manager.end(0)), Some(0));
        assert!(manager.is_end(4));
        assert!(!manager.is_end(0));
        assert_eq!(manager.node_to_index(4), None);
    }

    #[test]
    fn test_non_zero_depot() {
        let manager = IndexManager::new(3, 1, 2).unwrap();
        assert!(manager.is_start(2));
        assert_eq!(manager.index_to_node(manager.end(0)), Some(2));
    }

    #[test]
    fn test_rejects_unsupported_configurations() {
        assert!(IndexManager::new(3, 2, 0).is_err());
        assert!(IndexManager::new(3, 1, 3).is_err());
        assert!(IndexManager::new(0, 1, 0).is_ok());
    }

    #[test]
    fn test_out_of_range_index_has_no_node() {
        let manager = IndexManager::new(2, 1, 0).unwrap();
        assert_eq!(manager.index_to_node(2), Some(0));
        assert_eq!(manager.index_to_node(3), None);
        assert_eq!(manager.index_to_node(usize::MAX), None);

        let empty = IndexManager::new(0, 1, 0).unwrap();
        assert_eq!(empty.index_to_node(0), Some(0));
        assert_eq!(empty.index_to_node(1), None);
    }
}
