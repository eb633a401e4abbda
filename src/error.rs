//! Error types for loading, solving and reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the tour solver can surface to its caller.
///
/// Each variant renders as a single line so the command line front-end
/// can print it verbatim.
#[derive(Error, Debug)]
pub enum TourError {
    /// The input file does not exist.
    #[error("input file not found: {}", .path.display())]
    InputNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// A record in the input file could not be parsed.
    #[error("malformed record on line {line} ({content:?}): {reason}")]
    InputFormat {
        /// 1-based line number of the offending record
        line: usize,
        /// Raw line content
        content: String,
        /// What was wrong with it
        reason: String,
    },

    /// Any other I/O failure while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The routing problem cannot be handled by the solver.
    #[error("invalid routing problem: {reason}")]
    InvalidProblem {
        /// Description of the unsupported configuration
        reason: String,
    },

    /// The solver returned no feasible tour.
    #[error("no solution found: {reason}")]
    NoSolution {
        /// Why no tour was produced
        reason: String,
    },

    /// The reference price entered at the prompt is not an integer.
    #[error("reference price must be an integer, got {input:?}")]
    InvalidReferencePrice {
        /// Text that was entered
        input: String,
    },

    /// Writing a CSV export failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Writing a JSON report failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TourError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_line() {
        let err = TourError::InputFormat {
            line: 3,
            content: "P3 7".to_string(),
            reason: "expected 3 fields, found 2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("P3 7"));
        assert!(!msg.contains('\n'));
    }

    #[test]
    fn test_not_found_mentions_path() {
        let err = TourError::InputNotFound {
            path: PathBuf::from("missing.tsp"),
        };
        assert_eq!(err.to_string(), "input file not found: missing.tsp");
    }

    #[test]
    fn test_io_error_converts_and_keeps_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TourError = io.into();
        assert!(matches!(err, TourError::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_error_converts() {
        let json: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: TourError = json.unwrap_err().into();
        assert!(matches!(err, TourError::Json(_)));
        assert!(err.to_string().starts_with("JSON export failed"));
    }
}
