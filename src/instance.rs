//! Loading named 2-D locations from plain-text point files.
//!
//! The primary format is one record per line, `<identifier> <x> <y>`, with
//! integer coordinates. Files carrying a TSPLIB header (`NAME:`,
//! `DIMENSION:`, `NODE_COORD_SECTION`, `EOF`) are accepted too; their
//! coordinate section follows the same record rules.
//!
//! Coordinates are multiplied by [`COORDINATE_SCALE`] when stored so that the
//! integer distance computation keeps one decimal digit of precision.

use crate::error::{Result, TourError};
use crate::matrix::DistanceMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// Fixed-point factor applied to every coordinate read from a file.
pub const COORDINATE_SCALE: i64 = 10;

/// Header keys recognised before the coordinate section of a TSPLIB file.
const HEADER_KEYS: [&str; 6] = [
    "NAME",
    "COMMENT",
    "TYPE",
    "DIMENSION",
    "EDGE_WEIGHT_TYPE",
    "DISPLAY_DATA_TYPE",
];

/// A named point with scaled integer coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Identifier as written in the input file
    pub id: String,
    /// X coordinate, already multiplied by [`COORDINATE_SCALE`]
    pub x: i64,
    /// Y coordinate, already multiplied by [`COORDINATE_SCALE`]
    pub y: i64,
}

impl Location {
    pub fn new(id: impl Into<String>, x: i64, y: i64) -> Self {
        Location { id: id.into(), x, y }
    }

    /// Coordinates as they appeared in the source file.
    pub fn unscaled(&self) -> (f64, f64) {
        (
            self.x as f64 / COORDINATE_SCALE as f64,
            self.y as f64 / COORDINATE_SCALE as f64,
        )
    }
}

/// Ordered set of uniquely named locations.
///
/// The position of a location in the set is its node index; index 0 is the
/// depot.
#[derive(Debug, Clone, Default)]
pub struct LocationSet {
    /// Instance name (TSPLIB `NAME:` or the file stem)
    pub name: String,
    /// Free-form comment from the TSPLIB header, if any
    pub comment: String,
    locations: Vec<Location>,
    index: HashMap<String, usize>,
}

impl LocationSet {
    /// Create an empty set with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        LocationSet {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Load a location set from a file.
    ///
    /// A missing file yields [`TourError::InputNotFound`]; a malformed record
    /// yields [`TourError::InputFormat`] naming the line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TourError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => TourError::Io(e),
        })?;

        let mut set = Self::from_reader(BufReader::new(file))?;
        if set.name.is_empty() {
            set.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        log::info!(
            "Loaded {} locations from {}",
            set.len(),
            path.display()
        );
        Ok(set)
    }

    /// Parse a location set from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = LocationSet::default();
        let mut declared_dimension: Option<usize> = None;
        let mut seen_header = false;
        let mut in_coords = false;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "EOF" {
                break;
            }

            if !in_coords && set.is_empty() {
                if trimmed == "NODE_COORD_SECTION" {
                    in_coords = true;
                    continue;
                }
                if let Some((key, value)) = header_field(trimmed) {
                    seen_header = true;
                    match key {
                        "NAME" => set.name = value.to_string(),
                        "COMMENT" => set.comment = value.to_string(),
                        "DIMENSION" => {
                            let dim = value.parse().map_err(|_| TourError::InputFormat {
                                line: line_no,
                                content: line.clone(),
                                reason: format!("DIMENSION {value:?} is not a count"),
                            })?;
                            declared_dimension = Some(dim);
                        }
                        _ => {}
                    }
                    continue;
                }
                if seen_header {
                    return Err(TourError::InputFormat {
                        line: line_no,
                        content: line.clone(),
                        reason: "record before NODE_COORD_SECTION".to_string(),
                    });
                }
            }

            // Trailing TSPLIB sections (display data, demands, ...) carry no coordinates.
            if in_coords && trimmed.ends_with("_SECTION") {
                break;
            }

            let location = parse_record(line_no, &line)?;
            set.push(location).map_err(|reason| TourError::InputFormat {
                line: line_no,
                content: line.clone(),
                reason,
            })?;
        }

        if let Some(dim) = declared_dimension {
            if dim != set.len() {
                log::warn!(
                    "Header declares DIMENSION {} but {} records were read",
                    dim,
                    set.len()
                );
            }
        }

        Ok(set)
    }

    /// Build a set from already scaled locations, rejecting duplicate ids.
    pub fn from_locations(name: impl Into<String>, locations: Vec<Location>) -> Result<Self> {
        let mut set = LocationSet::new(name);
        for (i, location) in locations.into_iter().enumerate() {
            let content = format!("{} {} {}", location.id, location.x, location.y);
            set.push(location).map_err(|reason| TourError::InputFormat {
                line: i + 1,
                content,
                reason,
            })?;
        }
        Ok(set)
    }

    fn push(&mut self, location: Location) -> std::result::Result<(), String> {
        if self.index.contains_key(&location.id) {
            return Err(format!("duplicate identifier {:?}", location.id));
        }
        self.index.insert(location.id.clone(), self.locations.len());
        self.locations.push(location);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Location at a node index.
    pub fn get(&self, node: usize) -> Option<&Location> {
        self.locations.get(node)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Node index of an identifier.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Summary statistics over the set and its distance matrix.
    pub fn statistics(&self, matrix: &DistanceMatrix) -> InstanceStatistics {
        let xs = self.locations.iter().map(|l| l.x);
        let ys = self.locations.iter().map(|l| l.y);
        let bounds = if self.is_empty() {
            (0, 0, 0, 0)
        } else {
            (
                xs.clone().min().unwrap_or(0),
                xs.max().unwrap_or(0),
                ys.clone().min().unwrap_or(0),
                ys.max().unwrap_or(0),
            )
        };

        let n = matrix.size();
        let mut count = 0u64;
        let mut total = 0i64;
        let mut min_distance = i64::MAX;
        let mut max_distance = 0i64;
        for i in 0..n {
            for j in i + 1..n {
                let d = matrix.distance(i, j);
                total += d;
                count += 1;
                min_distance = min_distance.min(d);
                max_distance = max_distance.max(d);
            }
        }

        InstanceStatistics {
            name: self.name.clone(),
            num_locations: self.len(),
            min_x: bounds.0,
            max_x: bounds.1,
            min_y: bounds.2,
            max_y: bounds.3,
            avg_distance: if count > 0 { total as f64 / count as f64 } else { 0.0 },
            min_distance: if count > 0 { min_distance } else { 0 },
            max_distance,
        }
    }
}

fn header_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    HEADER_KEYS
        .iter()
        .find(|&&k| k == key)
        .map(|&k| (k, value.trim()))
}

fn parse_record(line_no: usize, line: &str) -> Result<Location> {
    let format_error = |reason: String| TourError::InputFormat {
        line: line_no,
        content: line.trim_end().to_string(),
        reason,
    };

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(format_error(format!(
            "expected 3 fields `<id> <x> <y>`, found {}",
            parts.len()
        )));
    }

    let mut coords = [0i64; 2];
    for (slot, (axis, raw)) in coords.iter_mut().zip([("x", parts[1]), ("y", parts[2])]) {
        let value: i64 = raw
            .parse()
            .map_err(|_| format_error(format!("{axis} coordinate {raw:?} is not an integer")))?;
        *slot = value
            .checked_mul(COORDINATE_SCALE)
            .ok_or_else(|| format_error(format!("{axis} coordinate {raw} overflows when scaled")))?;
    }

    Ok(Location::new(parts[0], coords[0], coords[1]))
}

/// Statistics about a loaded location set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_locations: usize,
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
    pub avg_distance: f64,
    pub min_distance: i64,
    pub max_distance: i64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scale = COORDINATE_SCALE as f64;
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Locations: {} (depot = index 0)", self.num_locations)?;
        writeln!(
            f,
            "  X range: {} .. {} (scaled {} .. {})",
            self.min_x as f64 / scale,
            self.max_x as f64 / scale,
            self.min_x,
            self.max_x
        )?;
        writeln!(
            f,
            "  Y range: {} .. {} (scaled {} .. {})",
            self.min_y as f64 / scale,
            self.max_y as f64 / scale,
            self.min_y,
            self.max_y
        )?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {}", self.min_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<LocationSet> {
        LocationSet::from_reader(Cursor::new(text))
    }

    #[test]
    fn test_first_record_is_depot_and_order_is_kept() {
        let set = parse("P1 0 0\nP2 3 4\nA 10 2\nB 1 1\n").unwrap();

        assert_eq!(set.len(), 4);
        let ids: Vec<&str> = set.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2", "A", "B"]);
        assert_eq!(set.index_of("P1"), Some(0));
        assert_eq!(set.index_of("B"), Some(3));
    }

    #[test]
    fn test_coordinates_are_scaled_by_ten() {
        let set = parse("P1 0 0\nP2 3 4\n").unwrap();
        assert_eq!(set.get(1), Some(&Location::new("P2", 30, 40)));
        assert_eq!(set.get(1).unwrap().unscaled(), (3.0, 4.0));
    }

    #[test]
    fn test_two_field_line_is_format_error() {
        let err = parse("P1 0 0\nP2 3\n").unwrap_err();
        match err {
            TourError::InputFormat { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "P2 3");
            }
            other => panic!("expected InputFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_coordinate_is_format_error() {
        let err = parse("P1 0 0\nP2 3 four\n").unwrap_err();
        assert!(matches!(err, TourError::InputFormat { line: 2, .. }));
        assert!(err.to_string().contains("y coordinate"));
    }

    #[test]
    fn test_fractional_coordinate_is_rejected() {
        let err = parse("P1 0.5 0\n").unwrap_err();
        assert!(matches!(err, TourError::InputFormat { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_identifier_is_rejected() {
        let err = parse("P1 0 0\nP2 1 1\nP1 2 2\n").unwrap_err();
        assert!(matches!(err, TourError::InputFormat { line: 3, .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_blank_lines_and_missing_trailing_newline() {
        let set = parse("\nP1 0 0\n\nP2 3 4").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_tsplib_header_is_accepted() {
        let text = "NAME : bcl3\nCOMMENT : tiny\nTYPE : TSP\nDIMENSION : 3\n\
                    EDGE_WEIGHT_TYPE : EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 3 4\n3 6 8\nEOF\n";
        let set = parse(text).unwrap();

        assert_eq!(set.name, "bcl3");
        assert_eq!(set.comment, "tiny");
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(2), Some(&Location::new("3", 60, 80)));
    }

    #[test]
    fn test_tsplib_record_before_section_is_rejected() {
        let err = parse("NAME: x\n1 0 0\n").unwrap_err();
        assert!(matches!(err, TourError::InputFormat { line: 2, .. }));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = std::env::temp_dir().join("tsp-tour-solver-definitely-missing.tsp");
        let err = LocationSet::from_file(&path).unwrap_err();
        assert!(matches!(err, TourError::InputNotFound { .. }));
    }

    #[test]
    fn test_from_file_uses_file_stem_as_name() {
        let path = std::env::temp_dir().join(format!("tour-load-{}.tsp", std::process::id()));
        std::fs::write(&path, "P1 0 0\nP2 3 4\n").unwrap();

        let set = LocationSet::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(set.name, format!("tour-load-{}", std::process::id()));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_statistics() {
        let set = parse("P1 0 0\nP2 3 4\nP3 0 4\n").unwrap();
        let matrix = DistanceMatrix::from_locations(&set);
        let stats = set.statistics(&matrix);

        assert_eq!(stats.num_locations, 3);
        assert_eq!(stats.max_x, 30);
        assert_eq!(stats.max_y, 40);
        assert_eq!(stats.min_distance, 30);
        assert_eq!(stats.max_distance, 50);
        assert!((stats.avg_distance - 40.0).abs() < 1e-9);
    }
}
