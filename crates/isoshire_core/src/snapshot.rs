//! Map snapshots and the importer/exporter for untrusted map payloads
//!
//! Anything arriving from outside the store (a JSON file, the persisted blob,
//! a collection document) passes through [`validate`] before it can be
//! loaded. Tile data fails closed: one bad cell rejects the whole payload.
//! Character data is optional and fails open: see [`normalize_character_map`].

use crate::collection::{slugify, Author, CollectionMap, SCHEMA_VERSION};
use crate::{CharacterId, Grid, Location, Realm, TileCell, ATLAS_COLUMNS, ATLAS_ROWS};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

/// A complete, self-contained copy of map, character map, grid size and location
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapSnapshot {
    pub grid: Grid,
    pub location: Location,
}

impl MapSnapshot {
    pub fn new(grid: Grid, location: Location) -> Self {
        Self { grid, location }
    }

    pub fn grid_size(&self) -> usize {
        self.grid.size()
    }
}

/// Why a single tile cell was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    NotAnArray,
    Arity(usize),
    Row(String),
    Col(String),
    Realm(String),
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileError::NotAnArray => write!(f, "must be [row,col] or [row,col,realm]"),
            TileError::Arity(n) => write!(f, "has {} elements, expected 2 or 3", n),
            TileError::Row(v) => {
                write!(f, "row {} must be an integer 0..{}", v, ATLAS_ROWS - 1)
            }
            TileError::Col(v) => {
                write!(f, "col {} must be an integer 0..{}", v, ATLAS_COLUMNS - 1)
            }
            TileError::Realm(v) => write!(f, "has invalid realm {}", v),
        }
    }
}

impl std::error::Error for TileError {}

/// Why a snapshot payload was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    NotAnObject,
    GridSize(String),
    Location(String),
    MapNotAnArray,
    RowCount { expected: usize, found: usize },
    RowNotAnArray { row: usize },
    RowLength { row: usize, expected: usize, found: usize },
    Tile { row: usize, col: usize, error: TileError },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::NotAnObject => write!(f, "snapshot must be a JSON object"),
            SnapshotError::GridSize(v) => write!(
                f,
                "gridSize {} must be an integer from {} to {}",
                v,
                crate::MIN_GRID_SIZE,
                crate::MAX_GRID_SIZE
            ),
            SnapshotError::Location(v) => write!(f, "unknown location {}", v),
            SnapshotError::MapNotAnArray => write!(f, "map must be an array of rows"),
            SnapshotError::RowCount { expected, found } => {
                write!(f, "map has {} rows, expected {}", found, expected)
            }
            SnapshotError::RowNotAnArray { row } => write!(f, "map row {} is not an array", row),
            SnapshotError::RowLength {
                row,
                expected,
                found,
            } => write!(f, "map row {} has {} tiles, expected {}", row, found, expected),
            SnapshotError::Tile { row, col, error } => {
                write!(f, "map[{}][{}] {}", row, col, error)
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Failure to import a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    Parse(String),
    Invalid(SnapshotError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Parse(e) => write!(f, "Parse error: {}", e),
            ImportError::Invalid(e) => write!(f, "Invalid map: {}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<SnapshotError> for ImportError {
    fn from(e: SnapshotError) -> Self {
        ImportError::Invalid(e)
    }
}

/// Short human-readable rendering of an untrusted value for error messages
fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::String(s)) => format!("'{}'", s),
        Some(other) => {
            let text = other.to_string();
            if text.chars().count() > 32 {
                format!("{}...", text.chars().take(29).collect::<String>())
            } else {
                text
            }
        }
    }
}

/// A non-negative integer, whether written `3` or `3.0`
pub(crate) fn whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u64)
    })
}

/// Validate an untrusted snapshot. `location` is required.
pub fn validate(raw: &Value) -> Result<MapSnapshot, SnapshotError> {
    validate_inner(raw, None)
}

/// Validate an untrusted snapshot, substituting `default` when `location` is
/// absent. A present but unknown location is still rejected.
pub fn validate_with_default_location(
    raw: &Value,
    default: Location,
) -> Result<MapSnapshot, SnapshotError> {
    validate_inner(raw, Some(default))
}

fn validate_inner(raw: &Value, default: Option<Location>) -> Result<MapSnapshot, SnapshotError> {
    let record = raw.as_object().ok_or(SnapshotError::NotAnObject)?;

    let grid_size_value = record.get("gridSize");
    let grid_size = grid_size_value
        .and_then(whole_number)
        .map(|n| n as usize)
        .filter(|n| Grid::is_valid_size(*n))
        .ok_or_else(|| SnapshotError::GridSize(describe(grid_size_value)))?;

    let location = match (record.get("location"), default) {
        (None, Some(default)) => default,
        (value, _) => value
            .and_then(Value::as_str)
            .and_then(Location::from_id)
            .ok_or_else(|| SnapshotError::Location(describe(value)))?,
    };

    let tiles = validate_map(record.get("map"), grid_size)?;
    let characters = normalize_character_map(record.get("characterMap"), grid_size);

    // Both layers were shape-checked above
    let grid = Grid::from_rows(grid_size, tiles, characters).ok_or(SnapshotError::RowCount {
        expected: grid_size,
        found: 0,
    })?;

    Ok(MapSnapshot::new(grid, location))
}

fn validate_map(raw: Option<&Value>, size: usize) -> Result<Vec<Vec<TileCell>>, SnapshotError> {
    let rows = raw
        .and_then(Value::as_array)
        .ok_or(SnapshotError::MapNotAnArray)?;
    if rows.len() != size {
        return Err(SnapshotError::RowCount {
            expected: size,
            found: rows.len(),
        });
    }

    rows.iter()
        .enumerate()
        .map(|(row_index, row)| -> Result<Vec<TileCell>, SnapshotError> {
            let cells = row
                .as_array()
                .ok_or(SnapshotError::RowNotAnArray { row: row_index })?;
            if cells.len() != size {
                return Err(SnapshotError::RowLength {
                    row: row_index,
                    expected: size,
                    found: cells.len(),
                });
            }
            cells
                .iter()
                .enumerate()
                .map(|(col_index, cell)| {
                    validate_tile(cell).map_err(|error| SnapshotError::Tile {
                        row: row_index,
                        col: col_index,
                        error,
                    })
                })
                .collect()
        })
        .collect()
}

/// Validate one positional tile cell `[row, col]` / `[row, col, realm]`
pub fn validate_tile(raw: &Value) -> Result<TileCell, TileError> {
    let parts = raw.as_array().ok_or(TileError::NotAnArray)?;
    if parts.len() != 2 && parts.len() != 3 {
        return Err(TileError::Arity(parts.len()));
    }

    let row = whole_number(&parts[0])
        .filter(|r| *r < ATLAS_ROWS as u64)
        .ok_or_else(|| TileError::Row(describe(Some(&parts[0]))))? as u8;
    let col = whole_number(&parts[1])
        .filter(|c| *c < ATLAS_COLUMNS as u64)
        .ok_or_else(|| TileError::Col(describe(Some(&parts[1]))))? as u8;
    let realm = match parts.get(2) {
        None => None,
        Some(value) => Some(
            value
                .as_str()
                .and_then(Realm::from_id)
                .ok_or_else(|| TileError::Realm(describe(Some(value))))?,
        ),
    };

    Ok(TileCell { row, col, realm })
}

/// Coerce an optional character layer into a `size`×`size` grid.
///
/// A missing or wrong-shaped layer becomes all-empty; individual entries
/// that are not roster ids become empty.
pub fn normalize_character_map(raw: Option<&Value>, size: usize) -> Vec<Vec<Option<CharacterId>>> {
    let empty = || vec![vec![None; size]; size];

    let Some(rows) = raw.and_then(Value::as_array) else {
        return empty();
    };
    if rows.len() != size {
        return empty();
    }

    let mut normalized = Vec::with_capacity(size);
    for row in rows {
        let Some(cells) = row.as_array().filter(|cells| cells.len() == size) else {
            return empty();
        };
        normalized.push(
            cells
                .iter()
                .map(|cell| cell.as_str().and_then(CharacterId::parse))
                .collect(),
        );
    }
    normalized
}

/// Parse and validate a JSON document containing a snapshot
pub fn import_json(text: &str) -> Result<MapSnapshot, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))?;
    Ok(validate(&value)?)
}

/// Author written into exported documents until the user edits the file
pub fn placeholder_author() -> Author {
    Author {
        name: "Anonymous".to_string(),
        github: "your-github-username".to_string(),
    }
}

/// Build a collection document for `snapshot`, stamped with the current time
pub fn export_document(snapshot: &MapSnapshot, name: &str) -> CollectionMap {
    export_document_at(snapshot, name, Utc::now())
}

/// Build a collection document for `snapshot` with an explicit timestamp
pub fn export_document_at(
    snapshot: &MapSnapshot,
    name: &str,
    created_at: DateTime<Utc>,
) -> CollectionMap {
    CollectionMap {
        schema_version: SCHEMA_VERSION,
        id: slugify(name),
        name: name.to_string(),
        description: None,
        author: placeholder_author(),
        created_at: crate::collection::format_timestamp(created_at),
        tags: None,
        snapshot: snapshot.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_map(size: usize) -> Value {
        json!(vec![vec![json!([0, 0]); size]; size])
    }

    #[test]
    fn test_accepts_well_formed_snapshot() {
        let raw = json!({ "gridSize": 3, "location": "rohan", "map": empty_map(3) });
        let snapshot = validate(&raw).unwrap();
        assert_eq!(snapshot.grid_size(), 3);
        assert_eq!(snapshot.location, Location::Realm(Realm::Rohan));
        assert!(snapshot.grid.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_grid_size() {
        let raw = json!({ "gridSize": 25, "location": "shire", "map": empty_map(25) });
        assert_eq!(validate(&raw), Err(SnapshotError::GridSize("25".to_string())));

        let raw = json!({ "gridSize": 4.5, "location": "shire", "map": empty_map(4) });
        assert!(matches!(validate(&raw), Err(SnapshotError::GridSize(_))));
    }

    #[test]
    fn test_integral_floats_count_as_integers() {
        let mut map = vec![vec![json!([0, 0]); 3]; 3];
        map[1][1] = json!([1.0, 2]);
        let raw = json!({ "gridSize": 3.0, "location": "shire", "map": map.clone() });
        let snapshot = validate(&raw).unwrap();
        assert_eq!(snapshot.grid_size(), 3);
        assert_eq!(snapshot.grid.tile(1, 1), Some(TileCell::new(1, 2)));

        let raw = json!({ "gridSize": 3.5, "location": "shire", "map": map.clone() });
        assert_eq!(validate(&raw), Err(SnapshotError::GridSize("3.5".to_string())));

        map[1][1] = json!([1.5, 2]);
        let raw = json!({ "gridSize": 3, "location": "shire", "map": map });
        assert!(matches!(
            validate(&raw),
            Err(SnapshotError::Tile {
                error: TileError::Row(_),
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_short_map() {
        let mut rows = vec![vec![json!([0, 0]); 5]; 4];
        let raw = json!({ "gridSize": 5, "location": "shire", "map": rows.clone() });
        assert_eq!(
            validate(&raw),
            Err(SnapshotError::RowCount {
                expected: 5,
                found: 4
            })
        );

        rows.push(vec![json!([0, 0]); 4]);
        let raw = json!({ "gridSize": 5, "location": "shire", "map": rows });
        assert!(matches!(
            validate(&raw),
            Err(SnapshotError::RowLength { row: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_realm_and_location() {
        let mut map = vec![vec![json!([0, 0]); 3]; 3];
        map[1][2] = json!([1, 1, "isengard"]);
        let raw = json!({ "gridSize": 3, "location": "mixed", "map": map });
        assert_eq!(
            validate(&raw),
            Err(SnapshotError::Tile {
                row: 1,
                col: 2,
                error: TileError::Realm("'isengard'".to_string())
            })
        );

        let raw = json!({ "gridSize": 3, "location": "isengard", "map": empty_map(3) });
        assert!(matches!(validate(&raw), Err(SnapshotError::Location(_))));
    }

    #[test]
    fn test_rejects_tiles_outside_atlas() {
        let mut map = vec![vec![json!([0, 0]); 3]; 3];
        map[0][0] = json!([6, 0]);
        let raw = json!({ "gridSize": 3, "location": "shire", "map": map.clone() });
        assert!(matches!(
            validate(&raw),
            Err(SnapshotError::Tile {
                error: TileError::Row(_),
                ..
            })
        ));

        map[0][0] = json!([0, -1]);
        let raw = json!({ "gridSize": 3, "location": "shire", "map": map.clone() });
        assert!(matches!(
            validate(&raw),
            Err(SnapshotError::Tile {
                error: TileError::Col(_),
                ..
            })
        ));

        map[0][0] = json!([0]);
        let raw = json!({ "gridSize": 3, "location": "shire", "map": map });
        assert!(matches!(
            validate(&raw),
            Err(SnapshotError::Tile {
                error: TileError::Arity(1),
                ..
            })
        ));
    }

    #[test]
    fn test_realm_tags_accepted_in_any_location() {
        let mut map = vec![vec![json!([0, 0]); 3]; 3];
        map[0][0] = json!([2, 3, "gondor"]);
        let raw = json!({ "gridSize": 3, "location": "shire", "map": map });
        let snapshot = validate(&raw).unwrap();
        assert_eq!(
            snapshot.grid.tile(0, 0),
            Some(TileCell::with_realm(2, 3, Realm::Gondor))
        );
    }

    #[test]
    fn test_missing_location_uses_default_only_when_allowed() {
        let raw = json!({ "gridSize": 3, "map": empty_map(3) });
        assert!(matches!(validate(&raw), Err(SnapshotError::Location(_))));

        let snapshot = validate_with_default_location(&raw, Location::default()).unwrap();
        assert_eq!(snapshot.location, Location::default());

        let raw = json!({ "gridSize": 3, "location": "isengard", "map": empty_map(3) });
        assert!(validate_with_default_location(&raw, Location::default()).is_err());
    }

    #[test]
    fn test_normalize_character_map() {
        let good = json!([["hobbit-1", null], ["gandalf", "hobbit-2"]]);
        let normalized = normalize_character_map(Some(&good), 2);
        assert_eq!(normalized[0][0], CharacterId::parse("hobbit-1"));
        assert_eq!(normalized[0][1], None);
        assert_eq!(normalized[1][0], None);
        assert_eq!(normalized[1][1], CharacterId::parse("hobbit-2"));

        let wrong_shape = json!([["hobbit-1"]]);
        let normalized = normalize_character_map(Some(&wrong_shape), 2);
        assert_eq!(normalized, vec![vec![None; 2]; 2]);

        assert_eq!(normalize_character_map(None, 3), vec![vec![None; 3]; 3]);
        assert_eq!(
            normalize_character_map(Some(&json!("nope")), 3),
            vec![vec![None; 3]; 3]
        );
    }

    #[test]
    fn test_mixed_snapshot_round_trips_through_export() {
        let mut map = vec![vec![json!([0, 0]); 5]; 5];
        map[2][3] = json!([4, 7, "gondor"]);
        map[4][0] = json!([1, 11]);
        let raw = json!({ "gridSize": 5, "location": "mixed", "map": map });
        let snapshot = validate(&raw).unwrap();

        let document = export_document(&snapshot, "Minas Tirith");
        let text = serde_json::to_string_pretty(&document).unwrap();
        let imported = import_json(&text).unwrap();

        assert_eq!(imported, snapshot);
        assert_eq!(document.id, "minas-tirith");
    }

    #[test]
    fn test_import_reports_parse_errors() {
        assert!(matches!(import_json("{not json"), Err(ImportError::Parse(_))));
        assert!(matches!(import_json("[]"), Err(ImportError::Invalid(SnapshotError::NotAnObject))));
    }
}
