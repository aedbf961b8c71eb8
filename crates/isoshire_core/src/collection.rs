//! Community collection maps
//!
//! A collection map is a JSON document with authoring metadata wrapped around
//! a snapshot. Documents live as `<id>.json` files in a flat directory; the
//! editor only ever consumes the snapshot part, through the same validation
//! as any other import.

use crate::snapshot::{self, MapSnapshot, SnapshotError};
use crate::{CharacterId, Grid, Location, TileCell, DEFAULT_LOCATION};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// The only document schema version understood
pub const SCHEMA_VERSION: u32 = 1;

/// Fields every document on disk must carry
pub const REQUIRED_FIELDS: &[&str] = &[
    "schemaVersion",
    "id",
    "name",
    "author",
    "createdAt",
    "gridSize",
    "location",
    "map",
];

const MAX_SLUG_LEN: usize = 64;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid id pattern"))
}

fn github_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{0,38}$").expect("valid username pattern")
    })
}

fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid separator pattern"))
}

/// Whether `id` is a kebab-case identifier safe to use as a file stem
pub fn is_safe_id(id: &str) -> bool {
    id_pattern().is_match(id)
}

/// Turn a display name into a kebab-case id (`"Minas Tirith!"` → `"minas-tirith"`)
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let dashed = separator_pattern().replace_all(&lowered, "-");
    let trimmed: String = dashed.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    let slug = trimmed.trim_end_matches('-');
    if slug.is_empty() {
        "map".to_string()
    } else {
        slug.to_string()
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-03-01T12:00:00.000Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether `value` is exactly the canonical form produced by [`format_timestamp`]
pub fn is_canonical_timestamp(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| format_timestamp(parsed.with_timezone(&Utc)) == value)
        .unwrap_or(false)
}

/// Map author credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub github: String,
}

/// A collection document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMap {
    pub schema_version: u32,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub author: Author,
    pub created_at: String,
    pub tags: Option<Vec<String>>,
    pub snapshot: MapSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionWire<'a> {
    schema_version: u32,
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    author: &'a Author,
    created_at: &'a str,
    location: Location,
    grid_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
    map: Vec<Vec<TileCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    character_map: Option<Vec<Vec<Option<CharacterId>>>>,
}

impl Serialize for CollectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let grid = &self.snapshot.grid;
        CollectionWire {
            schema_version: self.schema_version,
            id: &self.id,
            name: &self.name,
            description: self.description.as_deref(),
            author: &self.author,
            created_at: &self.created_at,
            location: self.snapshot.location,
            grid_size: grid.size(),
            tags: self.tags.as_deref(),
            map: grid.tile_rows(),
            character_map: grid.has_characters().then(|| grid.character_rows()),
        }
        .serialize(serializer)
    }
}

/// Why a collection document could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    IoError(String),
    ParseError(String),
    NotAnObject,
    SchemaVersion,
    MissingField(&'static str),
    InvalidSnapshot(SnapshotError),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::IoError(e) => write!(f, "IO error: {}", e),
            CollectionError::ParseError(e) => write!(f, "Parse error: {}", e),
            CollectionError::NotAnObject => write!(f, "Document must be a JSON object"),
            CollectionError::SchemaVersion => {
                write!(f, "schemaVersion must be {}", SCHEMA_VERSION)
            }
            CollectionError::MissingField(field) => {
                write!(f, "Missing or malformed field '{}'", field)
            }
            CollectionError::InvalidSnapshot(e) => write!(f, "Invalid map: {}", e),
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<SnapshotError> for CollectionError {
    fn from(e: SnapshotError) -> Self {
        CollectionError::InvalidSnapshot(e)
    }
}

fn required_str<'a>(
    record: &'a serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, CollectionError> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(CollectionError::MissingField(field))
}

impl CollectionMap {
    /// Validate an untrusted document. A missing `location` falls back to
    /// the default realm; everything about the map itself is strict.
    pub fn from_value(raw: &Value) -> Result<Self, CollectionError> {
        let record = raw.as_object().ok_or(CollectionError::NotAnObject)?;

        let schema_version = record.get("schemaVersion").and_then(snapshot::whole_number);
        if schema_version != Some(SCHEMA_VERSION as u64) {
            return Err(CollectionError::SchemaVersion);
        }
        let id = required_str(record, "id")?;
        let name = required_str(record, "name")?;
        let created_at = required_str(record, "createdAt")?;

        let author = record
            .get("author")
            .and_then(Value::as_object)
            .ok_or(CollectionError::MissingField("author"))?;
        let author = Author {
            name: required_str(author, "name")?.to_string(),
            github: required_str(author, "github")?.to_string(),
        };

        let description = record
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tags = record.get("tags").and_then(Value::as_array).and_then(|tags| {
            tags.iter()
                .map(|tag| tag.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        });

        let snapshot = snapshot::validate_with_default_location(raw, DEFAULT_LOCATION)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            id: id.to_string(),
            name: name.to_string(),
            description,
            author,
            created_at: created_at.to_string(),
            tags,
            snapshot,
        })
    }

    /// Parse and validate a document from JSON text
    pub fn from_json(text: &str) -> Result<Self, CollectionError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CollectionError::ParseError(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Read and validate a document file
    pub fn load(path: &Path) -> Result<Self, CollectionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CollectionError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Pretty JSON, as written to `<id>.json`
    pub fn to_json_pretty(&self) -> Result<String, CollectionError> {
        serde_json::to_string_pretty(self).map_err(|e| CollectionError::ParseError(e.to_string()))
    }

    /// File name this document should be stored under
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }

    /// Flat RGB colour per cell, row-major, for gallery thumbnails
    pub fn preview_colors(&self) -> Vec<[u8; 3]> {
        let location = self.snapshot.location;
        self.snapshot
            .grid
            .cells()
            .map(|(_, _, tile, _)| preview_color(tile, location))
            .collect()
    }
}

/// Thumbnail colour of a tile: its realm's colour, shaded by the sprite used
pub fn preview_color(tile: TileCell, location: Location) -> [u8; 3] {
    let base = location.resolve(tile.realm).preview_color();
    let intensity = (tile.row as u32 * 14 + tile.col as u32 * 3) % 35;
    let scale = 85 + intensity;
    base.map(|channel| ((channel as u32 * scale) / 100).min(255) as u8)
}

/// Anything that can hand out collection documents by id
pub trait CollectionSource {
    /// `None` when the id is unsafe, unknown, or the document is invalid
    fn fetch(&self, id: &str) -> Option<CollectionMap>;
}

/// One page of the gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPage {
    pub items: Vec<CollectionMap>,
    /// Zero-based page index actually returned
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Flat directory of `<id>.json` collection documents
#[derive(Debug, Clone)]
pub struct CollectionStore {
    dir: PathBuf,
}

impl CollectionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All `*.json` files in the directory, sorted by file name
    pub fn json_files(&self) -> Result<Vec<PathBuf>, CollectionError> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| CollectionError::IoError(e.to_string()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every valid document; invalid files are skipped
    pub fn list(&self) -> Vec<CollectionMap> {
        let files = match self.json_files() {
            Ok(files) => files,
            Err(e) => {
                tracing::debug!("Collection directory {:?} unavailable: {}", self.dir, e);
                return Vec::new();
            }
        };

        files
            .iter()
            .filter_map(|path| match CollectionMap::load(path) {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::warn!("Skipping collection file {:?}: {}", path, e);
                    None
                }
            })
            .collect()
    }

    /// Look a document up by id: `<id>.json` first, then any file whose `id`
    /// field matches
    pub fn get(&self, id: &str) -> Option<CollectionMap> {
        if !is_safe_id(id) {
            return None;
        }

        let direct = self.dir.join(format!("{}.json", id));
        if let Ok(map) = CollectionMap::load(&direct) {
            return Some(map);
        }

        self.json_files()
            .ok()?
            .iter()
            .filter_map(|path| CollectionMap::load(path).ok())
            .find(|map| map.id == id)
    }

    /// Zero-based page of the gallery; out-of-range pages clamp to the last
    pub fn page(&self, page: usize, per_page: usize) -> CollectionPage {
        let all = self.list();
        paginate(all, page, per_page)
    }
}

impl CollectionSource for CollectionStore {
    fn fetch(&self, id: &str) -> Option<CollectionMap> {
        self.get(id)
    }
}

/// Split `items` into pages of `per_page` and return page `page`
pub fn paginate(items: Vec<CollectionMap>, page: usize, per_page: usize) -> CollectionPage {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.min(total_pages - 1);
    let items = items
        .into_iter()
        .skip(page * per_page)
        .take(per_page)
        .collect();

    CollectionPage {
        items,
        page,
        total_pages,
        total,
    }
}

/// Check a document file the way contributors' submissions are checked.
///
/// Unlike [`CollectionMap::from_value`] this keeps going after the first
/// problem and reports every issue found. `seen_ids` tracks ids across a
/// directory to catch duplicates.
pub fn audit_document(path: &Path, data: &Value, seen_ids: &mut HashSet<String>) -> Vec<String> {
    let shown = path.display();
    let mut issues = Vec::new();

    let Some(record) = data.as_object() else {
        issues.push(format!("{}: JSON root must be an object.", shown));
        return issues;
    };

    for key in REQUIRED_FIELDS {
        if !record.contains_key(*key) {
            issues.push(format!("{}: missing required field '{}'.", shown, key));
        }
    }

    let schema_version = record.get("schemaVersion").and_then(snapshot::whole_number);
    if schema_version != Some(SCHEMA_VERSION as u64) {
        issues.push(format!("{}: schemaVersion must be {}.", shown, SCHEMA_VERSION));
    }

    match record.get("id").and_then(Value::as_str) {
        Some(id) => {
            if !is_safe_id(id) {
                issues.push(format!(
                    "{}: id must be kebab-case (a-z, 0-9, hyphens).",
                    shown
                ));
            }
            if !seen_ids.insert(id.to_string()) {
                issues.push(format!("{}: duplicate id '{}'.", shown, id));
            }
            let expected = format!("{}.json", id);
            let actual = path.file_name().map(|n| n.to_string_lossy().to_string());
            if actual.as_deref() != Some(expected.as_str()) {
                issues.push(format!("{}: filename must match id ({}).", shown, expected));
            }
        }
        None => issues.push(format!(
            "{}: id must be kebab-case (a-z, 0-9, hyphens).",
            shown
        )),
    }

    let non_empty = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };

    if !non_empty(record.get("name")) {
        issues.push(format!("{}: name must be a non-empty string.", shown));
    }

    match record.get("author").and_then(Value::as_object) {
        None => issues.push(format!("{}: author must be an object.", shown)),
        Some(author) => {
            if !non_empty(author.get("name")) {
                issues.push(format!("{}: author.name must be a non-empty string.", shown));
            }
            let github_ok = author
                .get("github")
                .and_then(Value::as_str)
                .is_some_and(|g| github_pattern().is_match(g));
            if !github_ok {
                issues.push(format!(
                    "{}: author.github must be a valid GitHub username.",
                    shown
                ));
            }
        }
    }

    let created_ok = record
        .get("createdAt")
        .and_then(Value::as_str)
        .is_some_and(is_canonical_timestamp);
    if !created_ok {
        issues.push(format!(
            "{}: createdAt must be an ISO-8601 UTC timestamp.",
            shown
        ));
    }

    let grid_size = record
        .get("gridSize")
        .and_then(snapshot::whole_number)
        .map(|n| n as usize)
        .filter(|n| Grid::is_valid_size(*n));
    if grid_size.is_none() {
        issues.push(format!(
            "{}: gridSize must be an integer from {} to {}.",
            shown,
            crate::MIN_GRID_SIZE,
            crate::MAX_GRID_SIZE
        ));
    }

    let location_ok = record
        .get("location")
        .and_then(Value::as_str)
        .and_then(Location::from_id)
        .is_some();
    if !location_ok {
        let all: Vec<&str> = Location::all().iter().map(Location::id).collect();
        issues.push(format!(
            "{}: location must be one of {}.",
            shown,
            all.join(", ")
        ));
    }

    let expected_rows = record
        .get("gridSize")
        .and_then(snapshot::whole_number)
        .unwrap_or(0) as usize;
    let Some(rows) = record
        .get("map")
        .and_then(Value::as_array)
        .filter(|rows| rows.len() == expected_rows)
    else {
        issues.push(format!(
            "{}: map must be an array with {} rows.",
            shown, expected_rows
        ));
        return issues;
    };

    for (row_index, row) in rows.iter().enumerate() {
        let Some(cells) = row.as_array().filter(|cells| cells.len() == expected_rows) else {
            issues.push(format!(
                "{}: map row {} must have {} tiles.",
                shown, row_index, expected_rows
            ));
            continue;
        };
        for (col_index, cell) in cells.iter().enumerate() {
            if let Err(e) = snapshot::validate_tile(cell) {
                issues.push(format!("{}: map[{}][{}] {}.", shown, row_index, col_index, e));
            }
        }
    }

    issues
}
