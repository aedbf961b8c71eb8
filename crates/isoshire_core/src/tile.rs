//! Tile cells - sprite atlas coordinates plus an optional realm tag

use crate::Realm;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of sprite rows in every realm atlas
pub const ATLAS_ROWS: u8 = 6;
/// Number of sprite columns in every realm atlas
pub const ATLAS_COLUMNS: u8 = 12;

/// Terrain value at one grid position.
///
/// `row`/`col` index the realm's sprite atlas. `realm` is only honoured when
/// the grid location is mixed; without it the grid's location decides.
///
/// On the wire a cell is the positional array `[row, col]` or
/// `[row, col, "realm"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileCell {
    pub row: u8,
    pub col: u8,
    pub realm: Option<Realm>,
}

impl TileCell {
    pub const fn new(row: u8, col: u8) -> Self {
        Self {
            row,
            col,
            realm: None,
        }
    }

    pub const fn with_realm(row: u8, col: u8, realm: Realm) -> Self {
        Self {
            row,
            col,
            realm: Some(realm),
        }
    }

    /// Whether the coordinates address a sprite that exists in the atlas
    pub fn is_within_atlas(&self) -> bool {
        self.row < ATLAS_ROWS && self.col < ATLAS_COLUMNS
    }

    /// Same atlas coordinates without a realm tag
    pub fn untagged(self) -> Self {
        Self {
            realm: None,
            ..self
        }
    }
}

impl Serialize for TileCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.realm.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.row)?;
        seq.serialize_element(&self.col)?;
        if let Some(realm) = &self.realm {
            seq.serialize_element(realm)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TileCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TileCellVisitor;

        impl<'de> Visitor<'de> for TileCellVisitor {
            type Value = TileCell;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array [row, col] or [row, col, realm]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TileCell, A::Error> {
                let row: u8 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let col: u8 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let realm: Option<Realm> = seq.next_element()?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(4, &self));
                }
                let cell = TileCell { row, col, realm };
                if !cell.is_within_atlas() {
                    return Err(de::Error::custom(format!(
                        "tile ({}, {}) is outside the {}x{} atlas",
                        row, col, ATLAS_ROWS, ATLAS_COLUMNS
                    )));
                }
                Ok(cell)
            }
        }

        deserializer.deserialize_seq(TileCellVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_bounds() {
        assert!(TileCell::new(5, 11).is_within_atlas());
        assert!(!TileCell::new(6, 0).is_within_atlas());
        assert!(!TileCell::new(0, 12).is_within_atlas());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&TileCell::new(1, 2)).unwrap(), "[1,2]");
        assert_eq!(
            serde_json::to_string(&TileCell::with_realm(3, 4, Realm::Gondor)).unwrap(),
            "[3,4,\"gondor\"]"
        );

        let cell: TileCell = serde_json::from_str("[3,4,\"rohan\"]").unwrap();
        assert_eq!(cell, TileCell::with_realm(3, 4, Realm::Rohan));
    }

    #[test]
    fn test_rejects_malformed_cells() {
        assert!(serde_json::from_str::<TileCell>("[1]").is_err());
        assert!(serde_json::from_str::<TileCell>("[1,2,\"shire\",4]").is_err());
        assert!(serde_json::from_str::<TileCell>("[9,2]").is_err());
        assert!(serde_json::from_str::<TileCell>("[1,2,\"isengard\"]").is_err());
    }

    #[test]
    fn test_equality_is_by_value() {
        assert_eq!(TileCell::new(2, 3), TileCell::new(2, 3));
        assert_ne!(TileCell::new(2, 3), TileCell::with_realm(2, 3, Realm::Shire));
        assert_eq!(TileCell::with_realm(2, 3, Realm::Shire).untagged(), TileCell::new(2, 3));
    }
}
