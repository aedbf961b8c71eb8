//! Realms (themed tile sets) and the editor location

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A themed tile set. Every realm ships the same 6×12 sprite atlas layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Shire,
    Gondor,
    Mordor,
    Lothlorien,
    Rohan,
    Moria,
    Rivendell,
}

/// Realm used whenever nothing more specific is known
pub const DEFAULT_REALM: Realm = Realm::Shire;

/// Location a fresh store starts in
pub const DEFAULT_LOCATION: Location = Location::Realm(DEFAULT_REALM);

impl Realm {
    /// Returns all realms in picker order
    pub fn all() -> &'static [Realm] {
        &[
            Realm::Shire,
            Realm::Gondor,
            Realm::Mordor,
            Realm::Lothlorien,
            Realm::Rohan,
            Realm::Moria,
            Realm::Rivendell,
        ]
    }

    /// Identifier used on the wire and in asset paths
    pub fn id(&self) -> &'static str {
        match self {
            Realm::Shire => "shire",
            Realm::Gondor => "gondor",
            Realm::Mordor => "mordor",
            Realm::Lothlorien => "lothlorien",
            Realm::Rohan => "rohan",
            Realm::Moria => "moria",
            Realm::Rivendell => "rivendell",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Realm::Shire => "Shire",
            Realm::Gondor => "Gondor",
            Realm::Mordor => "Mordor",
            Realm::Lothlorien => "Lothlorien",
            Realm::Rohan => "Rohan",
            Realm::Moria => "Moria",
            Realm::Rivendell => "Rivendell",
        }
    }

    /// Look a realm up by its wire identifier
    pub fn from_id(id: &str) -> Option<Realm> {
        Realm::all().iter().copied().find(|realm| realm.id() == id)
    }

    /// Flat colour used for gallery previews (RGB)
    pub fn preview_color(&self) -> [u8; 3] {
        match self {
            Realm::Shire => [0x83, 0xb3, 0x6d],
            Realm::Gondor => [0x9f, 0xb2, 0xc8],
            Realm::Mordor => [0x75, 0x61, 0x5a],
            Realm::Lothlorien => [0xa2, 0xc4, 0x72],
            Realm::Rohan => [0xb9, 0xa5, 0x63],
            Realm::Moria => [0x6b, 0x71, 0x7b],
            Realm::Rivendell => [0x9f, 0x8c, 0xc7],
        }
    }

    /// Asset path of a single sliced tile sprite, relative to the assets folder
    pub fn tile_asset_path(&self, row: u8, col: u8) -> String {
        format!("tiles/{}/r{}-c{}.png", self.id(), row, col)
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Which sprite set tiles resolve against.
///
/// `Mixed` lets every tile carry its own realm tag; any other location forces
/// all tiles onto that one realm regardless of their tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Location {
    Realm(Realm),
    Mixed,
}

impl Default for Location {
    fn default() -> Self {
        DEFAULT_LOCATION
    }
}

impl Location {
    pub const MIXED_ID: &'static str = "mixed";

    /// Returns all locations in selector order (realms first, then mixed)
    pub fn all() -> Vec<Location> {
        Realm::all()
            .iter()
            .copied()
            .map(Location::Realm)
            .chain(std::iter::once(Location::Mixed))
            .collect()
    }

    pub fn id(&self) -> &'static str {
        match self {
            Location::Realm(realm) => realm.id(),
            Location::Mixed => Self::MIXED_ID,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Location::Realm(realm) => realm.display_name(),
            Location::Mixed => "Mixed",
        }
    }

    pub fn from_id(id: &str) -> Option<Location> {
        if id == Self::MIXED_ID {
            return Some(Location::Mixed);
        }
        Realm::from_id(id).map(Location::Realm)
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Location::Mixed)
    }

    /// Realm a tile with the given tag renders from under this location
    pub fn resolve(&self, tile_realm: Option<Realm>) -> Realm {
        match self {
            Location::Realm(realm) => *realm,
            Location::Mixed => tile_realm.unwrap_or(DEFAULT_REALM),
        }
    }

    /// Realms offered by the tile picker
    pub fn visible_realms(&self) -> Vec<Realm> {
        match self {
            Location::Realm(realm) => vec![*realm],
            Location::Mixed => Realm::all().to_vec(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::from_id(s).ok_or_else(|| format!("unknown location '{}'", s))
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.id().to_string()
    }
}

impl TryFrom<String> for Location {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_ids_round_trip() {
        for location in Location::all() {
            assert_eq!(Location::from_id(location.id()), Some(location));
        }
        assert_eq!(Location::from_id("isengard"), None);
    }

    #[test]
    fn test_resolve_ignores_tags_outside_mixed() {
        let mordor = Location::Realm(Realm::Mordor);
        assert_eq!(mordor.resolve(Some(Realm::Gondor)), Realm::Mordor);
        assert_eq!(Location::Mixed.resolve(Some(Realm::Gondor)), Realm::Gondor);
        assert_eq!(Location::Mixed.resolve(None), DEFAULT_REALM);
    }

    #[test]
    fn test_location_serializes_as_plain_string() {
        let json = serde_json::to_string(&Location::Mixed).unwrap();
        assert_eq!(json, "\"mixed\"");
        let parsed: Location = serde_json::from_str("\"rohan\"").unwrap();
        assert_eq!(parsed, Location::Realm(Realm::Rohan));
        assert!(serde_json::from_str::<Location>("\"isengard\"").is_err());
    }

    #[test]
    fn test_tile_asset_path() {
        assert_eq!(Realm::Moria.tile_asset_path(2, 11), "tiles/moria/r2-c11.png");
    }
}
