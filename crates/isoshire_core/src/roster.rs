//! The fixed character roster
//!
//! Character cells reference roster entries by id. A `CharacterId` can only be
//! obtained through [`CharacterId::parse`], so an id that is not in the roster
//! never reaches the store.

use serde::{Serialize, Serializer};
use std::fmt;

/// Grouping used by the character picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterRealm {
    Hobbits,
    Elves,
    Dwarves,
    Men,
    Orcs,
}

impl CharacterRealm {
    pub fn all() -> &'static [CharacterRealm] {
        &[
            CharacterRealm::Hobbits,
            CharacterRealm::Elves,
            CharacterRealm::Dwarves,
            CharacterRealm::Men,
            CharacterRealm::Orcs,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            CharacterRealm::Hobbits => "hobbits",
            CharacterRealm::Elves => "elves",
            CharacterRealm::Dwarves => "dwarves",
            CharacterRealm::Men => "men",
            CharacterRealm::Orcs => "orcs",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CharacterRealm::Hobbits => "Hobbits",
            CharacterRealm::Elves => "Elves",
            CharacterRealm::Dwarves => "Dwarves",
            CharacterRealm::Men => "Men",
            CharacterRealm::Orcs => "Orcs",
        }
    }

    /// Roster entries in this group
    pub fn members(&self) -> impl Iterator<Item = &'static CharacterDefinition> + '_ {
        CHARACTERS.iter().filter(move |c| c.realm == *self)
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub realm: CharacterRealm,
}

impl CharacterDefinition {
    /// Sprite path relative to the assets folder
    pub fn asset_path(&self) -> String {
        format!("characters/{}/{}.png", self.realm.id(), self.id)
    }
}

const fn hobbit(id: &'static str, label: &'static str) -> CharacterDefinition {
    CharacterDefinition {
        id,
        label,
        realm: CharacterRealm::Hobbits,
    }
}

/// Every character that may be placed on a map
pub static CHARACTERS: [CharacterDefinition; 8] = [
    hobbit("hobbit-1", "Hobbit 1"),
    hobbit("hobbit-2", "Hobbit 2"),
    hobbit("hobbit-3", "Hobbit 3"),
    hobbit("hobbit-4", "Hobbit 4"),
    hobbit("hobbit-5", "Hobbit 5"),
    hobbit("hobbit-6", "Hobbit 6"),
    hobbit("hobbit-7", "Hobbit 7"),
    hobbit("hobbit-8", "Hobbit 8"),
];

/// Look up a roster entry by id
pub fn character(id: &str) -> Option<&'static CharacterDefinition> {
    CHARACTERS.iter().find(|c| c.id == id)
}

/// Identifier of a roster entry, guaranteed to be a roster member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterId(&'static str);

impl CharacterId {
    /// Roster membership predicate: `None` for anything not in the roster
    pub fn parse(value: &str) -> Option<CharacterId> {
        character(value).map(|c| CharacterId(c.id))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn definition(&self) -> &'static CharacterDefinition {
        // Construction goes through `parse`, so the lookup always succeeds
        character(self.0).unwrap_or(&CHARACTERS[0])
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for CharacterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_only_roster_members() {
        let id = CharacterId::parse("hobbit-3").unwrap();
        assert_eq!(id.as_str(), "hobbit-3");
        assert_eq!(id.definition().label, "Hobbit 3");
        assert!(CharacterId::parse("gandalf").is_none());
        assert!(CharacterId::parse("").is_none());
    }

    #[test]
    fn test_asset_path() {
        let def = character("hobbit-8").unwrap();
        assert_eq!(def.asset_path(), "characters/hobbits/hobbit-8.png");
    }

    #[test]
    fn test_groups() {
        assert_eq!(CharacterRealm::Hobbits.members().count(), 8);
        assert_eq!(CharacterRealm::Orcs.members().count(), 0);
    }
}
