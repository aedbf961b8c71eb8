//! Community collection access for the editor
//!
//! Holds the flat-file collection store, the gallery's cached page, and the
//! bookkeeping that makes the startup collection load at most once.

use bevy::prelude::*;
use isoshire_core::collection::CollectionPage;
use isoshire_core::{CollectionMap, CollectionSource, CollectionStore, MapStore};
use std::collections::HashSet;
use std::path::PathBuf;

/// Collection store plus gallery cache
#[derive(Resource)]
pub struct CollectionLibrary {
    pub store: CollectionStore,
    /// Collection requested on the command line
    pub initial_id: Option<String>,
    loaded_ids: HashSet<String>,
    /// Gallery page currently shown, refreshed on demand
    pub page: Option<CollectionPage>,
}

impl CollectionLibrary {
    pub fn new(dir: impl Into<PathBuf>, initial_id: Option<String>) -> Self {
        Self {
            store: CollectionStore::new(dir),
            initial_id,
            loaded_ids: HashSet::new(),
            page: None,
        }
    }

    /// Take the startup collection id, once per id
    pub fn take_initial(&mut self) -> Option<String> {
        let id = self.initial_id.take()?;
        if self.loaded_ids.insert(id.clone()) {
            Some(id)
        } else {
            None
        }
    }

    /// Reload a gallery page from disk
    pub fn refresh_page(&mut self, page: usize, per_page: usize) -> &CollectionPage {
        self.page.insert(self.store.page(page, per_page))
    }
}

/// Fetch `id` and load it into the store. Missing or invalid collections
/// leave the store untouched.
pub fn apply_collection(
    source: &dyn CollectionSource,
    id: &str,
    store: &mut MapStore,
) -> Option<CollectionMap> {
    let Some(map) = source.fetch(id) else {
        debug!("Collection '{}' not available, keeping current map", id);
        return None;
    };
    store.load_snapshot(map.snapshot.clone());
    Some(map)
}

/// Startup system: load the collection named on the command line
pub fn load_initial_collection(
    mut library: ResMut<CollectionLibrary>,
    mut store: ResMut<MapStore>,
) {
    let Some(id) = library.take_initial() else {
        return;
    };
    if let Some(map) = apply_collection(&library.store, &id, &mut store) {
        info!("Loaded collection map '{}' by {}", map.name, map.author.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoshire_core::{snapshot, Location, Realm, TileCell};
    use std::collections::HashMap;

    struct FakeSource(HashMap<String, CollectionMap>);

    impl CollectionSource for FakeSource {
        fn fetch(&self, id: &str) -> Option<CollectionMap> {
            self.0.get(id).cloned()
        }
    }

    fn fake_source() -> FakeSource {
        let mut store = MapStore::new();
        store.set_location(Location::Realm(Realm::Gondor));
        store.set_grid_size(4).unwrap();
        store.set_tile(1, 2, TileCell::new(3, 3)).unwrap();
        let map = snapshot::export_document(&store.snapshot(), "Minas Tirith");

        let mut maps = HashMap::new();
        maps.insert(map.id.clone(), map);
        FakeSource(maps)
    }

    #[test]
    fn test_apply_collection_loads_snapshot() {
        let source = fake_source();
        let mut store = MapStore::new();
        let map = apply_collection(&source, "minas-tirith", &mut store).unwrap();

        assert_eq!(map.name, "Minas Tirith");
        assert_eq!(store.location(), Location::Realm(Realm::Gondor));
        assert_eq!(store.grid_size(), 4);
        assert_eq!(store.grid().tile(1, 2), Some(TileCell::new(3, 3)));
        assert!(store.can_undo());
    }

    #[test]
    fn test_missing_collection_leaves_store_untouched() {
        let source = fake_source();
        let mut store = MapStore::new();
        store.set_tile(0, 0, TileCell::new(5, 5)).unwrap();
        let before = store.snapshot();

        assert!(apply_collection(&source, "barad-dur", &mut store).is_none());
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn test_initial_collection_is_taken_once() {
        let mut library = CollectionLibrary::new("collections/maps", Some("shire".to_string()));
        assert_eq!(library.take_initial(), Some("shire".to_string()));
        assert_eq!(library.take_initial(), None);

        library.initial_id = Some("shire".to_string());
        assert_eq!(library.take_initial(), None);
        library.initial_id = Some("rohan".to_string());
        assert_eq!(library.take_initial(), Some("rohan".to_string()));
    }

    #[test]
    fn test_refresh_page_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        let map = fake_source().0.remove("minas-tirith").unwrap();
        std::fs::write(dir.path().join(map.file_name()), map.to_json_pretty().unwrap()).unwrap();

        let mut library = CollectionLibrary::new(dir.path(), None);
        let page = library.refresh_page(0, 6);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "minas-tirith");
        assert!(library.page.is_some());
    }
}
