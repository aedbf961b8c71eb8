//! User preferences persisted between sessions

mod file;

pub use file::PreferencesError;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gallery page size used when no preference is stored
pub const DEFAULT_GALLERY_PAGE_SIZE: usize = 6;

/// Editor settings stored in `preferences.json` in the platform config dir
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    /// Where the session blob is kept. `None` uses the platform data dir.
    pub storage_path: Option<PathBuf>,
    /// Directory holding community collection maps
    pub collections_dir: Option<PathBuf>,
    /// Maps shown per gallery page
    pub gallery_page_size: usize,
    /// Outline the cell under the cursor
    pub show_hover_highlight: bool,
    /// Directory last used for JSON / PNG export
    pub last_export_dir: Option<PathBuf>,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            storage_path: None,
            collections_dir: None,
            gallery_page_size: DEFAULT_GALLERY_PAGE_SIZE,
            show_hover_highlight: true,
            last_export_dir: None,
        }
    }
}

impl EditorPreferences {
    /// Collections directory, falling back to `collections/maps` next to the binary's cwd
    pub fn collections_dir_or_default(&self) -> PathBuf {
        self.collections_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("collections").join("maps"))
    }

    /// Remember the directory of a file just exported
    pub fn remember_export(&mut self, exported: &std::path::Path) -> bool {
        let dir = exported.parent().map(|p| p.to_path_buf());
        if dir.is_none() || dir == self.last_export_dir {
            return false;
        }
        self.last_export_dir = dir;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let prefs: EditorPreferences =
            serde_json::from_str(r#"{ "gallery_page_size": 12 }"#).unwrap();
        assert_eq!(prefs.gallery_page_size, 12);
        assert!(prefs.show_hover_highlight);
        assert_eq!(prefs.storage_path, None);
    }

    #[test]
    fn test_remember_export() {
        let mut prefs = EditorPreferences::default();
        assert!(prefs.remember_export(std::path::Path::new("/tmp/maps/bag-end.json")));
        assert!(!prefs.remember_export(std::path::Path::new("/tmp/maps/other.png")));
        assert_eq!(prefs.last_export_dir, Some(PathBuf::from("/tmp/maps")));
    }
}
