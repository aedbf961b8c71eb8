//! Texture bookkeeping keyed by asset path
//!
//! Requests are grouped in batches. Switching location starts a new batch;
//! loads that finish for an older batch are still cached but do not ask for
//! a redraw.

use std::collections::HashMap;

/// Load progress of one texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureState<H> {
    Pending { handle: H, generation: u64 },
    Ready(H),
    Failed,
}

/// Asset-path keyed cache, generic over the handle type
#[derive(Debug, Clone)]
pub struct TextureCache<H> {
    entries: HashMap<String, TextureState<H>>,
    generation: u64,
}

impl<H> Default for TextureCache<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
        }
    }
}

impl<H: Clone> TextureCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new batch and return its generation
    pub fn begin_batch(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Ask for `path` in the current batch. `load` runs only for paths never
    /// seen before; returns whether it ran.
    pub fn request(&mut self, path: &str, load: impl FnOnce(&str) -> H) -> bool {
        match self.entries.get_mut(path) {
            Some(TextureState::Pending { generation, .. }) => {
                *generation = self.generation;
                false
            }
            Some(_) => false,
            None => {
                let handle = load(path);
                self.entries.insert(
                    path.to_string(),
                    TextureState::Pending {
                        handle,
                        generation: self.generation,
                    },
                );
                true
            }
        }
    }

    /// Paths still loading, with their handles
    pub fn pending(&self) -> Vec<(String, H)> {
        self.entries
            .iter()
            .filter_map(|(path, state)| match state {
                TextureState::Pending { handle, .. } => Some((path.clone(), handle.clone())),
                _ => None,
            })
            .collect()
    }

    /// Record the outcome of a load. Returns `true` when the load belongs to
    /// the current batch, meaning the map should be redrawn.
    pub fn finish(&mut self, path: &str, loaded: bool) -> bool {
        let Some(TextureState::Pending { handle, generation }) = self.entries.get(path).cloned()
        else {
            return false;
        };

        let state = if loaded {
            TextureState::Ready(handle)
        } else {
            TextureState::Failed
        };
        self.entries.insert(path.to_string(), state);
        generation == self.generation
    }

    /// Handle of a loaded texture
    pub fn ready(&self, path: &str) -> Option<&H> {
        match self.entries.get(path) {
            Some(TextureState::Ready(handle)) => Some(handle),
            _ => None,
        }
    }
}
