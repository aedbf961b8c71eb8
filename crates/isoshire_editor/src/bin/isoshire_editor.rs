//! Standalone Isoshire editor binary
//!
//! Run with: isoshire_editor [--assets DIR] [--storage FILE] [--collections DIR] [--collection ID]

use bevy::asset::{AssetPlugin, UnapprovedPathMode};
use bevy::prelude::*;
use bevy::window::WindowResolution;
use clap::Parser;
use isoshire_editor::EditorPlugin;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "isoshire_editor",
    about = "Isometric tile and character map editor"
)]
struct Args {
    /// Folder holding `tiles/<realm>/` and `characters/<group>/` sprites
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// File the editing session is persisted to
    #[arg(long, value_name = "FILE")]
    storage: Option<PathBuf>,

    /// Directory of community collection maps
    #[arg(long, value_name = "DIR")]
    collections: Option<PathBuf>,

    /// Collection map id to open on startup
    #[arg(long, value_name = "ID")]
    collection: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Bevy resolves relative asset roots against the executable, not the cwd
    let assets = args.assets.unwrap_or_else(|| PathBuf::from("assets"));
    let assets = std::env::current_dir()
        .map(|cwd| cwd.join(&assets))
        .unwrap_or(assets);

    let mut editor = EditorPlugin::new().with_assets_path(&assets);
    if let Some(path) = args.storage {
        editor = editor.with_storage_path(path);
    }
    if let Some(dir) = args.collections {
        editor = editor.with_collections_dir(dir);
    }
    if let Some(id) = args.collection {
        editor = editor.with_initial_collection(id);
    }

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Isoshire".to_string(),
                        resolution: WindowResolution::new(1600, 900),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: assets.to_string_lossy().into_owned(),
                    unapproved_path_mode: UnapprovedPathMode::Allow,
                    ..default()
                }),
        )
        .add_plugins(editor)
        .run();
}
