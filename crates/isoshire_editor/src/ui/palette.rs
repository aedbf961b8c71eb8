//! Tile and character pickers

use bevy_egui::egui;
use isoshire_core::collection::preview_color;
use isoshire_core::{
    CharacterId, CharacterRealm, Location, MapStore, Realm, TileCell, ATLAS_COLUMNS, ATLAS_ROWS,
};

use crate::render::MapTextures;

/// Tile picker slot size, same aspect as the sliced sprites
const TILE_SLOT: egui::Vec2 = egui::vec2(26.0, 46.0);
const CHARACTER_SLOT: egui::Vec2 = egui::vec2(40.0, 56.0);

/// Template a picker click selects. Under mixed the tile remembers its realm.
pub fn picker_tile(location: Location, realm: Realm, row: u8, col: u8) -> TileCell {
    if location.is_mixed() {
        TileCell::with_realm(row, col, realm)
    } else {
        TileCell::new(row, col)
    }
}

/// Render the tile picker followed by the character picker
pub fn render_palette(ui: &mut egui::Ui, store: &mut MapStore, textures: &MapTextures) {
    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.heading("Tiles");
        render_tile_picker(ui, store, textures);
        ui.add_space(8.0);
        ui.separator();
        ui.heading("Characters");
        render_character_picker(ui, store, textures);
    });
}

fn render_tile_picker(ui: &mut egui::Ui, store: &mut MapStore, textures: &MapTextures) {
    let location = store.location();
    // The tile tool only paints while no character is selected
    let tile_tool_live = store.active_character_tool().is_none();
    let active = store.active_tool();

    for realm in location.visible_realms() {
        egui::CollapsingHeader::new(realm.display_name())
            .id_salt(("tile_realm", realm.id()))
            .default_open(true)
            .show(ui, |ui| {
                egui::Grid::new(("tile_grid", realm.id()))
                    .spacing([2.0, 2.0])
                    .show(ui, |ui| {
                        for row in 0..ATLAS_ROWS {
                            for col in 0..ATLAS_COLUMNS {
                                let tile = picker_tile(location, realm, row, col);
                                let path = realm.tile_asset_path(row, col);
                                let (rect, response) =
                                    ui.allocate_exact_size(TILE_SLOT, egui::Sense::click());

                                if let Some(texture) = textures.egui_id(&path) {
                                    ui.painter().image(
                                        texture,
                                        rect,
                                        egui::Rect::from_min_max(
                                            egui::pos2(0.0, 0.0),
                                            egui::pos2(1.0, 1.0),
                                        ),
                                        egui::Color32::WHITE,
                                    );
                                } else {
                                    let [r, g, b] = preview_color(tile, Location::Realm(realm));
                                    ui.painter()
                                        .rect_filled(rect, 2.0, egui::Color32::from_rgb(r, g, b));
                                }

                                if tile_tool_live && active == tile {
                                    ui.painter().rect_stroke(
                                        rect.expand(1.0),
                                        0.0,
                                        egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 165, 0)),
                                        egui::StrokeKind::Outside,
                                    );
                                }

                                let response = response.on_hover_text(format!(
                                    "{} r{} c{}",
                                    realm.display_name(),
                                    row,
                                    col
                                ));
                                if response.clicked() {
                                    if let Err(e) = store.set_active_tool(tile) {
                                        bevy::log::warn!("Cannot select tile: {}", e);
                                    }
                                    store.set_active_character_tool(None);
                                }
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}

fn render_character_picker(ui: &mut egui::Ui, store: &mut MapStore, textures: &MapTextures) {
    let active = store.active_character_tool();

    if ui
        .selectable_label(active.is_none(), "None (paint tiles)")
        .clicked()
    {
        store.set_active_character_tool(None);
    }

    for group in CharacterRealm::all() {
        if group.members().next().is_none() {
            continue;
        }
        ui.label(egui::RichText::new(group.display_name()).strong());
        ui.horizontal_wrapped(|ui| {
            for definition in group.members() {
                let Some(id) = CharacterId::parse(definition.id) else {
                    continue;
                };
                let (rect, response) =
                    ui.allocate_exact_size(CHARACTER_SLOT, egui::Sense::click());

                if let Some(texture) = textures.egui_id(&definition.asset_path()) {
                    ui.painter().image(
                        texture,
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                } else {
                    ui.painter()
                        .rect_filled(rect, 2.0, ui.visuals().extreme_bg_color);
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        definition.label,
                        egui::FontId::proportional(9.0),
                        ui.visuals().text_color(),
                    );
                }

                if active == Some(id) {
                    ui.painter().rect_stroke(
                        rect.expand(1.0),
                        0.0,
                        egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 165, 0)),
                        egui::StrokeKind::Outside,
                    );
                }

                if response.on_hover_text(definition.label).clicked() {
                    store.set_active_character_tool(Some(id));
                }
            }
        });
    }
}
