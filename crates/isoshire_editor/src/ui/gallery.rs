//! Community collection gallery window

use bevy_egui::egui;
use isoshire_core::{CollectionMap, IsoProjector, SpriteMetrics};

use super::PendingAction;
use crate::library::CollectionLibrary;
use crate::preferences::EditorPreferences;
use crate::EditorState;

const PREVIEW_WIDTH: f32 = 160.0;

/// Flat diamond metrics that fit a `grid_size` map into `width` pixels
pub fn preview_metrics(grid_size: usize, width: f32) -> SpriteMetrics {
    let tile_width = width / (grid_size as f32 + 1.0);
    let tile_height = tile_width / 2.0;
    SpriteMetrics {
        tile_width,
        tile_height,
        sprite_width: tile_width,
        sprite_height: tile_height,
        sprite_anchor: 0.0,
    }
}

pub fn render_gallery(
    ctx: &egui::Context,
    editor_state: &mut EditorState,
    library: &mut CollectionLibrary,
    preferences: &EditorPreferences,
) {
    if !editor_state.show_gallery {
        library.page = None;
        return;
    }

    let per_page = preferences.gallery_page_size;
    let stale = library
        .page
        .as_ref()
        .is_none_or(|page| page.page != editor_state.gallery_page);
    if stale {
        let page = library.refresh_page(editor_state.gallery_page, per_page);
        // Out-of-range requests come back clamped
        editor_state.gallery_page = page.page;
    }

    let mut open = editor_state.show_gallery;
    let mut pending = None;
    let mut refresh = false;

    egui::Window::new("Community Gallery")
        .open(&mut open)
        .default_width(420.0)
        .show(ctx, |ui| {
            let Some(page) = &library.page else {
                return;
            };

            ui.horizontal(|ui| {
                ui.weak(library.store.dir().display().to_string());
                if ui.small_button("Refresh").clicked() {
                    refresh = true;
                }
            });
            ui.separator();

            if page.items.is_empty() {
                ui.label("No community maps found.");
                return;
            }

            egui::ScrollArea::vertical().max_height(480.0).show(ui, |ui| {
                for map in &page.items {
                    ui.group(|ui| {
                        ui.horizontal(|ui| {
                            render_preview(ui, map);
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(&map.name).strong());
                                ui.small(format!(
                                    "by {} (@{})",
                                    map.author.name, map.author.github
                                ));
                                if let Some(tags) = map.tags.as_ref().filter(|t| !t.is_empty()) {
                                    ui.small(tags.join(", "));
                                }
                                if let Some(description) = &map.description {
                                    ui.label(description);
                                }
                                if ui.button("Open in editor").clicked() {
                                    pending = Some(PendingAction::OpenCollection(map.id.clone()));
                                }
                            });
                        });
                    });
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(page.page > 0, egui::Button::new("◀ Prev"))
                    .clicked()
                {
                    editor_state.gallery_page = page.page - 1;
                }
                ui.label(format!(
                    "Page {} of {} ({} maps)",
                    page.page + 1,
                    page.total_pages,
                    page.total
                ));
                if ui
                    .add_enabled(page.page + 1 < page.total_pages, egui::Button::new("Next ▶"))
                    .clicked()
                {
                    editor_state.gallery_page = page.page + 1;
                }
            });
        });

    editor_state.show_gallery = open;
    if refresh {
        library.page = None;
    }
    if pending.is_some() {
        editor_state.pending_action = pending;
    }
}

/// Colour-per-cell diamond thumbnail
fn render_preview(ui: &mut egui::Ui, map: &CollectionMap) {
    let size = map.snapshot.grid_size();
    let projector = IsoProjector::new(size, preview_metrics(size, PREVIEW_WIDTH));
    let (width, height) = projector.canvas_size();
    let (rect, _) = ui.allocate_exact_size(
        egui::vec2(width as f32, height as f32),
        egui::Sense::hover(),
    );
    let painter = ui.painter_at(rect);

    for ((row, col, _, _), [r, g, b]) in map.snapshot.grid.cells().zip(map.preview_colors()) {
        let points = projector
            .diamond(row, col)
            .iter()
            .map(|(x, y)| rect.min + egui::vec2(*x, *y))
            .collect();
        painter.add(egui::Shape::convex_polygon(
            points,
            egui::Color32::from_rgb(r, g, b),
            egui::Stroke::NONE,
        ));
    }
}
